//! Provider rotation facility

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use tracing::debug;

use super::{
    envelope::Envelope,
    provider::{dispatch, ExternalProvider, ProviderOperation},
};
use crate::types::Record;

/// Selects a provider for each call and reports one outcome
///
/// Retry and failover belong to implementations; callers only see the
/// returned envelope.
#[async_trait]
pub trait Rotation: Send + Sync {
    async fn rotate(&self, operation: ProviderOperation, args: Record) -> Envelope;
}

/// Cycles through its providers, one per call, without retry
pub struct RoundRobinRotation {
    providers: Vec<Arc<dyn ExternalProvider>>,
    next: AtomicUsize,
}

impl RoundRobinRotation {
    pub fn new(providers: Vec<Arc<dyn ExternalProvider>>) -> Self {
        Self {
            providers,
            next: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl Rotation for RoundRobinRotation {
    async fn rotate(&self, operation: ProviderOperation, args: Record) -> Envelope {
        if self.providers.is_empty() {
            return Envelope::failure("no providers configured");
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.providers.len();
        let provider = &self.providers[index];
        debug!(provider = %provider.name(), operation = %operation, "Rotating to provider");
        dispatch(provider.as_ref(), operation, args).await
    }
}

impl std::fmt::Debug for RoundRobinRotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("RoundRobinRotation")
            .field("providers", &names)
            .finish()
    }
}
