//! Routes a provider call either through rotation or to one provider

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    envelope::Envelope,
    provider::{dispatch, ExternalProvider, ProviderOperation},
    rotation::Rotation,
};
use crate::types::Record;

/// The single call an external client needs from its backend
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Short label for logs
    fn label(&self) -> String;

    async fn call(&self, operation: ProviderOperation, args: Record) -> Envelope;
}

/// Forwards every call to a rotation facility
#[derive(Clone)]
pub struct RotationGateway {
    rotation: Arc<dyn Rotation>,
}

impl RotationGateway {
    pub fn new(rotation: Arc<dyn Rotation>) -> Self {
        Self { rotation }
    }
}

#[async_trait]
impl ProviderGateway for RotationGateway {
    fn label(&self) -> String {
        "rotation".to_string()
    }

    async fn call(&self, operation: ProviderOperation, args: Record) -> Envelope {
        self.rotation.rotate(operation, args).await
    }
}

/// Calls one bound provider directly
#[derive(Clone)]
pub struct DirectGateway {
    provider: Arc<dyn ExternalProvider>,
}

impl DirectGateway {
    pub fn new(provider: Arc<dyn ExternalProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ProviderGateway for DirectGateway {
    fn label(&self) -> String {
        format!("direct:{}", self.provider.name())
    }

    async fn call(&self, operation: ProviderOperation, args: Record) -> Envelope {
        dispatch(self.provider.as_ref(), operation, args).await
    }
}
