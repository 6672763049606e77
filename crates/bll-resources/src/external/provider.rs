//! Third-party provider contract

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::envelope::Envelope;
use crate::types::Record;

/// Provider call selected by the client and handed to the rotation facility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOperation {
    Create,
    Get,
    List,
    Update,
    Delete,
    Search,
}

impl ProviderOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderOperation::Create => "create",
            ProviderOperation::Get => "get",
            ProviderOperation::List => "list",
            ProviderOperation::Update => "update",
            ProviderOperation::Delete => "delete",
            ProviderOperation::Search => "search",
        }
    }
}

impl fmt::Display for ProviderOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One third-party API exposing a resource
///
/// `args` carry external field names. Operations a provider does not offer
/// answer with a failure envelope.
#[async_trait]
pub trait ExternalProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn create(&self, args: Record) -> Envelope {
        let _ = args;
        self.unsupported(ProviderOperation::Create)
    }

    async fn get(&self, args: Record) -> Envelope {
        let _ = args;
        self.unsupported(ProviderOperation::Get)
    }

    async fn list(&self, args: Record) -> Envelope {
        let _ = args;
        self.unsupported(ProviderOperation::List)
    }

    async fn update(&self, args: Record) -> Envelope {
        let _ = args;
        self.unsupported(ProviderOperation::Update)
    }

    async fn delete(&self, args: Record) -> Envelope {
        let _ = args;
        self.unsupported(ProviderOperation::Delete)
    }

    async fn search(&self, args: Record) -> Envelope {
        let _ = args;
        self.unsupported(ProviderOperation::Search)
    }

    fn unsupported(&self, operation: ProviderOperation) -> Envelope {
        Envelope::failure(format!("{} does not support {}", self.name(), operation))
    }
}

/// Invoke `operation` on `provider`
pub async fn dispatch(
    provider: &dyn ExternalProvider,
    operation: ProviderOperation,
    args: Record,
) -> Envelope {
    match operation {
        ProviderOperation::Create => provider.create(args).await,
        ProviderOperation::Get => provider.get(args).await,
        ProviderOperation::List => provider.list(args).await,
        ProviderOperation::Update => provider.update(args).await,
        ProviderOperation::Delete => provider.delete(args).await,
        ProviderOperation::Search => provider.search(args).await,
    }
}
