//! The resource client contract
//!
//! A manager talks to its backend only through [`ResourceClient`]. Requests
//! serialize to flat keyword maps: reserved keys (`requester_id`,
//! `return_type`, `fields`, `id`, ...) sit next to the entity fields or
//! filters, so hooks can rewrite either kind of input the same way.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ResourceError, Result},
    types::{Record, Resource, ReturnType},
};

/// Input of `create`; every non-reserved key is an entity field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub requester_id: String,
    /// `None` lets the client use [`ReturnType::default`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(flatten)]
    pub values: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetRequest {
    pub requester_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// Return `None` instead of failing when the id is unknown
    #[serde(default)]
    pub allow_nonexistent: bool,
}

/// Input of `list`; every non-reserved key is a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListRequest {
    pub requester_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(flatten)]
    pub filters: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub requester_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,
    pub id: String,
    pub new_properties: Record,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub requester_id: String,
    pub id: String,
}

/// Input of `exists`; every non-reserved key is part of the predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsRequest {
    pub requester_id: String,
    #[serde(flatten)]
    pub predicate: Record,
}

/// Input of `count`; every non-reserved key is a filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountRequest {
    pub requester_id: String,
    #[serde(flatten)]
    pub filters: Record,
}

/// Input of `search`: free-text `query` plus filters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub requester_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(flatten)]
    pub filters: Record,
}

impl SearchRequest {
    /// The same request without the free-text part
    pub fn into_list(self) -> ListRequest {
        ListRequest {
            requester_id: self.requester_id,
            return_type: self.return_type,
            fields: self.fields,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            filters: self.filters,
        }
    }
}

/// Uniform CRUD interface over any backend
///
/// Implementations must report a missing id as [`ResourceError::NotFound`]
/// (except `get` with `allow_nonexistent`), rejected input as `Validation`,
/// backend-reported failures as `Backend` and anything unexpected as
/// `Internal`.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Name of the resource, used in errors and logs
    fn resource_name(&self) -> &str;

    async fn create(&self, request: CreateRequest) -> Result<Resource>;

    async fn get(&self, request: GetRequest) -> Result<Option<Resource>>;

    async fn list(&self, request: ListRequest) -> Result<Vec<Resource>>;

    async fn update(&self, request: UpdateRequest) -> Result<Resource>;

    async fn delete(&self, request: DeleteRequest) -> Result<()>;

    async fn exists(&self, request: ExistsRequest) -> Result<bool>;

    async fn count(&self, request: CountRequest) -> Result<u64>;

    /// Whether `search` understands a free-text query
    fn supports_search(&self) -> bool {
        false
    }

    /// Without free-text support a search is a filtered listing
    async fn search(&self, request: SearchRequest) -> Result<Vec<Resource>> {
        if request.query.is_some() {
            return Err(ResourceError::backend(format!(
                "{} does not support free-text search",
                self.resource_name()
            )));
        }
        self.list(request.into_list()).await
    }
}
