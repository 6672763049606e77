//! Hook-intercepted CRUD manager

use std::{any::Any, future::Future, panic::AssertUnwindSafe, sync::Arc};

use bll_config::{BllSettings, ManagerSettings, ReturnTypeSetting};
use bll_hooks::{
    panic_message, CallArgs, InstanceId, InterceptTarget, Interceptor, ManagerClass, Operation,
};
use bll_resources::{
    CountRequest, CreateRequest, DatabaseResourceClient, DeleteRequest, DirectProviderResourceClient,
    EntityTable, ExistsRequest, ExternalProvider, ExternalResourceClient, FieldMapping, GetRequest,
    InMemoryTable, ListRequest, ModelSchema, Record, Resource, ResourceClient, ReturnType,
    Rotation, SearchRequest, UpdateRequest,
};
use futures::FutureExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::{
    error::{BllError, Result},
    hooks::{global_hooks, interceptor, ManagerHooks},
    output::CallOutput,
};

/// One entry of a `batch_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateItem {
    pub id: String,
    pub new_properties: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateRequest {
    pub requester_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<ReturnType>,
    pub items: Vec<BatchUpdateItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchDeleteRequest {
    pub requester_id: String,
    pub ids: Vec<String>,
}

/// Business-logic manager for one resource type
///
/// Every public operation runs through the hook pipeline: the request is
/// serialized into the call's `kwargs`, BEFORE hooks may rewrite or skip it,
/// the owned [`ResourceClient`] executes it, and AFTER hooks may replace the
/// result.
pub struct Manager {
    class: ManagerClass,
    instance: InstanceId,
    db: Arc<dyn ResourceClient>,
    interceptor: Interceptor<CallOutput>,
    settings: ManagerSettings,
}

impl Manager {
    pub fn builder(class: impl Into<ManagerClass>) -> ManagerBuilder {
        ManagerBuilder::new(class.into())
    }

    pub fn class(&self) -> &ManagerClass {
        &self.class
    }

    /// The resource client this manager delegates to
    pub fn db(&self) -> &Arc<dyn ResourceClient> {
        &self.db
    }

    pub fn hooks(&self) -> &Arc<ManagerHooks> {
        self.interceptor.registry()
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn resource_name(&self) -> &str {
        self.db.resource_name()
    }

    pub async fn create(&self, request: CreateRequest) -> Result<Resource> {
        check_requester(&request.requester_id)?;
        self.run(Operation::Create, encode(&request)?, |call| async move {
            let mut request: CreateRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            request.return_type = self.return_type(request.return_type);
            Ok(self.db.create(request).await?.into())
        })
        .await?
        .into_resource(Operation::Create)
    }

    pub async fn get(&self, request: GetRequest) -> Result<Option<Resource>> {
        check_requester(&request.requester_id)?;
        self.run(Operation::Get, encode(&request)?, |call| async move {
            let mut request: GetRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            request.return_type = self.return_type(request.return_type);
            Ok(self.db.get(request).await?.into())
        })
        .await?
        .into_optional(Operation::Get)
    }

    pub async fn list(&self, request: ListRequest) -> Result<Vec<Resource>> {
        check_requester(&request.requester_id)?;
        self.run(Operation::List, encode(&request)?, |call| async move {
            let mut request: ListRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            request.return_type = self.return_type(request.return_type);
            request.limit = self.page_limit(request.limit);
            Ok(self.db.list(request).await?.into())
        })
        .await?
        .into_many(Operation::List)
    }

    pub async fn update(&self, request: UpdateRequest) -> Result<Resource> {
        check_requester(&request.requester_id)?;
        self.run(Operation::Update, encode(&request)?, |call| async move {
            let mut request: UpdateRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            request.return_type = self.return_type(request.return_type);
            Ok(self.db.update(request).await?.into())
        })
        .await?
        .into_resource(Operation::Update)
    }

    pub async fn delete(&self, request: DeleteRequest) -> Result<()> {
        check_requester(&request.requester_id)?;
        self.run(Operation::Delete, encode(&request)?, |call| async move {
            let request: DeleteRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            self.db.delete(request).await?;
            Ok(CallOutput::Empty)
        })
        .await?;
        Ok(())
    }

    pub async fn search(&self, request: SearchRequest) -> Result<Vec<Resource>> {
        check_requester(&request.requester_id)?;
        self.run(Operation::Search, encode(&request)?, |call| async move {
            let mut request: SearchRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            request.return_type = self.return_type(request.return_type);
            request.limit = self.page_limit(request.limit);
            Ok(self.db.search(request).await?.into())
        })
        .await?
        .into_many(Operation::Search)
    }

    pub async fn count(&self, request: CountRequest) -> Result<u64> {
        check_requester(&request.requester_id)?;
        self.run(Operation::Count, encode(&request)?, |call| async move {
            let request: CountRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            Ok(self.db.count(request).await?.into())
        })
        .await?
        .into_count(Operation::Count)
    }

    pub async fn exists(&self, request: ExistsRequest) -> Result<bool> {
        check_requester(&request.requester_id)?;
        self.run(Operation::Exists, encode(&request)?, |call| async move {
            let request: ExistsRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            Ok(self.db.exists(request).await?.into())
        })
        .await?
        .into_flag(Operation::Exists)
    }

    /// Update each item through the intercepted `update`, in order
    ///
    /// Stops at the first failing item; earlier updates stay applied.
    pub async fn batch_update(&self, request: BatchUpdateRequest) -> Result<Vec<Resource>> {
        check_requester(&request.requester_id)?;
        self.run(Operation::BatchUpdate, encode(&request)?, |call| async move {
            let request: BatchUpdateRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            let total = request.items.len();
            let mut updated = Vec::with_capacity(total);
            for item in request.items {
                let resource = self
                    .update(UpdateRequest {
                        requester_id: request.requester_id.clone(),
                        return_type: request.return_type,
                        id: item.id,
                        new_properties: item.new_properties,
                        fields: request.fields.clone(),
                    })
                    .await?;
                updated.push(resource);
            }
            info!(manager = %self.class, count = total, "Batch update completed");
            Ok(updated.into())
        })
        .await?
        .into_many(Operation::BatchUpdate)
    }

    /// Delete each id through the intercepted `delete`, in order
    ///
    /// Stops at the first failing id and returns how many were deleted
    /// otherwise.
    pub async fn batch_delete(&self, request: BatchDeleteRequest) -> Result<u64> {
        check_requester(&request.requester_id)?;
        self.run(Operation::BatchDelete, encode(&request)?, |call| async move {
            let request: BatchDeleteRequest = decode(call)?;
            check_requester(&request.requester_id)?;
            let mut deleted = 0u64;
            for id in request.ids {
                self.delete(DeleteRequest {
                    requester_id: request.requester_id.clone(),
                    id,
                })
                .await?;
                deleted += 1;
            }
            info!(manager = %self.class, count = deleted, "Batch delete completed");
            Ok(deleted.into())
        })
        .await?
        .into_count(Operation::BatchDelete)
    }

    async fn run<F, Fut>(&self, operation: Operation, call: CallArgs, body: F) -> Result<CallOutput>
    where
        F: FnOnce(CallArgs) -> Fut,
        Fut: Future<Output = Result<CallOutput>>,
    {
        debug!(
            manager = %self.class,
            method = %operation,
            resource = %self.resource_name(),
            "Dispatching manager call"
        );
        if !self.interceptor.catches_panics() {
            return self.interceptor.intercept(self, operation, call, body).await;
        }
        self.interceptor
            .intercept(self, operation, call, |call| async move {
                AssertUnwindSafe(async move { body(call).await })
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        let message = panic_message(panic.as_ref());
                        error!(
                            manager = %self.class,
                            method = %operation,
                            error = %message,
                            "Resource client panicked"
                        );
                        Err(BllError::internal(format!("{} panicked: {}", operation, message)))
                    })
            })
            .await
    }

    fn return_type(&self, requested: Option<ReturnType>) -> Option<ReturnType> {
        Some(requested.unwrap_or(match self.settings.default_return_type {
            ReturnTypeSetting::Db => ReturnType::Db,
            ReturnTypeSetting::Dict => ReturnType::Dict,
            ReturnTypeSetting::Model => ReturnType::Model,
        }))
    }

    /// Clamp `limit` to the configured page size; no limit means a full page
    fn page_limit(&self, limit: Option<usize>) -> Option<usize> {
        let max = self.settings.max_page_size;
        Some(limit.map_or(max, |limit| limit.min(max)))
    }
}

impl InterceptTarget for Manager {
    fn class(&self) -> &ManagerClass {
        &self.class
    }

    fn instance_id(&self) -> InstanceId {
        self.instance
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("class", &self.class)
            .field("instance", &self.instance)
            .field("resource", &self.resource_name())
            .finish()
    }
}

fn check_requester(requester_id: &str) -> Result<()> {
    if requester_id.trim().is_empty() {
        return Err(BllError::validation("requester_id is required"));
    }
    Ok(())
}

fn encode<T: Serialize>(request: &T) -> Result<CallArgs> {
    match serde_json::to_value(request)? {
        Value::Object(kwargs) => Ok(CallArgs::from_kwargs(kwargs)),
        other => Err(BllError::internal(format!(
            "request serialized to {} instead of an object",
            other
        ))),
    }
}

fn decode<T: DeserializeOwned>(call: CallArgs) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(call.kwargs))?)
}

enum Backend {
    Database(Arc<dyn EntityTable>),
    Rotating {
        rotation: Arc<dyn Rotation>,
        schema: ModelSchema,
        mapping: FieldMapping,
    },
    Direct {
        provider: Arc<dyn ExternalProvider>,
        schema: ModelSchema,
        mapping: FieldMapping,
    },
    Client(Arc<dyn ResourceClient>),
}

/// Builder for [`Manager`]
///
/// Exactly one backend must be chosen. Hooks default to [`global_hooks`] and
/// settings to [`BllSettings::default`].
pub struct ManagerBuilder {
    class: ManagerClass,
    backend: Option<Backend>,
    hooks: Option<Arc<ManagerHooks>>,
    settings: BllSettings,
}

impl ManagerBuilder {
    fn new(class: ManagerClass) -> Self {
        Self {
            class,
            backend: None,
            hooks: None,
            settings: BllSettings::default(),
        }
    }

    /// Back the manager with a persisted-entity table
    pub fn database(mut self, table: Arc<dyn EntityTable>) -> Self {
        self.backend = Some(Backend::Database(table));
        self
    }

    /// Back the manager with a fresh [`InMemoryTable`]
    pub fn in_memory(self, schema: ModelSchema) -> Self {
        self.database(Arc::new(InMemoryTable::new(schema)))
    }

    /// Back the manager with providers behind a rotation facility
    pub fn rotating(
        mut self,
        rotation: Arc<dyn Rotation>,
        schema: ModelSchema,
        mapping: FieldMapping,
    ) -> Self {
        self.backend = Some(Backend::Rotating {
            rotation,
            schema,
            mapping,
        });
        self
    }

    /// Back the manager with a single provider, without rotation
    pub fn direct(
        mut self,
        provider: Arc<dyn ExternalProvider>,
        schema: ModelSchema,
        mapping: FieldMapping,
    ) -> Self {
        self.backend = Some(Backend::Direct {
            provider,
            schema,
            mapping,
        });
        self
    }

    /// Use an already built client
    pub fn client(mut self, client: Arc<dyn ResourceClient>) -> Self {
        self.backend = Some(Backend::Client(client));
        self
    }

    pub fn hooks(mut self, registry: Arc<ManagerHooks>) -> Self {
        self.hooks = Some(registry);
        self
    }

    pub fn settings(mut self, settings: BllSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<Manager> {
        let marker = self.settings.external.not_found_marker.clone();
        let db: Arc<dyn ResourceClient> = match self.backend {
            None => {
                return Err(BllError::validation(format!(
                    "{}: no resource client configured",
                    self.class
                )))
            }
            Some(Backend::Database(table)) => Arc::new(DatabaseResourceClient::new(table)),
            Some(Backend::Rotating {
                rotation,
                schema,
                mapping,
            }) => Arc::new(
                ExternalResourceClient::rotating(rotation, schema)
                    .with_not_found_marker(marker)
                    .with_mapping(mapping)?,
            ),
            Some(Backend::Direct {
                provider,
                schema,
                mapping,
            }) => Arc::new(
                DirectProviderResourceClient::direct(provider, schema)
                    .with_not_found_marker(marker)
                    .with_mapping(mapping)?,
            ),
            Some(Backend::Client(client)) => client,
        };

        let registry = self.hooks.unwrap_or_else(global_hooks);
        let manager = Manager {
            interceptor: interceptor(registry, &self.settings.hooks),
            class: self.class,
            instance: InstanceId::new(),
            db,
            settings: self.settings.managers,
        };
        debug!(
            manager = %manager.class,
            instance = %manager.instance,
            resource = %manager.resource_name(),
            "Manager built"
        );
        Ok(manager)
    }
}
