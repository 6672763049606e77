//! Resource client over third-party providers

use std::{panic::AssertUnwindSafe, sync::Arc};

use async_trait::async_trait;
use bll_hooks::panic_message;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error};

use super::{
    envelope::{Envelope, NOT_FOUND_MARKER},
    gateway::{DirectGateway, ProviderGateway, RotationGateway},
    mapping::FieldMapping,
    provider::{ExternalProvider, ProviderOperation},
    rotation::Rotation,
};
use crate::{
    client::{
        CountRequest, CreateRequest, DeleteRequest, ExistsRequest, GetRequest, ListRequest,
        ResourceClient, SearchRequest, UpdateRequest,
    },
    error::{ResourceError, Result},
    model::ModelSchema,
    types::{Record, Resource, ReturnType, ID_FIELD},
};

const REQUESTER_KEY: &str = "requester_id";

/// Client whose rows live behind a rotating pool of providers
pub type ExternalResourceClient = ExternalClient<RotationGateway>;

/// Client bound to a single provider, without rotation
pub type DirectProviderResourceClient = ExternalClient<DirectGateway>;

/// [`ResourceClient`] translating calls into provider envelopes
///
/// Field names are renamed through a [`FieldMapping`] on the way out and
/// back. Envelope failures become `NotFound` or `Backend` errors; a panic in
/// the provider call becomes `Internal`.
pub struct ExternalClient<G> {
    gateway: G,
    schema: ModelSchema,
    mapping: FieldMapping,
    not_found_marker: String,
}

impl ExternalClient<RotationGateway> {
    pub fn rotating(rotation: Arc<dyn Rotation>, schema: ModelSchema) -> Self {
        Self::new(RotationGateway::new(rotation), schema)
    }
}

impl ExternalClient<DirectGateway> {
    pub fn direct(provider: Arc<dyn ExternalProvider>, schema: ModelSchema) -> Self {
        Self::new(DirectGateway::new(provider), schema)
    }
}

impl<G: ProviderGateway> ExternalClient<G> {
    pub fn new(gateway: G, schema: ModelSchema) -> Self {
        Self {
            gateway,
            schema,
            mapping: FieldMapping::identity(),
            not_found_marker: NOT_FOUND_MARKER.to_string(),
        }
    }

    /// Use `mapping` for field names; rejected if it collides with the schema
    pub fn with_mapping(mut self, mapping: FieldMapping) -> Result<Self> {
        mapping.check_schema(&self.schema)?;
        self.mapping = mapping;
        Ok(self)
    }

    pub fn with_not_found_marker(mut self, marker: impl Into<String>) -> Self {
        self.not_found_marker = marker.into();
        self
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// One provider call; `id` names the target in a NotFound error
    async fn call(
        &self,
        operation: ProviderOperation,
        requester_id: &str,
        mut args: Record,
        id: &str,
    ) -> Result<Option<Value>> {
        args.insert(REQUESTER_KEY.to_string(), Value::String(requester_id.to_string()));
        debug!(
            resource = %self.schema.name(),
            gateway = %self.gateway.label(),
            operation = %operation,
            "Dispatching provider call"
        );

        let envelope: Envelope = AssertUnwindSafe(self.gateway.call(operation, args))
            .catch_unwind()
            .await
            .map_err(|panic| {
                let message = panic_message(panic.as_ref());
                error!(
                    resource = %self.schema.name(),
                    operation = %operation,
                    error = %message,
                    "Provider call panicked"
                );
                ResourceError::internal(format!("provider {} panicked: {}", operation, message))
            })?;

        envelope.into_result(&self.not_found_marker, self.schema.name(), id)
    }

    fn expect_record(&self, operation: ProviderOperation, data: Option<Value>) -> Result<Value> {
        match data {
            Some(value @ Value::Object(_)) => Ok(value),
            other => Err(ResourceError::internal(format!(
                "provider {} returned {} instead of an object",
                operation,
                describe(other.as_ref())
            ))),
        }
    }

    fn expect_records(&self, operation: ProviderOperation, data: Option<Value>) -> Result<Vec<Value>> {
        match data {
            Some(Value::Array(items)) => {
                if let Some(bad) = items.iter().find(|item| !item.is_object()) {
                    return Err(ResourceError::internal(format!(
                        "provider {} returned {} inside a listing",
                        operation,
                        describe(Some(bad))
                    )));
                }
                Ok(items)
            }
            other => Err(ResourceError::internal(format!(
                "provider {} returned {} instead of a list",
                operation,
                describe(other.as_ref())
            ))),
        }
    }

    /// Render one provider payload; `Db` keeps the payload untouched
    fn shape(&self, raw: Value, return_type: ReturnType, fields: Option<&[String]>) -> Resource {
        let dict = self.mapping.value_from_external(&raw).unwrap_or_default();
        self.schema.shape(return_type, fields, dict, raw)
    }

    fn listing_args(
        &self,
        filters: &Record,
        order_by: &[String],
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Record {
        let mut args = self.mapping.filters_to_external(filters);
        if !order_by.is_empty() {
            args.insert(
                "order_by".to_string(),
                Value::from(self.mapping.order_to_external(order_by)),
            );
        }
        if let Some(limit) = limit {
            args.insert("limit".to_string(), Value::from(limit));
        }
        if let Some(offset) = offset {
            args.insert("offset".to_string(), Value::from(offset));
        }
        args
    }

    fn id_args(&self, id: &str) -> Record {
        let mut args = Record::new();
        args.insert(
            self.mapping.external_name(ID_FIELD).to_string(),
            Value::String(id.to_string()),
        );
        args
    }
}

#[async_trait]
impl<G: ProviderGateway> ResourceClient for ExternalClient<G> {
    fn resource_name(&self) -> &str {
        self.schema.name()
    }

    async fn create(&self, request: CreateRequest) -> Result<Resource> {
        self.schema.validate_create(&request.values)?;
        let args = self.mapping.to_external_format(&request.values);
        let data = self
            .call(ProviderOperation::Create, &request.requester_id, args, "")
            .await?;
        let raw = self.expect_record(ProviderOperation::Create, data)?;
        Ok(self.shape(raw, request.return_type.unwrap_or_default(), request.fields.as_deref()))
    }

    async fn get(&self, request: GetRequest) -> Result<Option<Resource>> {
        let result = self
            .call(
                ProviderOperation::Get,
                &request.requester_id,
                self.id_args(&request.id),
                &request.id,
            )
            .await;
        match result {
            Ok(data) => {
                let raw = self.expect_record(ProviderOperation::Get, data)?;
                Ok(Some(self.shape(raw, request.return_type.unwrap_or_default(), request.fields.as_deref())))
            }
            Err(err) if err.is_not_found() && request.allow_nonexistent => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn list(&self, request: ListRequest) -> Result<Vec<Resource>> {
        let args = self.listing_args(
            &request.filters,
            &request.order_by,
            request.limit,
            request.offset,
        );
        let data = self
            .call(ProviderOperation::List, &request.requester_id, args, "")
            .await?;
        let items = self.expect_records(ProviderOperation::List, data)?;
        Ok(items
            .into_iter()
            .map(|raw| self.shape(raw, request.return_type.unwrap_or_default(), request.fields.as_deref()))
            .collect())
    }

    async fn update(&self, request: UpdateRequest) -> Result<Resource> {
        self.schema.validate_update(&request.new_properties)?;
        let mut args = self.id_args(&request.id);
        args.insert(
            "new_properties".to_string(),
            Value::Object(self.mapping.to_external_format(&request.new_properties)),
        );
        let data = self
            .call(ProviderOperation::Update, &request.requester_id, args, &request.id)
            .await?;
        let raw = self.expect_record(ProviderOperation::Update, data)?;
        Ok(self.shape(raw, request.return_type.unwrap_or_default(), request.fields.as_deref()))
    }

    async fn delete(&self, request: DeleteRequest) -> Result<()> {
        self.call(
            ProviderOperation::Delete,
            &request.requester_id,
            self.id_args(&request.id),
            &request.id,
        )
        .await?;
        Ok(())
    }

    async fn exists(&self, request: ExistsRequest) -> Result<bool> {
        let ExistsRequest {
            requester_id,
            mut predicate,
        } = request;

        match predicate.remove(ID_FIELD) {
            Some(Value::String(id)) if predicate.is_empty() => {
                let lookup = GetRequest {
                    requester_id,
                    return_type: None,
                    id,
                    fields: None,
                    allow_nonexistent: false,
                };
                match self.get(lookup).await {
                    Ok(_) => Ok(true),
                    Err(err) if err.is_not_found() => Ok(false),
                    Err(err) => Err(err),
                }
            }
            id => {
                if let Some(id) = id {
                    predicate.insert(ID_FIELD.to_string(), id);
                }
                let listing = ListRequest {
                    requester_id,
                    return_type: None,
                    fields: None,
                    order_by: Vec::new(),
                    limit: Some(1),
                    offset: None,
                    filters: predicate,
                };
                Ok(!self.list(listing).await?.is_empty())
            }
        }
    }

    async fn count(&self, request: CountRequest) -> Result<u64> {
        let listing = ListRequest {
            requester_id: request.requester_id,
            return_type: None,
            fields: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            filters: request.filters,
        };
        Ok(self.list(listing).await?.len() as u64)
    }

    fn supports_search(&self) -> bool {
        true
    }

    async fn search(&self, request: SearchRequest) -> Result<Vec<Resource>> {
        let mut args = self.listing_args(
            &request.filters,
            &request.order_by,
            request.limit,
            request.offset,
        );
        if let Some(query) = &request.query {
            args.insert("query".to_string(), Value::String(query.clone()));
        }
        let data = self
            .call(ProviderOperation::Search, &request.requester_id, args, "")
            .await?;
        let items = self.expect_records(ProviderOperation::Search, data)?;
        Ok(items
            .into_iter()
            .map(|raw| self.shape(raw, request.return_type.unwrap_or_default(), request.fields.as_deref()))
            .collect())
    }
}

impl<G: ProviderGateway> std::fmt::Debug for ExternalClient<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalClient")
            .field("resource", &self.schema.name())
            .field("gateway", &self.gateway.label())
            .finish()
    }
}

fn describe(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "nothing",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "a list",
        Some(Value::Object(_)) => "an object",
    }
}
