//! Resource client backed by a local entity table

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    client::{
        CountRequest, CreateRequest, DeleteRequest, ExistsRequest, GetRequest, ListRequest,
        ResourceClient, SearchRequest, UpdateRequest,
    },
    error::{ResourceError, Result},
    filter::{compare_records, paginate, text_match, Filter},
    model::ModelSchema,
    types::{Record, Resource, ReturnType, StoredRecord},
};

/// Storage primitives of one entity type
///
/// Tables only store and fetch rows. Validation, filtering, ordering and
/// shaping happen in [`DatabaseResourceClient`].
#[async_trait]
pub trait EntityTable: Send + Sync {
    fn schema(&self) -> &ModelSchema;

    /// Store a new row; `values` may carry a caller-chosen `id`
    async fn insert(&self, values: Record) -> Result<StoredRecord>;

    async fn fetch(&self, id: &str) -> Result<Option<StoredRecord>>;

    /// Every row, in insertion order
    async fn scan(&self) -> Result<Vec<StoredRecord>>;

    /// Merge `properties` into a row; `None` when the id is unknown
    async fn modify(&self, id: &str, properties: Record) -> Result<Option<StoredRecord>>;

    /// Remove a row; `false` when the id is unknown
    async fn remove(&self, id: &str) -> Result<bool>;
}

/// [`ResourceClient`] over an [`EntityTable`]
///
/// The table handle is bound at construction, so every call of the same
/// client goes through the same session.
#[derive(Clone)]
pub struct DatabaseResourceClient {
    table: Arc<dyn EntityTable>,
}

impl DatabaseResourceClient {
    pub fn new(table: Arc<dyn EntityTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<dyn EntityTable> {
        &self.table
    }

    pub fn schema(&self) -> &ModelSchema {
        self.table.schema()
    }

    fn shape(
        &self,
        row: &StoredRecord,
        return_type: ReturnType,
        fields: Option<&[String]>,
    ) -> Result<Resource> {
        let raw = match return_type {
            ReturnType::Db => serde_json::to_value(row)?,
            _ => serde_json::Value::Null,
        };
        Ok(self.schema().shape(return_type, fields, row.to_dict(), raw))
    }

    /// Filtered and ordered rows, before pagination
    async fn select(&self, filters: &Record, order_by: &[String]) -> Result<Vec<StoredRecord>> {
        let filter = Filter::parse(filters)?;
        let mut rows: Vec<(Record, StoredRecord)> = self
            .table
            .scan()
            .await?
            .into_iter()
            .map(|row| (row.to_dict(), row))
            .filter(|(dict, _)| filter.matches(dict))
            .collect();

        if !order_by.is_empty() {
            rows.sort_by(|(a, _), (b, _)| compare_records(a, b, order_by));
        }

        Ok(rows.into_iter().map(|(_, row)| row).collect())
    }
}

impl std::fmt::Debug for DatabaseResourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseResourceClient")
            .field("resource", &self.schema().name())
            .finish()
    }
}

#[async_trait]
impl ResourceClient for DatabaseResourceClient {
    fn resource_name(&self) -> &str {
        self.schema().name()
    }

    async fn create(&self, request: CreateRequest) -> Result<Resource> {
        debug!(resource = %self.resource_name(), "Creating record");
        self.schema().validate_create(&request.values)?;
        let row = self.table.insert(request.values).await?;
        self.shape(&row, request.return_type.unwrap_or_default(), request.fields.as_deref())
    }

    async fn get(&self, request: GetRequest) -> Result<Option<Resource>> {
        debug!(resource = %self.resource_name(), id = %request.id, "Fetching record");
        match self.table.fetch(&request.id).await? {
            Some(row) => self
                .shape(&row, request.return_type.unwrap_or_default(), request.fields.as_deref())
                .map(Some),
            None if request.allow_nonexistent => Ok(None),
            None => Err(ResourceError::not_found(self.resource_name(), request.id)),
        }
    }

    async fn list(&self, request: ListRequest) -> Result<Vec<Resource>> {
        debug!(resource = %self.resource_name(), filters = request.filters.len(), "Listing records");
        let rows = self.select(&request.filters, &request.order_by).await?;
        paginate(rows, request.offset, request.limit)
            .iter()
            .map(|row| self.shape(row, request.return_type.unwrap_or_default(), request.fields.as_deref()))
            .collect()
    }

    async fn update(&self, request: UpdateRequest) -> Result<Resource> {
        debug!(resource = %self.resource_name(), id = %request.id, "Updating record");
        self.schema().validate_update(&request.new_properties)?;
        let row = self
            .table
            .modify(&request.id, request.new_properties)
            .await?
            .ok_or_else(|| ResourceError::not_found(self.resource_name(), request.id.clone()))?;
        self.shape(&row, request.return_type.unwrap_or_default(), request.fields.as_deref())
    }

    async fn delete(&self, request: DeleteRequest) -> Result<()> {
        debug!(resource = %self.resource_name(), id = %request.id, "Deleting record");
        if self.table.remove(&request.id).await? {
            Ok(())
        } else {
            Err(ResourceError::not_found(self.resource_name(), request.id))
        }
    }

    async fn exists(&self, request: ExistsRequest) -> Result<bool> {
        let filter = Filter::parse(&request.predicate)?;
        Ok(self
            .table
            .scan()
            .await?
            .iter()
            .any(|row| filter.matches(&row.to_dict())))
    }

    async fn count(&self, request: CountRequest) -> Result<u64> {
        let rows = self.select(&request.filters, &[]).await?;
        Ok(rows.len() as u64)
    }

    fn supports_search(&self) -> bool {
        true
    }

    async fn search(&self, request: SearchRequest) -> Result<Vec<Resource>> {
        debug!(resource = %self.resource_name(), query = ?request.query, "Searching records");
        let rows = self.select(&request.filters, &request.order_by).await?;
        let rows: Vec<StoredRecord> = match request.query.as_deref() {
            Some(query) => rows
                .into_iter()
                .filter(|row| text_match(&row.to_dict(), query))
                .collect(),
            None => rows,
        };
        paginate(rows, request.offset, request.limit)
            .iter()
            .map(|row| self.shape(row, request.return_type.unwrap_or_default(), request.fields.as_deref()))
            .collect()
    }
}
