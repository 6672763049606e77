//! In-memory entity table
//!
//! Memory backend for tests and embedded use

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    database::EntityTable,
    error::{ResourceError, Result},
    model::ModelSchema,
    types::{Record, StoredRecord, ID_FIELD},
};

/// Thread-safe in-memory implementation of [`EntityTable`]
///
/// Rows keep insertion order. Stored rows are cloned on every read so callers
/// never share state with the table.
#[derive(Debug)]
pub struct InMemoryTable {
    schema: ModelSchema,
    rows: RwLock<Vec<StoredRecord>>,
}

impl InMemoryTable {
    pub fn new(schema: ModelSchema) -> Self {
        Self {
            schema,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored rows (for testing)
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Drop every row (for testing)
    pub fn clear(&self) {
        self.rows.write().clear();
    }
}

#[async_trait]
impl EntityTable for InMemoryTable {
    fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    async fn insert(&self, mut values: Record) -> Result<StoredRecord> {
        let id = match values.remove(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id,
            Some(Value::Null) | None => Uuid::new_v4().to_string(),
            Some(other) => {
                return Err(ResourceError::validation(format!(
                    "{}: invalid id {}",
                    self.schema.name(),
                    other
                )))
            }
        };

        let mut rows = self.rows.write();
        if rows.iter().any(|row| row.id == id) {
            return Err(ResourceError::validation(format!(
                "{}: id '{}' already exists",
                self.schema.name(),
                id
            )));
        }

        let now = Utc::now();
        let row = StoredRecord {
            id,
            data: values,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn fetch(&self, id: &str) -> Result<Option<StoredRecord>> {
        Ok(self.rows.read().iter().find(|row| row.id == id).cloned())
    }

    async fn scan(&self) -> Result<Vec<StoredRecord>> {
        Ok(self.rows.read().clone())
    }

    async fn modify(&self, id: &str, properties: Record) -> Result<Option<StoredRecord>> {
        let mut rows = self.rows.write();
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Ok(None);
        };
        for (key, value) in properties {
            row.data.insert(key, value);
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn remove(&self, id: &str) -> Result<bool> {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }
}
