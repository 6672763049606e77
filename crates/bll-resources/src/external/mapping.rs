//! Translation between internal and external field names

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    error::{ResourceError, Result},
    filter::{split_key, FilterOp},
    model::ModelSchema,
    types::Record,
};


/// Declared renames from manager-native field names to provider field names
///
/// The inverse table is derived at construction and must be one-to-one.
/// Fields without an entry keep their name in both directions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    to_external: HashMap<String, String>,
    to_internal: HashMap<String, String>,
}

impl FieldMapping {
    /// Identity mapping
    pub fn identity() -> Self {
        Self::default()
    }

    /// Build a mapping from `(internal, external)` pairs
    pub fn new<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut mapping = Self::default();
        for (internal, external) in pairs {
            let internal = internal.into();
            let external = external.into();
            if mapping.to_external.contains_key(&internal) {
                return Err(ResourceError::validation(format!(
                    "field '{}' is mapped twice",
                    internal
                )));
            }
            if let Some(other) = mapping.to_internal.get(&external) {
                return Err(ResourceError::validation(format!(
                    "fields '{}' and '{}' both map to '{}'",
                    other, internal, external
                )));
            }
            mapping.to_internal.insert(external.clone(), internal.clone());
            mapping.to_external.insert(internal, external);
        }

        Ok(mapping)
    }

    /// Reject schema fields whose unmapped name equals another field's
    /// external name; such a field would come back renamed
    pub fn check_schema(&self, schema: &ModelSchema) -> Result<()> {
        for def in schema.fields() {
            if self.to_external.contains_key(&def.name) {
                continue;
            }
            if let Some(owner) = self.to_internal.get(&def.name) {
                return Err(ResourceError::validation(format!(
                    "{}: field '{}' collides with the external name of '{}'",
                    schema.name(),
                    def.name,
                    owner
                )));
            }
        }
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        self.to_external.is_empty()
    }

    pub fn external_name<'a>(&'a self, internal: &'a str) -> &'a str {
        self.to_external.get(internal).map_or(internal, String::as_str)
    }

    pub fn internal_name<'a>(&'a self, external: &'a str) -> &'a str {
        self.to_internal.get(external).map_or(external, String::as_str)
    }

    pub fn to_external_format(&self, record: &Record) -> Record {
        record
            .iter()
            .map(|(key, value)| (self.external_name(key).to_string(), value.clone()))
            .collect()
    }

    pub fn from_external_format(&self, record: &Record) -> Record {
        record
            .iter()
            .map(|(key, value)| (self.internal_name(key).to_string(), value.clone()))
            .collect()
    }

    /// Rename filter keys, keeping any `__op` suffix
    pub fn filters_to_external(&self, filters: &Record) -> Record {
        filters
            .iter()
            .map(|(key, value)| {
                let key = match split_key(key) {
                    (field, FilterOp::Eq) => self.external_name(field).to_string(),
                    (field, _) => format!("{}{}", self.external_name(field), &key[field.len()..]),
                };
                (key, value.clone())
            })
            .collect()
    }

    /// Rename `order_by` keys, keeping any leading `-`
    pub fn order_to_external(&self, order_by: &[String]) -> Vec<String> {
        order_by
            .iter()
            .map(|key| match key.strip_prefix('-') {
                Some(field) => format!("-{}", self.external_name(field)),
                None => self.external_name(key).to_string(),
            })
            .collect()
    }

    /// Rename the keys of a provider payload if it is an object
    pub fn value_from_external(&self, value: &Value) -> Option<Record> {
        value.as_object().map(|record| self.from_external_format(record))
    }
}
