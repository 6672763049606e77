//! Resource schemas and schema-validated instances

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ResourceError, Result},
    filter::project,
    types::{Record, Resource, ReturnType, ID_FIELD},
};

/// Value type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Integer,
    Float,
    Boolean,
    /// Any JSON value
    Json,
}

impl FieldKind {
    /// Whether `value` is acceptable; `null` is handled by the caller
    fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Float => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::Json => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

/// Fields a resource carries besides its `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldDef>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add an optional field
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Add a field that `create` must receive
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check the values of a new entity
    pub fn validate_create(&self, values: &Record) -> Result<()> {
        for def in self.fields.iter().filter(|f| f.required) {
            match values.get(&def.name) {
                None | Some(Value::Null) => {
                    return Err(ResourceError::validation(format!(
                        "{}: field '{}' is required",
                        self.name, def.name
                    )))
                }
                Some(_) => {}
            }
        }
        self.check_values(values)
    }

    /// Check a partial set of new properties
    pub fn validate_update(&self, properties: &Record) -> Result<()> {
        if properties.contains_key(ID_FIELD) {
            return Err(ResourceError::validation(format!(
                "{}: field '{}' cannot be updated",
                self.name, ID_FIELD
            )));
        }
        for (key, value) in properties {
            if value.is_null() && self.field_def(key).is_some_and(|def| def.required) {
                return Err(ResourceError::validation(format!(
                    "{}: field '{}' is required and cannot be null",
                    self.name, key
                )));
            }
        }
        self.check_values(properties)
    }

    fn check_values(&self, values: &Record) -> Result<()> {
        for (key, value) in values {
            if key == ID_FIELD {
                if !value.is_string() {
                    return Err(ResourceError::validation(format!(
                        "{}: field '{}' must be a string",
                        self.name, ID_FIELD
                    )));
                }
                continue;
            }
            let def = self.field_def(key).ok_or_else(|| {
                ResourceError::validation(format!("{}: unknown field '{}'", self.name, key))
            })?;
            if !value.is_null() && !def.kind.accepts(value) {
                return Err(ResourceError::validation(format!(
                    "{}: field '{}' expects {:?}, got {}",
                    self.name, key, def.kind, value
                )));
            }
        }
        Ok(())
    }

    /// Build an instance from a flat record, keeping only schema fields
    pub fn to_instance(&self, record: &Record, fields: Option<&[String]>) -> ModelInstance {
        let wanted = |name: &str| fields.map_or(true, |list| list.iter().any(|f| f == name));
        let mut values = BTreeMap::new();
        if let Some(id) = record.get(ID_FIELD) {
            values.insert(ID_FIELD.to_string(), id.clone());
        }
        for def in self.fields.iter().filter(|def| wanted(&def.name)) {
            values.insert(
                def.name.clone(),
                record.get(&def.name).cloned().unwrap_or(Value::Null),
            );
        }
        ModelInstance {
            model: self.name.clone(),
            values,
        }
    }

    /// Render one entity in the requested representation
    pub fn shape(
        &self,
        return_type: ReturnType,
        fields: Option<&[String]>,
        dict: Record,
        raw: Value,
    ) -> Resource {
        match return_type {
            ReturnType::Db => Resource::Db(raw),
            ReturnType::Dict => Resource::Dict(project(&dict, fields)),
            ReturnType::Model => Resource::Model(self.to_instance(&dict, fields)),
        }
    }
}

/// Typed representation of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInstance {
    model: String,
    values: BTreeMap<String, Value>,
}

impl ModelInstance {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    /// Field values as a JSON object
    pub fn to_value(&self) -> Value {
        Value::Object(self.values.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn user_schema() -> ModelSchema {
        ModelSchema::new("User")
            .required("name", FieldKind::String)
            .field("age", FieldKind::Integer)
            .field("score", FieldKind::Float)
            .field("active", FieldKind::Boolean)
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_create_requires_required_fields() {
        let schema = user_schema();
        assert!(schema.validate_create(&record(json!({"name": "Ada"}))).is_ok());
        assert!(schema.validate_create(&record(json!({"age": 3}))).is_err());
        assert!(schema.validate_create(&record(json!({"name": null}))).is_err());
    }

    #[test]
    fn test_kind_checks() {
        let schema = user_schema();
        assert!(schema
            .validate_create(&record(json!({"name": "Ada", "age": 3, "score": 1, "active": true})))
            .is_ok());
        assert!(schema.validate_create(&record(json!({"name": "Ada", "age": "3"}))).is_err());
        assert!(schema.validate_create(&record(json!({"name": "Ada", "age": 1.5}))).is_err());
        assert!(schema.validate_create(&record(json!({"name": "Ada", "age": null}))).is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let schema = user_schema();
        let err = schema
            .validate_create(&record(json!({"name": "Ada", "nickname": "A"})))
            .unwrap_err();
        assert!(err.to_string().contains("nickname"));
    }

    #[test]
    fn test_update_rules() {
        let schema = user_schema();
        assert!(schema.validate_update(&record(json!({"age": 4}))).is_ok());
        assert!(schema.validate_update(&record(json!({"id": "x"}))).is_err());
        assert!(schema.validate_update(&record(json!({"name": null}))).is_err());
    }

    #[test]
    fn test_instance_projection_fills_missing_with_null() {
        let schema = user_schema();
        let instance = schema.to_instance(&record(json!({"id": "u1", "name": "Ada"})), None);
        assert_eq!(instance.id(), Some("u1"));
        assert_eq!(instance.get("age"), Some(&Value::Null));

        let fields = vec!["name".to_string()];
        let projected = schema.to_instance(&record(json!({"id": "u1", "name": "Ada", "age": 3})), Some(&fields));
        assert_eq!(projected.values().len(), 2);
        assert!(projected.get("age").is_none());
    }
}
