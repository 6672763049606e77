//! Shared request and representation types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{ResourceError, Result},
    model::ModelInstance,
};

/// A flat field-name to value mapping
pub type Record = Map<String, Value>;

/// Name of the identifier field in every representation
pub const ID_FIELD: &str = "id";

/// Representation a caller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// The backend's own object
    Db,
    /// A plain mapping
    #[default]
    Dict,
    /// A schema-validated instance
    Model,
}

/// Row as kept by the bundled in-memory table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub data: Record,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Flattened mapping with the id included
    pub fn to_dict(&self) -> Record {
        let mut dict = Record::with_capacity(self.data.len() + 1);
        dict.insert(ID_FIELD.to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.data {
            dict.insert(key.clone(), value.clone());
        }
        dict
    }
}

/// A resource in the representation requested by the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    /// Backend object; a serialized [`StoredRecord`] or a provider payload
    Db(Value),
    Dict(Record),
    Model(ModelInstance),
}

impl Resource {
    pub fn return_type(&self) -> ReturnType {
        match self {
            Resource::Db(_) => ReturnType::Db,
            Resource::Dict(_) => ReturnType::Dict,
            Resource::Model(_) => ReturnType::Model,
        }
    }

    /// Field value; for backend objects nested `data` is searched too
    pub fn get(&self, field: &str) -> Option<&Value> {
        match self {
            Resource::Db(value) => value
                .get(field)
                .or_else(|| value.get("data").and_then(|data| data.get(field))),
            Resource::Dict(record) => record.get(field),
            Resource::Model(instance) => instance.get(field),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.get(ID_FIELD).and_then(Value::as_str)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Resource::Db(value) => value.clone(),
            Resource::Dict(record) => Value::Object(record.clone()),
            Resource::Model(instance) => instance.to_value(),
        }
    }

    /// Deserialize into a caller-defined DTO
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            Resource::Db(value) => value,
            Resource::Dict(record) => Value::Object(record),
            Resource::Model(instance) => instance.to_value(),
        };
        serde_json::from_value(value)
            .map_err(|e| ResourceError::validation(format!("cannot convert resource: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_stored_record_to_dict_includes_id() {
        let now = Utc::now();
        let record = StoredRecord {
            id: "u1".to_string(),
            data: json!({"name": "Ada"}).as_object().cloned().unwrap(),
            created_at: now,
            updated_at: now,
        };
        let dict = record.to_dict();
        assert_eq!(dict["id"], json!("u1"));
        assert_eq!(dict["name"], json!("Ada"));
    }

    #[test]
    fn test_db_resource_reads_nested_data() {
        let raw = Resource::Db(json!({"id": "u1", "data": {"name": "Ada"}}));
        assert_eq!(raw.id(), Some("u1"));
        assert_eq!(raw.get("name"), Some(&json!("Ada")));
    }

    #[test]
    fn test_return_type_serde_names() {
        assert_eq!(serde_json::to_value(ReturnType::Db).unwrap(), json!("db"));
        assert_eq!(
            serde_json::from_value::<ReturnType>(json!("model")).unwrap(),
            ReturnType::Model
        );
        assert_eq!(ReturnType::default(), ReturnType::Dict);
    }

    #[test]
    fn test_into_typed() {
        #[derive(Deserialize)]
        struct User {
            id: String,
            name: String,
        }

        let dict = Resource::Dict(json!({"id": "u1", "name": "Ada"}).as_object().cloned().unwrap());
        let user: User = dict.into_typed().unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.name, "Ada");
    }
}
