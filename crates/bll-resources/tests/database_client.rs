//! Contract tests for the database-backed client over the in-memory table

use std::sync::Arc;

use bll_resources::*;
use serde_json::{json, Value};

fn schema() -> ModelSchema {
    ModelSchema::new("User")
        .required("name", FieldKind::String)
        .field("age", FieldKind::Integer)
        .field("role", FieldKind::String)
}

fn client() -> DatabaseResourceClient {
    DatabaseResourceClient::new(Arc::new(InMemoryTable::new(schema())))
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

fn create(values: Value) -> CreateRequest {
    CreateRequest {
        requester_id: "admin".to_string(),
        return_type: None,
        fields: None,
        values: record(values),
    }
}

fn get(id: &str) -> GetRequest {
    GetRequest {
        requester_id: "admin".to_string(),
        return_type: None,
        id: id.to_string(),
        fields: None,
        allow_nonexistent: false,
    }
}

fn list(filters: Value) -> ListRequest {
    ListRequest {
        requester_id: "admin".to_string(),
        return_type: None,
        fields: None,
        order_by: Vec::new(),
        limit: None,
        offset: None,
        filters: record(filters),
    }
}

async fn seed(client: &DatabaseResourceClient) {
    for (id, name, age, role) in [
        ("u1", "Ada", 36, "admin"),
        ("u2", "Grace", 45, "user"),
        ("u3", "Linus", 28, "user"),
    ] {
        client
            .create(create(json!({"id": id, "name": name, "age": age, "role": role})))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_create_then_get() {
    let client = client();
    let created = client.create(create(json!({"name": "Ada"}))).await.unwrap();
    let id = created.id().unwrap().to_string();

    let fetched = client.get(get(&id)).await.unwrap().unwrap();
    assert_eq!(fetched.get("name"), Some(&json!("Ada")));
    assert_eq!(fetched.return_type(), ReturnType::Dict);
}

#[tokio::test]
async fn test_create_validates_schema() {
    let client = client();
    let err = client.create(create(json!({"age": 3}))).await.unwrap_err();
    assert!(matches!(err, ResourceError::Validation(_)));

    let err = client
        .create(create(json!({"name": "Ada", "nickname": "A"})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 422);
}

#[tokio::test]
async fn test_get_missing() {
    let client = client();
    let err = client.get(get("missing")).await.unwrap_err();
    assert_eq!(err, ResourceError::not_found("User", "missing"));

    let mut request = get("missing");
    request.allow_nonexistent = true;
    assert!(client.get(request).await.unwrap().is_none());
}

#[tokio::test]
async fn test_return_types() {
    let client = client();
    seed(&client).await;

    let mut request = get("u1");
    request.return_type = Some(ReturnType::Db);
    let raw = client.get(request).await.unwrap().unwrap();
    match &raw {
        Resource::Db(value) => {
            assert_eq!(value["id"], json!("u1"));
            assert_eq!(value["data"]["name"], json!("Ada"));
            assert!(value.get("created_at").is_some());
        }
        other => panic!("expected raw row, got {:?}", other),
    }

    let mut request = get("u1");
    request.return_type = Some(ReturnType::Model);
    request.fields = Some(vec!["name".to_string()]);
    match client.get(request).await.unwrap().unwrap() {
        Resource::Model(instance) => {
            assert_eq!(instance.model(), "User");
            assert_eq!(instance.id(), Some("u1"));
            assert_eq!(instance.get("name"), Some(&json!("Ada")));
            assert!(instance.get("age").is_none());
        }
        other => panic!("expected model, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_filters_orders_and_paginates() {
    let client = client();
    seed(&client).await;

    let users = client.list(list(json!({"role": "user"}))).await.unwrap();
    assert_eq!(users.len(), 2);

    let mut request = list(json!({"age__gte": 30}));
    request.order_by = vec!["-age".to_string()];
    let ids: Vec<String> = client
        .list(request)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["u2", "u1"]);

    let mut request = list(json!({}));
    request.order_by = vec!["name".to_string()];
    request.offset = Some(1);
    request.limit = Some(1);
    let page = client.list(request).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id(), Some("u2"));

    let err = client.list(list(json!({"age__in": 36}))).await.unwrap_err();
    assert!(matches!(err, ResourceError::Validation(_)));

    // not an operator, so a field no row carries
    let none = client.list(list(json!({"age__between": [1, 2]}))).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_update_and_delete() {
    let client = client();
    seed(&client).await;

    let updated = client
        .update(UpdateRequest {
            requester_id: "admin".to_string(),
            return_type: None,
            id: "u3".to_string(),
            new_properties: record(json!({"age": 29})),
            fields: None,
        })
        .await
        .unwrap();
    assert_eq!(updated.get("age"), Some(&json!(29)));
    assert_eq!(updated.get("name"), Some(&json!("Linus")));

    let err = client
        .update(UpdateRequest {
            requester_id: "admin".to_string(),
            return_type: None,
            id: "missing".to_string(),
            new_properties: record(json!({"age": 1})),
            fields: None,
        })
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let delete = |id: &str| DeleteRequest {
        requester_id: "admin".to_string(),
        id: id.to_string(),
    };
    client.delete(delete("u3")).await.unwrap();
    assert!(client.delete(delete("u3")).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_exists_count_and_search() {
    let client = client();
    seed(&client).await;

    let exists = |predicate: Value| ExistsRequest {
        requester_id: "admin".to_string(),
        predicate: record(predicate),
    };
    assert!(client.exists(exists(json!({"name": "Ada"}))).await.unwrap());
    assert!(!client.exists(exists(json!({"name": "Bob"}))).await.unwrap());

    let count = client
        .count(CountRequest {
            requester_id: "admin".to_string(),
            filters: record(json!({"role": "user"})),
        })
        .await
        .unwrap();
    assert_eq!(count, 2);

    assert!(client.supports_search());
    let found = client
        .search(SearchRequest {
            requester_id: "admin".to_string(),
            return_type: None,
            query: Some("GRA".to_string()),
            fields: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            filters: Record::new(),
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), Some("u2"));
}
