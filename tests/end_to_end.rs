//! End-to-end scenarios across hooks, managers and both backend families

use std::sync::Arc;

use async_trait::async_trait;
use bll_hooks::{builtin, HookError, HookRegistry, HookTarget, Operation, Timing};
use bll_managers::{global_hooks, BllError, CallOutput, Manager};
use bll_resources::{
    CreateRequest, Envelope, ExternalProvider, FieldKind, FieldMapping, GetRequest, ListRequest,
    ModelSchema, Record, Resource, ReturnType, RoundRobinRotation, UpdateRequest,
};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};

fn user_schema() -> ModelSchema {
    ModelSchema::new("User")
        .required("name", FieldKind::String)
        .field("email", FieldKind::String)
}

fn create(name: &str) -> CreateRequest {
    CreateRequest {
        requester_id: "admin".to_string(),
        return_type: None,
        fields: None,
        values: json!({"name": name}).as_object().cloned().unwrap(),
    }
}

fn get(id: &str, allow_nonexistent: bool) -> GetRequest {
    GetRequest {
        requester_id: "admin".to_string(),
        return_type: None,
        id: id.to_string(),
        fields: None,
        allow_nonexistent,
    }
}

/// Provider API that calls the name field `display_name`
#[derive(Default)]
struct UserApi {
    rows: Mutex<Vec<Record>>,
}

#[async_trait]
impl ExternalProvider for UserApi {
    fn name(&self) -> &str {
        "user-api"
    }

    async fn create(&self, mut args: Record) -> Envelope {
        args.remove("requester_id");
        let id = format!("ext-{}", self.rows.lock().len() + 1);
        args.insert("id".to_string(), json!(id));
        self.rows.lock().push(args.clone());
        Envelope::ok(Value::Object(args))
    }

    async fn get(&self, args: Record) -> Envelope {
        match self.rows.lock().iter().find(|row| row.get("id") == args.get("id")) {
            Some(row) => Envelope::ok(Value::Object(row.clone())),
            None => Envelope::not_found(),
        }
    }

    async fn list(&self, _args: Record) -> Envelope {
        let rows = self.rows.lock();
        Envelope::ok(Value::Array(rows.iter().cloned().map(Value::Object).collect()))
    }

    async fn update(&self, args: Record) -> Envelope {
        let mut rows = self.rows.lock();
        let Some(row) = rows.iter_mut().find(|row| row.get("id") == args.get("id")) else {
            return Envelope::not_found();
        };
        if let Some(Value::Object(changes)) = args.get("new_properties") {
            row.extend(changes.clone());
        }
        Envelope::ok(Value::Object(row.clone()))
    }
}

fn database_manager(class: &str, hooks: Arc<bll_managers::ManagerHooks>) -> Manager {
    Manager::builder(class)
        .in_memory(user_schema())
        .hooks(hooks)
        .build()
        .unwrap()
}

fn external_manager(class: &str, hooks: Arc<bll_managers::ManagerHooks>) -> (Manager, Arc<UserApi>) {
    let api = Arc::new(UserApi::default());
    let rotation = Arc::new(RoundRobinRotation::new(vec![api.clone()]));
    let manager = Manager::builder(class)
        .rotating(
            rotation,
            user_schema(),
            FieldMapping::new([("name", "display_name")]).unwrap(),
        )
        .hooks(hooks)
        .build()
        .unwrap();
    (manager, api)
}

#[tokio::test]
async fn test_before_hook_renames_entity_on_both_backends() {
    let hooks = Arc::new(HookRegistry::new());
    for class in ["DbUsers", "ApiUsers"] {
        hooks
            .on(HookTarget::method(class, Operation::Create), Timing::Before)
            .register(|ctx| {
                if let Some(name) = ctx.kwarg_str("name") {
                    let renamed = format!("Hook-{}", name);
                    ctx.set_kwarg("name", json!(renamed));
                }
                Ok(())
            });
    }

    let db = database_manager("DbUsers", hooks.clone());
    let created = db.create(create("Foo")).await.unwrap();
    assert_eq!(created.get("name"), Some(&json!("Hook-Foo")));
    let stored = db
        .get(get(created.id().unwrap(), false))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("name"), Some(&json!("Hook-Foo")));

    let (api_manager, api) = external_manager("ApiUsers", hooks);
    let created = api_manager.create(create("Foo")).await.unwrap();
    assert_eq!(created.get("name"), Some(&json!("Hook-Foo")));
    assert_eq!(api.rows.lock()[0]["display_name"], json!("Hook-Foo"));
}

#[tokio::test]
async fn test_missing_entity_behaves_the_same_on_both_backends() {
    let hooks = Arc::new(HookRegistry::new());
    let db = database_manager("DbMissing", hooks.clone());
    let (api, _) = external_manager("ApiMissing", hooks);

    for manager in [&db, &api] {
        let err = manager.get(get("missing", false)).await.unwrap_err();
        match &err {
            BllError::NotFound { resource, id } => {
                assert_eq!(resource, "User");
                assert_eq!(id, "missing");
            }
            other => panic!("{}: unexpected {:?}", manager.class(), other),
        }
        assert_eq!(err.status_code(), 404);

        assert_eq!(manager.get(get("missing", true)).await.unwrap(), None);
    }
}

#[tokio::test]
async fn test_skip_and_override_on_external_backend() {
    let hooks = Arc::new(HookRegistry::new());
    let (manager, api) = external_manager("CachedUsers", hooks.clone());

    hooks
        .on(HookTarget::method("CachedUsers", Operation::Get), Timing::Before)
        .when(|ctx| ctx.kwarg_str("id") == Some("cached"))
        .register(|ctx| {
            ctx.skip_method();
            ctx.set_result(CallOutput::One(Resource::Dict(
                json!({"id": "cached", "name": "R"}).as_object().cloned().unwrap(),
            )));
            Ok(())
        });
    hooks
        .on(HookTarget::method("CachedUsers", Operation::List), Timing::After)
        .register(|ctx| {
            ctx.set_result(CallOutput::Many(Vec::new()));
            Ok(())
        });

    let cached = manager.get(get("cached", false)).await.unwrap().unwrap();
    assert_eq!(cached.get("name"), Some(&json!("R")));
    assert!(api.rows.lock().is_empty());

    manager.create(create("Ada")).await.unwrap();
    let listed = manager
        .list(ListRequest {
            requester_id: "admin".to_string(),
            return_type: None,
            fields: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            filters: Record::new(),
        })
        .await
        .unwrap();
    assert!(listed.is_empty());
    assert_eq!(api.rows.lock().len(), 1);
}

#[tokio::test]
async fn test_failing_hook_does_not_fail_the_call() {
    let hooks = Arc::new(HookRegistry::new());
    let (manager, _) = external_manager("FlakyUsers", hooks.clone());
    let ran = Arc::new(Mutex::new(Vec::new()));

    let log = ran.clone();
    hooks
        .on(HookTarget::class("FlakyUsers"), Timing::After)
        .priority(-1)
        .register(move |_| {
            log.lock().push("failing");
            Err(HookError::failed("metrics backend unreachable"))
        });
    let log = ran.clone();
    hooks
        .on(HookTarget::class("FlakyUsers"), Timing::After)
        .register(move |_| {
            log.lock().push("next");
            Ok(())
        });

    let created = manager.create(create("Ada")).await.unwrap();
    assert_eq!(created.get("name"), Some(&json!("Ada")));
    assert_eq!(*ran.lock(), vec!["failing", "next"]);
}

#[tokio::test]
async fn test_model_results_deserialize_into_dtos() {
    #[derive(Debug, Deserialize)]
    struct UserDto {
        id: String,
        name: String,
        email: Option<String>,
    }

    let hooks = Arc::new(HookRegistry::new());
    let (manager, _) = external_manager("DtoUsers", hooks);
    let mut request = create("Ada");
    request.return_type = Some(ReturnType::Model);
    let created = manager.create(request).await.unwrap();

    let updated = manager
        .update(UpdateRequest {
            requester_id: "admin".to_string(),
            return_type: Some(ReturnType::Model),
            id: created.id().unwrap().to_string(),
            new_properties: json!({"email": "ada@example.com"}).as_object().cloned().unwrap(),
            fields: None,
        })
        .await
        .unwrap();

    let dto: UserDto = updated.into_typed().unwrap();
    assert_eq!(dto.id, "ext-1");
    assert_eq!(dto.name, "Ada");
    assert_eq!(dto.email.as_deref(), Some("ada@example.com"));
}

#[tokio::test]
async fn test_global_registry_with_builtin_hooks() {
    let class = "GlobalAuditedUsers";
    let registry = global_hooks();
    let (start, stop) = builtin::register_timing(&*registry, HookTarget::class(class));
    let audit = builtin::register_audit(&*registry, HookTarget::class(class));

    let manager = Manager::builder(class)
        .in_memory(user_schema())
        .build()
        .unwrap();
    assert!(Arc::ptr_eq(manager.hooks(), &registry));

    let created = manager.create(create("Ada")).await.unwrap();
    assert_eq!(created.get("name"), Some(&json!("Ada")));
    assert_eq!(registry.hook_count(&class.into()), 3);

    for id in [start, stop, audit] {
        assert!(registry.unregister(id));
    }
    assert_eq!(registry.hook_count(&class.into()), 0);
}
