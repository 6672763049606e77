//! Managers configured from a settings file

use std::{fs, sync::Arc};

use bll_config::{init_logging, BllSettings, SettingsLoader};
use bll_hooks::{HookError, HookRegistry, HookTarget, Operation, Timing};
use bll_managers::{BllError, Manager};
use bll_resources::{
    CreateRequest, DirectProviderResourceClient, Envelope, ExternalProvider, FieldKind,
    GetRequest, ModelSchema, Record, ReturnType,
};
use serde_json::json;
use tempfile::TempDir;

const SETTINGS: &str = r#"
[hooks]
failure_policy = "abort"

[managers]
default_return_type = "model"
max_page_size = 50

[external]
not_found_marker = "ERR_NOT_FOUND"

[logging]
level = "debug"
"#;

fn load(dir: &TempDir) -> BllSettings {
    let path = dir.path().join("settings.toml");
    fs::write(&path, SETTINGS).unwrap();
    SettingsLoader::with_path(path)
        .env_prefix("BLL_SETTINGS_DRIVEN_TEST")
        .load()
        .unwrap()
}

fn create(name: &str) -> CreateRequest {
    CreateRequest {
        requester_id: "admin".to_string(),
        return_type: None,
        fields: None,
        values: json!({"name": name}).as_object().cloned().unwrap(),
    }
}

struct LegacyApi;

#[async_trait::async_trait]
impl ExternalProvider for LegacyApi {
    fn name(&self) -> &str {
        "legacy"
    }

    async fn get(&self, _args: Record) -> Envelope {
        Envelope::failure("ERR_NOT_FOUND")
    }
}

#[tokio::test]
async fn test_settings_file_shapes_manager_behaviour() {
    let dir = TempDir::new().unwrap();
    let settings = load(&dir);
    assert_eq!(settings.managers.max_page_size, 50);
    init_logging(&settings.logging).unwrap();

    let hooks = Arc::new(HookRegistry::new());
    let manager = Manager::builder("ConfiguredUsers")
        .in_memory(ModelSchema::new("User").required("name", FieldKind::String))
        .hooks(hooks.clone())
        .settings(settings)
        .build()
        .unwrap();

    // Default return type comes from the file
    let created = manager.create(create("Ada")).await.unwrap();
    assert_eq!(created.return_type(), ReturnType::Model);
    assert_eq!(manager.settings().max_page_size, 50);

    // Hooks without their own policy now abort
    hooks
        .on(HookTarget::method("ConfiguredUsers", Operation::Create), Timing::Before)
        .register(|_| Err(HookError::rejected("frozen")));
    let err = manager.create(create("Grace")).await.unwrap_err();
    assert!(matches!(err, BllError::HookFailure { .. }));
}

#[tokio::test]
async fn test_not_found_marker_from_settings() {
    let dir = TempDir::new().unwrap();
    let settings = load(&dir);

    let manager = Manager::builder("LegacyUsers")
        .direct(
            Arc::new(LegacyApi),
            ModelSchema::new("User").required("name", FieldKind::String),
            Default::default(),
        )
        .hooks(Arc::new(HookRegistry::new()))
        .settings(settings)
        .build()
        .unwrap();

    let request = GetRequest {
        requester_id: "admin".to_string(),
        return_type: None,
        id: "7".to_string(),
        fields: None,
        allow_nonexistent: false,
    };
    assert!(manager.get(request).await.unwrap_err().is_not_found());

    // Built without the settings the marker is the default one
    let plain = Manager::builder("PlainLegacyUsers")
        .client(Arc::new(DirectProviderResourceClient::direct(
            Arc::new(LegacyApi),
            ModelSchema::new("User"),
        )))
        .hooks(Arc::new(HookRegistry::new()))
        .build()
        .unwrap();
    let request = GetRequest {
        requester_id: "admin".to_string(),
        return_type: None,
        id: "7".to_string(),
        fields: None,
        allow_nonexistent: true,
    };
    let err = plain.get(request).await.unwrap_err();
    assert_eq!(err.status_code(), 400);
}
