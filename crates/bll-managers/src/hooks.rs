//! Hook types specialised for managers

use std::sync::Arc;

use bll_config::{FailurePolicySetting, HookSettings};
use bll_hooks::{HookContext, HookFailurePolicy, HookRegistry, Interceptor};
use once_cell::sync::Lazy;

use crate::output::CallOutput;

/// Registry of hooks over manager calls
pub type ManagerHooks = HookRegistry<CallOutput>;

/// Context a manager hook receives
pub type ManagerHookContext<'a> = HookContext<'a, CallOutput>;

static GLOBAL_HOOKS: Lazy<Arc<ManagerHooks>> = Lazy::new(|| Arc::new(HookRegistry::new()));

/// Process-wide registry used by managers built without `.hooks(..)`
///
/// Register startup hooks here; every manager sharing it sees them from its
/// next call on.
pub fn global_hooks() -> Arc<ManagerHooks> {
    Arc::clone(&GLOBAL_HOOKS)
}

pub(crate) fn failure_policy(setting: FailurePolicySetting) -> HookFailurePolicy {
    match setting {
        FailurePolicySetting::Isolate => HookFailurePolicy::Isolate,
        FailurePolicySetting::Abort => HookFailurePolicy::Abort,
    }
}

pub(crate) fn interceptor(
    registry: Arc<ManagerHooks>,
    settings: &HookSettings,
) -> Interceptor<CallOutput> {
    Interceptor::new(registry)
        .with_default_policy(failure_policy(settings.failure_policy))
        .with_catch_panics(settings.catch_panics)
}
