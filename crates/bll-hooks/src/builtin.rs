//! Ready-made hooks

use std::time::Instant;

use tracing::info;

use crate::{
    registry::HookRegistry,
    types::{HookId, HookTarget, Timing},
};

/// `condition_data` key holding the call's start instant
pub const TIMING_START_KEY: &str = "timing.start";

/// Register a BEFORE/AFTER pair that logs how long each call took
///
/// The BEFORE half runs first and the AFTER half runs last so the measurement
/// covers the other hooks too. Skipped calls are not measured.
pub fn register_timing<O: 'static>(registry: &HookRegistry<O>, target: HookTarget) -> (HookId, HookId) {
    let start = registry
        .on(target.clone(), Timing::Before)
        .priority(i32::MIN)
        .named(format!("timing-start@{}", target))
        .register(|ctx| {
            ctx.condition_data.insert(TIMING_START_KEY, Instant::now());
            Ok(())
        });

    let stop = registry
        .on(target.clone(), Timing::After)
        .priority(i32::MAX)
        .named(format!("timing-stop@{}", target))
        .register(|ctx| {
            if let Some(started) = ctx.condition_data.get::<Instant>(TIMING_START_KEY) {
                info!(
                    manager = %ctx.manager().class(),
                    method = %ctx.method_name(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Call completed"
                );
            }
            Ok(())
        });

    (start, stop)
}

/// Register an AFTER hook logging who completed which call
pub fn register_audit<O: 'static>(registry: &HookRegistry<O>, target: HookTarget) -> HookId {
    registry
        .on(target.clone(), Timing::After)
        .priority(i32::MAX)
        .named(format!("audit@{}", target))
        .register(|ctx| {
            info!(
                manager = %ctx.manager().class(),
                instance = %ctx.manager().instance_id(),
                method = %ctx.method_name(),
                requester = ctx.kwarg_str("requester_id").unwrap_or("<unknown>"),
                "Audit"
            );
            Ok(())
        })
}
