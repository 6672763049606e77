//! Interception engine
//!
//! Wraps one manager call:
//!
//! 1. build the BEFORE context from the call arguments
//! 2. run the BEFORE hooks in `(priority, registration)` order
//! 3. return the hook-provided result if a hook called `skip_method()`
//! 4. otherwise run the wrapped method with the (possibly rewritten) arguments
//! 5. run the AFTER hooks on a fresh context carrying the result
//! 6. return the hook-provided result if any, else the method's result
//!
//! Hook failures follow the hook's [`HookFailurePolicy`], falling back to the
//! interceptor's default. Under `Isolate` the failure is logged and the next
//! hook runs; under `Abort` the call fails with [`HookError::Aborted`].

use std::{
    future::Future,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use tracing::{debug, error, info};

use crate::{
    context::{CallArgs, HookContext},
    error::{panic_message, HookError},
    registry::{HookEntry, HookRegistry},
    types::{HookFailurePolicy, InterceptTarget, Operation},
};

/// Runs hook phases around wrapped calls
pub struct Interceptor<O> {
    registry: Arc<HookRegistry<O>>,
    default_policy: HookFailurePolicy,
    catch_panics: bool,
}

impl<O> Clone for Interceptor<O> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            default_policy: self.default_policy,
            catch_panics: self.catch_panics,
        }
    }
}

impl<O> Interceptor<O> {
    pub fn new(registry: Arc<HookRegistry<O>>) -> Self {
        Self {
            registry,
            default_policy: HookFailurePolicy::Isolate,
            catch_panics: true,
        }
    }

    /// Policy for hooks registered without one
    pub fn with_default_policy(mut self, policy: HookFailurePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// When false a panicking hook unwinds through the call
    pub fn with_catch_panics(mut self, catch_panics: bool) -> Self {
        self.catch_panics = catch_panics;
        self
    }

    pub fn registry(&self) -> &Arc<HookRegistry<O>> {
        &self.registry
    }

    pub fn default_policy(&self) -> HookFailurePolicy {
        self.default_policy
    }

    pub fn catches_panics(&self) -> bool {
        self.catch_panics
    }
}

impl<O: Default> Interceptor<O> {
    /// Run `body` wrapped in the hooks registered for `operation` on `target`
    ///
    /// Errors from `body` are returned as-is and skip the AFTER phase.
    pub async fn intercept<E, F, Fut>(
        &self,
        target: &dyn InterceptTarget,
        operation: Operation,
        call: CallArgs,
        body: F,
    ) -> Result<O, E>
    where
        E: From<HookError>,
        F: FnOnce(CallArgs) -> Fut,
        Fut: Future<Output = Result<O, E>>,
    {
        let mut ctx = HookContext::before(target, operation, call);
        self.run_phase(&mut ctx)?;

        if ctx.is_skipped() {
            info!(
                manager = %target.class(),
                method = %operation,
                has_result = ctx.modified_result().is_some(),
                "Method skipped by hook"
            );
            return Ok(ctx.take_modified_result().unwrap_or_default());
        }

        let result = body(ctx.call_args()).await?;

        let mut after = ctx.into_after(result);
        self.run_phase(&mut after)?;

        if after.modified_result().is_some() {
            info!(
                manager = %target.class(),
                method = %operation,
                "Result overridden by hook"
            );
        }
        Ok(after.into_output().unwrap_or_default())
    }

    fn run_phase(&self, ctx: &mut HookContext<'_, O>) -> Result<(), HookError> {
        let manager = ctx.manager();
        let hooks = self.registry.resolve(
            manager.class(),
            manager.instance_id(),
            ctx.method_name(),
            ctx.timing(),
        );
        if hooks.is_empty() {
            return Ok(());
        }

        debug!(
            manager = %ctx.manager().class(),
            method = %ctx.method_name(),
            timing = %ctx.timing(),
            hook_count = hooks.len(),
            "Running hooks"
        );

        for hook in hooks {
            if !self.condition_holds(&hook, ctx) {
                debug!(hook = %hook.name(), "Condition not met, skipping hook");
                continue;
            }

            match self.invoke(&hook, ctx) {
                Ok(()) => {
                    debug!(hook = %hook.name(), priority = hook.priority(), "Hook completed");
                }
                Err(err) => {
                    let policy = hook.failure_policy().unwrap_or(self.default_policy);
                    error!(
                        hook = %hook.name(),
                        manager = %ctx.manager().class(),
                        method = %ctx.method_name(),
                        timing = %ctx.timing(),
                        policy = ?policy,
                        error = %err,
                        "Hook failed"
                    );
                    if policy == HookFailurePolicy::Abort {
                        return Err(HookError::Aborted {
                            hook: hook.name().to_string(),
                            operation: ctx.method_name(),
                            timing: ctx.timing(),
                            source: Box::new(err),
                        });
                    }
                    // isolate: continue with the next hook
                }
            }
        }
        Ok(())
    }

    fn condition_holds(&self, hook: &HookEntry<O>, ctx: &HookContext<'_, O>) -> bool {
        if !hook.has_condition() {
            return true;
        }
        if !self.catch_panics {
            return hook.condition_holds(ctx);
        }
        catch_unwind(AssertUnwindSafe(|| hook.condition_holds(ctx))).unwrap_or_else(|payload| {
            error!(
                hook = %hook.name(),
                panic = %panic_message(payload.as_ref()),
                "Hook condition panicked; treating as false"
            );
            false
        })
    }

    fn invoke(&self, hook: &HookEntry<O>, ctx: &mut HookContext<'_, O>) -> Result<(), HookError> {
        if !self.catch_panics {
            return hook.invoke(ctx);
        }
        catch_unwind(AssertUnwindSafe(|| hook.invoke(ctx)))
            .unwrap_or_else(|payload| Err(HookError::Panicked(panic_message(payload.as_ref()))))
    }
}
