//! Per-call data carrier handed to every hook
//!
//! One [`HookContext`] is built for the BEFORE phase of a call and another for
//! the AFTER phase. Hooks in a phase share the same context by `&mut`, so a
//! later hook sees what an earlier one wrote. The context never leaves the
//! task running the call.

use std::{
    any::Any,
    collections::HashMap,
    fmt,
};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::types::{InterceptTarget, Operation, Timing};

/// Positional and keyword inputs of a wrapped call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_kwargs(kwargs: Map<String, Value>) -> Self {
        Self {
            args: Vec::new(),
            kwargs,
        }
    }

    pub fn with_arg(mut self, arg: Value) -> Self {
        self.args.push(arg);
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }
}

/// Typed scratch space shared by the BEFORE and AFTER phases of one call
#[derive(Default)]
pub struct ConditionData {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl ConditionData {
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Box::new(value));
    }

    /// `None` when the key is absent or holds another type
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(key).and_then(|v| v.downcast_mut::<T>())
    }

    pub fn remove<T: Any>(&mut self, key: &str) -> Option<T> {
        match self.entries.remove(key)?.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(other) => {
                self.entries.insert(key.to_string(), other);
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ConditionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Mutable state of one phase of one call
pub struct HookContext<'a, O> {
    manager: &'a dyn InterceptTarget,
    method_name: Operation,
    timing: Timing,
    /// Positional inputs; BEFORE hooks may rewrite them
    pub args: Vec<Value>,
    /// Keyword inputs; BEFORE hooks may add, remove or rewrite entries
    pub kwargs: Map<String, Value>,
    /// State handed from BEFORE hooks to AFTER hooks of the same call
    pub condition_data: ConditionData,
    result: Option<O>,
    modified_result: Option<O>,
    skip_execution: bool,
}

impl<'a, O> HookContext<'a, O> {
    pub(crate) fn before(
        manager: &'a dyn InterceptTarget,
        method_name: Operation,
        call: CallArgs,
    ) -> Self {
        Self {
            manager,
            method_name,
            timing: Timing::Before,
            args: call.args,
            kwargs: call.kwargs,
            condition_data: ConditionData::default(),
            result: None,
            modified_result: None,
            skip_execution: false,
        }
    }

    /// Fresh AFTER context carrying the inputs and scratch state of this one
    pub(crate) fn into_after(self, result: O) -> Self {
        Self {
            manager: self.manager,
            method_name: self.method_name,
            timing: Timing::After,
            args: self.args,
            kwargs: self.kwargs,
            condition_data: self.condition_data,
            result: Some(result),
            modified_result: None,
            skip_execution: false,
        }
    }

    /// Final value of an AFTER phase
    pub(crate) fn into_output(self) -> Option<O> {
        self.modified_result.or(self.result)
    }

    pub(crate) fn take_modified_result(&mut self) -> Option<O> {
        self.modified_result.take()
    }

    pub fn manager(&self) -> &dyn InterceptTarget {
        self.manager
    }

    /// The wrapped manager as its concrete type
    pub fn manager_as<T: Any>(&self) -> Option<&T> {
        self.manager.as_any().downcast_ref::<T>()
    }

    pub fn method_name(&self) -> Operation {
        self.method_name
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// What the wrapped method returned; always `None` during BEFORE
    pub fn result(&self) -> Option<&O> {
        self.result.as_ref()
    }

    pub fn modified_result(&self) -> Option<&O> {
        self.modified_result.as_ref()
    }

    /// Replace the value the call returns
    ///
    /// In AFTER this supersedes the method's result. In BEFORE it is only used
    /// together with [`skip_method`](Self::skip_method).
    pub fn set_result(&mut self, value: O) {
        self.modified_result = Some(value);
    }

    /// Prevent the wrapped method from running. Ignored outside BEFORE.
    pub fn skip_method(&mut self) {
        if self.timing != Timing::Before {
            warn!(
                manager = %self.manager.class(),
                method = %self.method_name,
                "skip_method() called during after phase; ignored"
            );
            return;
        }
        info!(
            manager = %self.manager.class(),
            method = %self.method_name,
            "Hook requested method skip"
        );
        self.skip_execution = true;
    }

    pub fn is_skipped(&self) -> bool {
        self.skip_execution
    }

    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// String-valued kwarg, `None` for absent or non-string values
    pub fn kwarg_str(&self, key: &str) -> Option<&str> {
        self.kwargs.get(key).and_then(Value::as_str)
    }

    pub fn set_kwarg(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.kwargs.insert(key.into(), value)
    }

    pub fn remove_kwarg(&mut self, key: &str) -> Option<Value> {
        self.kwargs.remove(key)
    }

    /// Snapshot of the current inputs
    pub fn call_args(&self) -> CallArgs {
        CallArgs {
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        }
    }
}

impl<O: fmt::Debug> fmt::Debug for HookContext<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("manager", &self.manager.class())
            .field("method_name", &self.method_name)
            .field("timing", &self.timing)
            .field("args", &self.args)
            .field("kwargs", &self.kwargs)
            .field("condition_data", &self.condition_data)
            .field("result", &self.result)
            .field("modified_result", &self.modified_result)
            .field("skip_execution", &self.skip_execution)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::types::{InstanceId, ManagerClass};

    struct Widgets {
        class: ManagerClass,
        id: InstanceId,
    }

    impl InterceptTarget for Widgets {
        fn class(&self) -> &ManagerClass {
            &self.class
        }

        fn instance_id(&self) -> InstanceId {
            self.id
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn widgets() -> Widgets {
        Widgets {
            class: ManagerClass::new("WidgetManager"),
            id: InstanceId::new(),
        }
    }

    #[test]
    fn test_skip_only_in_before() {
        let manager = widgets();
        let mut ctx: HookContext<'_, i32> =
            HookContext::before(&manager, Operation::Get, CallArgs::new());
        ctx.skip_method();
        assert!(ctx.is_skipped());

        let mut after = HookContext::before(&manager, Operation::Get, CallArgs::new()).into_after(1);
        after.skip_method();
        assert!(!after.is_skipped());
    }

    #[test]
    fn test_after_inherits_inputs_and_scratch() {
        let manager = widgets();
        let call = CallArgs::new().with_kwarg("name", json!("Foo"));
        let mut ctx: HookContext<'_, i32> = HookContext::before(&manager, Operation::Create, call);
        ctx.set_kwarg("name", json!("Hook-Foo"));
        ctx.condition_data.insert("marker", 7_u32);
        ctx.set_result(99);

        let after = ctx.into_after(5);
        assert_eq!(after.timing(), Timing::After);
        assert_eq!(after.kwarg_str("name"), Some("Hook-Foo"));
        assert_eq!(after.condition_data.get::<u32>("marker"), Some(&7));
        assert_eq!(after.result(), Some(&5));
        assert!(after.modified_result().is_none());
        assert_eq!(after.into_output(), Some(5));
    }

    #[test]
    fn test_modified_result_wins() {
        let manager = widgets();
        let mut after: HookContext<'_, i32> =
            HookContext::before(&manager, Operation::Get, CallArgs::new()).into_after(1);
        after.set_result(2);
        assert_eq!(after.into_output(), Some(2));
    }

    #[test]
    fn test_manager_downcast() {
        let manager = widgets();
        let ctx: HookContext<'_, ()> = HookContext::before(&manager, Operation::List, CallArgs::new());
        assert!(ctx.manager_as::<Widgets>().is_some());
        assert!(ctx.manager_as::<String>().is_none());
    }

    #[test]
    fn test_condition_data_typed_access() {
        let mut data = ConditionData::default();
        data.insert("count", 3_usize);
        assert_eq!(data.get::<usize>("count"), Some(&3));
        assert!(data.get::<String>("count").is_none());
        assert!(data.remove::<String>("count").is_none());
        assert!(data.contains("count"));
        *data.get_mut::<usize>("count").unwrap() += 1;
        assert_eq!(data.remove::<usize>("count"), Some(4));
        assert!(data.is_empty());
    }
}
