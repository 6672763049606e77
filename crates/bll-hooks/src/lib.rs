//! BLL Hooks
//!
//! Interception of manager calls through a registry of prioritised hooks.
//!
//! # Overview
//!
//! Every public CRUD method of a manager is run through an [`Interceptor`]:
//! BEFORE hooks may rewrite the call's arguments or short-circuit it, the
//! wrapped method runs, then AFTER hooks may observe or replace the result.
//!
//! # Components
//!
//! 1. **Context** (`context`): [`HookContext`], the per-call state hooks read and mutate
//! 2. **Registry** (`registry`): [`HookRegistry`], hooks keyed by class, operation and timing
//! 3. **Engine** (`engine`): [`Interceptor`], runs the phases around a call
//! 4. **Built-ins** (`builtin`): timing and audit hooks
//!
//! # Ordering
//!
//! Within a phase hooks run by ascending priority; equal priorities run in
//! registration order. Class-wide, per-operation and per-instance hooks are
//! merged before sorting, so only the number decides.
//!
//! # Failure policy
//!
//! A hook returning `Err` (or panicking) is handled according to its
//! [`HookFailurePolicy`]: `Isolate` logs and continues, `Abort` fails the
//! call. Hooks without a declared policy use the interceptor's default.
//!
//! # Thread Safety
//!
//! The registry is `Send + Sync` and may be read by concurrent calls while
//! other threads register hooks. A [`HookContext`] belongs to a single call.

pub mod builtin;
pub mod context;
pub mod engine;
pub mod error;
pub mod registry;
pub mod types;

pub use context::{CallArgs, ConditionData, HookContext};
pub use engine::Interceptor;
pub use error::{panic_message, HookError, Result};
pub use registry::{HookEntry, HookRegistration, HookRegistry, DEFAULT_PRIORITY};
pub use types::{
    HookFailurePolicy, HookId, HookTarget, InstanceId, InterceptTarget, ManagerClass, Operation,
    Timing,
};
