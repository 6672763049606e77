//! Core identifiers shared by the registry and the engine

use std::{any::Any, fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HookError;

/// When a hook runs relative to the wrapped method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timing {
    Before,
    After,
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timing::Before => f.write_str("before"),
            Timing::After => f.write_str("after"),
        }
    }
}

/// A manager method the engine can wrap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Get,
    List,
    Update,
    Delete,
    Search,
    Count,
    Exists,
    BatchUpdate,
    BatchDelete,
}

impl Operation {
    pub const ALL: [Operation; 10] = [
        Operation::Create,
        Operation::Get,
        Operation::List,
        Operation::Update,
        Operation::Delete,
        Operation::Search,
        Operation::Count,
        Operation::Exists,
        Operation::BatchUpdate,
        Operation::BatchDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Get => "get",
            Operation::List => "list",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Search => "search",
            Operation::Count => "count",
            Operation::Exists => "exists",
            Operation::BatchUpdate => "batch_update",
            Operation::BatchDelete => "batch_delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = HookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| HookError::failed(format!("unknown operation '{}'", s)))
    }
}

/// Name of a manager type; class-level hooks are keyed by it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManagerClass(Arc<str>);

impl ManagerClass {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ManagerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ManagerClass {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ManagerClass {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Identity of one manager instance; method-level hooks are keyed by it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(Uuid);

impl InstanceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(pub(crate) u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// What the engine does when a hook returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookFailurePolicy {
    /// Log and continue with the next hook and the wrapped method
    #[default]
    Isolate,
    /// Stop the call and surface the error
    Abort,
}

/// Where a hook attaches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HookTarget {
    /// Every operation of a manager class
    Class(ManagerClass),
    /// One operation of a manager class
    Method(ManagerClass, Operation),
    /// One operation of one manager instance
    Bound {
        class: ManagerClass,
        instance: InstanceId,
        operation: Operation,
    },
}

impl HookTarget {
    pub fn class(class: impl Into<ManagerClass>) -> Self {
        HookTarget::Class(class.into())
    }

    pub fn method(class: impl Into<ManagerClass>, operation: Operation) -> Self {
        HookTarget::Method(class.into(), operation)
    }

    /// Target one operation of a live manager
    pub fn bound(target: &dyn InterceptTarget, operation: Operation) -> Self {
        HookTarget::Bound {
            class: target.class().clone(),
            instance: target.instance_id(),
            operation,
        }
    }

    pub fn manager_class(&self) -> &ManagerClass {
        match self {
            HookTarget::Class(class) | HookTarget::Method(class, _) => class,
            HookTarget::Bound { class, .. } => class,
        }
    }
}

impl fmt::Display for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookTarget::Class(class) => write!(f, "{}.*", class),
            HookTarget::Method(class, op) => write!(f, "{}.{}", class, op),
            HookTarget::Bound {
                class,
                instance,
                operation,
            } => write!(f, "{}[{}].{}", class, instance, operation),
        }
    }
}

/// Anything the engine can wrap
///
/// Hooks see the wrapped object read-only through
/// [`HookContext::manager`](crate::HookContext::manager).
pub trait InterceptTarget: Send + Sync {
    fn class(&self) -> &ManagerClass;

    fn instance_id(&self) -> InstanceId;

    /// Downcasting support for hooks that need the concrete manager
    fn as_any(&self) -> &dyn Any;
}
