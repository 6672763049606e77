//! Hook registry
//!
//! Hooks are stored per manager class. Inside a class they live in one of
//! three buckets: class-wide (every operation), per operation, or bound to a
//! single manager instance and operation. Each bucket is split by [`Timing`]
//! and kept in priority order.
//!
//! At call time the engine asks for the hooks of one `(class, instance,
//! operation, timing)`; the three buckets are merged and re-sorted by
//! `(priority, registration sequence)`. Lower priorities run first, equal
//! priorities run in registration order, and bucket specificity does not
//! affect the order.
//!
//! ```ignore
//! let registry: HookRegistry<CallOutput> = HookRegistry::new();
//! registry
//!     .on(HookTarget::method("UserManager", Operation::Create), Timing::Before)
//!     .priority(10)
//!     .when(|ctx| ctx.kwarg_str("name") == Some("Foo"))
//!     .register(|ctx| {
//!         ctx.set_kwarg("name", json!("Hook-Foo"));
//!         Ok(())
//!     });
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    context::HookContext,
    error::Result,
    types::{HookFailurePolicy, HookId, HookTarget, InstanceId, ManagerClass, Operation, Timing},
};

/// Priority used when a registration does not set one
pub const DEFAULT_PRIORITY: i32 = 0;

/// A hook body
pub type HookFn<O> = Arc<dyn Fn(&mut HookContext<'_, O>) -> Result<()> + Send + Sync>;

/// A predicate deciding whether a hook runs for a given call
pub type HookCondition<O> = Arc<dyn Fn(&HookContext<'_, O>) -> bool + Send + Sync>;

/// One registered hook
pub struct HookEntry<O> {
    id: HookId,
    name: String,
    target: HookTarget,
    timing: Timing,
    priority: i32,
    condition: Option<HookCondition<O>>,
    failure_policy: Option<HookFailurePolicy>,
    callable: HookFn<O>,
}

impl<O> HookEntry<O> {
    pub fn id(&self) -> HookId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &HookTarget {
        &self.target
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Policy declared at registration, if any
    pub fn failure_policy(&self) -> Option<HookFailurePolicy> {
        self.failure_policy
    }

    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    /// True when there is no condition or the condition holds
    pub(crate) fn condition_holds(&self, ctx: &HookContext<'_, O>) -> bool {
        self.condition.as_ref().map_or(true, |cond| cond(ctx))
    }

    pub(crate) fn invoke(&self, ctx: &mut HookContext<'_, O>) -> Result<()> {
        (self.callable)(ctx)
    }

    fn sort_key(&self) -> (i32, HookId) {
        (self.priority, self.id)
    }
}

impl<O> fmt::Debug for HookEntry<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("target", &self.target)
            .field("timing", &self.timing)
            .field("priority", &self.priority)
            .field("has_condition", &self.condition.is_some())
            .field("failure_policy", &self.failure_policy)
            .finish()
    }
}

/// BEFORE and AFTER lists of one bucket, each in priority order
struct TimingBuckets<O> {
    before: Vec<Arc<HookEntry<O>>>,
    after: Vec<Arc<HookEntry<O>>>,
}

impl<O> Default for TimingBuckets<O> {
    fn default() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
        }
    }
}

impl<O> TimingBuckets<O> {
    fn get(&self, timing: Timing) -> &[Arc<HookEntry<O>>] {
        match timing {
            Timing::Before => &self.before,
            Timing::After => &self.after,
        }
    }

    fn get_mut(&mut self, timing: Timing) -> &mut Vec<Arc<HookEntry<O>>> {
        match timing {
            Timing::Before => &mut self.before,
            Timing::After => &mut self.after,
        }
    }

    /// Insert after every entry with a lower or equal priority
    fn insert(&mut self, entry: Arc<HookEntry<O>>) {
        let list = self.get_mut(entry.timing);
        let at = list.partition_point(|e| e.priority <= entry.priority);
        list.insert(at, entry);
    }

    fn remove(&mut self, id: HookId) -> bool {
        for list in [&mut self.before, &mut self.after] {
            if let Some(pos) = list.iter().position(|e| e.id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    fn len(&self) -> usize {
        self.before.len() + self.after.len()
    }
}

/// Hooks of one manager class
struct ClassHooks<O> {
    every_operation: TimingBuckets<O>,
    operations: HashMap<Operation, TimingBuckets<O>>,
    bound: HashMap<(InstanceId, Operation), TimingBuckets<O>>,
}

impl<O> Default for ClassHooks<O> {
    fn default() -> Self {
        Self {
            every_operation: TimingBuckets::default(),
            operations: HashMap::new(),
            bound: HashMap::new(),
        }
    }
}

impl<O> ClassHooks<O> {
    fn bucket_mut(&mut self, target: &HookTarget) -> &mut TimingBuckets<O> {
        match target {
            HookTarget::Class(_) => &mut self.every_operation,
            HookTarget::Method(_, op) => self.operations.entry(*op).or_default(),
            HookTarget::Bound {
                instance,
                operation,
                ..
            } => self.bound.entry((*instance, *operation)).or_default(),
        }
    }

    fn len(&self) -> usize {
        self.every_operation.len()
            + self.operations.values().map(TimingBuckets::len).sum::<usize>()
            + self.bound.values().map(TimingBuckets::len).sum::<usize>()
    }
}

/// Process-lifetime store of hooks, safe for concurrent resolution
///
/// Registration takes a write lock; resolution takes a read lock and returns
/// cloned entry handles, so no lock is held while hooks run.
pub struct HookRegistry<O> {
    classes: RwLock<HashMap<ManagerClass, ClassHooks<O>>>,
    next_id: AtomicU64,
}

impl<O> Default for HookRegistry<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> HookRegistry<O> {
    pub fn new() -> Self {
        Self {
            classes: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Start a registration for `target` in phase `timing`
    pub fn on(&self, target: HookTarget, timing: Timing) -> HookRegistration<'_, O> {
        HookRegistration {
            registry: self,
            target,
            timing,
            priority: DEFAULT_PRIORITY,
            condition: None,
            failure_policy: None,
            name: None,
        }
    }

    /// Store a hook. Registering the same function twice stores it twice.
    fn insert(&self, entry: HookEntry<O>) -> HookId {
        debug!(
            hook = %entry.name,
            target = %entry.target,
            timing = %entry.timing,
            priority = entry.priority,
            "Registering hook"
        );

        let id = entry.id;
        let mut classes = self.classes.write();
        classes
            .entry(entry.target.manager_class().clone())
            .or_default()
            .bucket_mut(&entry.target)
            .insert(Arc::new(entry));
        id
    }

    fn next_id(&self) -> HookId {
        HookId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Hooks for one call phase in execution order
    pub fn resolve(
        &self,
        class: &ManagerClass,
        instance: InstanceId,
        operation: Operation,
        timing: Timing,
    ) -> Vec<Arc<HookEntry<O>>> {
        let classes = self.classes.read();
        let Some(hooks) = classes.get(class) else {
            return Vec::new();
        };

        let mut merged: Vec<Arc<HookEntry<O>>> = hooks
            .every_operation
            .get(timing)
            .iter()
            .chain(hooks.operations.get(&operation).map_or(&[][..], |b| b.get(timing)))
            .chain(
                hooks
                    .bound
                    .get(&(instance, operation))
                    .map_or(&[][..], |b| b.get(timing)),
            )
            .cloned()
            .collect();
        drop(classes);

        merged.sort_by_key(|e| e.sort_key());
        merged
    }

    /// Names and priorities for one call phase, in execution order
    pub fn describe(
        &self,
        class: &ManagerClass,
        instance: InstanceId,
        operation: Operation,
        timing: Timing,
    ) -> Vec<(String, i32)> {
        self.resolve(class, instance, operation, timing)
            .iter()
            .map(|e| (e.name.clone(), e.priority))
            .collect()
    }

    /// Remove one hook; `false` when it was not registered
    pub fn unregister(&self, id: HookId) -> bool {
        let mut classes = self.classes.write();
        for hooks in classes.values_mut() {
            if hooks.every_operation.remove(id) {
                return true;
            }
            if hooks.operations.values_mut().any(|b| b.remove(id)) {
                return true;
            }
            if hooks.bound.values_mut().any(|b| b.remove(id)) {
                return true;
            }
        }
        false
    }

    /// Drop every hook of a class, returning how many were removed
    pub fn clear_class(&self, class: &ManagerClass) -> usize {
        self.classes
            .write()
            .remove(class)
            .map_or(0, |hooks| hooks.len())
    }

    pub fn hook_count(&self, class: &ManagerClass) -> usize {
        self.classes.read().get(class).map_or(0, ClassHooks::len)
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().values().all(|hooks| hooks.len() == 0)
    }
}

/// Builder returned by [`HookRegistry::on`]
#[must_use = "a hook is only stored once `register` is called"]
pub struct HookRegistration<'r, O> {
    registry: &'r HookRegistry<O>,
    target: HookTarget,
    timing: Timing,
    priority: i32,
    condition: Option<HookCondition<O>>,
    failure_policy: Option<HookFailurePolicy>,
    name: Option<String>,
}

impl<'r, O> HookRegistration<'r, O> {
    /// Lower runs first
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Only run when `condition` holds for the call
    pub fn when<C>(mut self, condition: C) -> Self
    where
        C: Fn(&HookContext<'_, O>) -> bool + Send + Sync + 'static,
    {
        self.condition = Some(Arc::new(condition));
        self
    }

    pub fn failure_policy(mut self, policy: HookFailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    /// Name used in logs and in [`HookRegistry::describe`]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn register<F>(self, hook: F) -> HookId
    where
        F: Fn(&mut HookContext<'_, O>) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.registry.next_id();
        let name = self
            .name
            .unwrap_or_else(|| format!("{}@{}", id, self.target));
        self.registry.insert(HookEntry {
            id,
            name,
            target: self.target,
            timing: self.timing,
            priority: self.priority,
            condition: self.condition,
            failure_policy: self.failure_policy,
            callable: Arc::new(hook),
        })
    }
}
