//! BLL Managers
//!
//! CRUD managers that route every call through the hook pipeline of
//! `bll-hooks` and delegate storage to a `bll-resources` client.
//!
//! ```ignore
//! use bll_managers::{global_hooks, Manager};
//! use bll_hooks::{HookTarget, Operation, Timing};
//!
//! global_hooks()
//!     .on(HookTarget::method("UserManager", Operation::Create), Timing::Before)
//!     .register(|ctx| {
//!         ctx.set_kwarg("name", "Hook-Foo".into());
//!         Ok(())
//!     });
//!
//! let users = Manager::builder("UserManager").in_memory(schema).build()?;
//! ```

pub mod error;
pub mod hooks;
pub mod manager;
pub mod output;

pub use error::{BllError, Result};
pub use hooks::{global_hooks, ManagerHookContext, ManagerHooks};
pub use manager::{BatchDeleteRequest, BatchUpdateItem, BatchUpdateRequest, Manager, ManagerBuilder};
pub use output::CallOutput;
