//! Process-wide singleton accessor.
//!
//! The scheduler itself is an ordinary owned value; a composition root can
//! hold its own `Scheduler` and never touch this module. These helpers exist
//! for hosts and tooling that want exactly one shared instance per process,
//! with creation races resolved here rather than by every caller.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::scheduler::Scheduler;
use parking_lot::RwLock;
use std::sync::Arc;

static GLOBAL: RwLock<Option<Arc<Scheduler>>> = RwLock::new(None);

/// Construct, start, and install the global scheduler with defaults.
///
/// Fails with [`Error::AlreadyInitialized`] if one is live; use
/// [`obtain`] for redirect-to-existing semantics.
pub fn init() -> Result<Arc<Scheduler>> {
    init_with_config(Config::default())
}

/// Construct, start, and install the global scheduler with `config`.
pub fn init_with_config(config: Config) -> Result<Arc<Scheduler>> {
    let mut slot = GLOBAL.write();
    if slot.is_some() {
        return Err(Error::AlreadyInitialized);
    }

    let scheduler = Arc::new(Scheduler::new(config)?);
    scheduler.start()?;
    *slot = Some(scheduler.clone());
    Ok(scheduler)
}

/// Create-if-absent accessor for tooling.
///
/// Returns the live instance when one exists instead of erroring; the write
/// lock serializes check-and-create, so concurrent calls always converge on
/// a single instance.
pub fn obtain() -> Result<Arc<Scheduler>> {
    let mut slot = GLOBAL.write();
    if let Some(scheduler) = slot.as_ref() {
        return Ok(scheduler.clone());
    }

    let scheduler = Arc::new(Scheduler::new(Config::default())?);
    scheduler.start()?;
    *slot = Some(scheduler.clone());
    Ok(scheduler)
}

/// The live global instance, if any.
pub fn global() -> Option<Arc<Scheduler>> {
    GLOBAL.read().clone()
}

/// Stop and drop the global scheduler. Pending tasks are canceled; tasks
/// mid-execution finish first. No-op when never initialized; idempotent.
pub fn shutdown() {
    let scheduler = GLOBAL.write().take();
    if let Some(scheduler) = scheduler {
        scheduler.stop();
    }
}
