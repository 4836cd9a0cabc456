//! taskmill - priority-based asynchronous task scheduler.
//!
//! Callers submit futures (or sync closures) tagged with one of five
//! priority levels; a pool of worker threads drains the most urgent pending
//! work first, FIFO within each level, with a bounded doubling backoff
//! between empty scans. Completion is observed through a per-task
//! [`CompletionHandle`].
//!
//! # Quick start
//!
//! ```no_run
//! use taskmill::Priority;
//!
//! let scheduler = taskmill::init().unwrap();
//!
//! let handle = scheduler
//!     .submit(Priority::High, async {
//!         // any async (or sync) work
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! assert!(handle.wait().is_ok());
//! taskmill::shutdown();
//! ```
//!
//! An explicitly owned instance works the same way without the global slot:
//!
//! ```no_run
//! use taskmill::{Config, Priority, Scheduler};
//!
//! let scheduler = Scheduler::new(Config::builder().num_workers(2).build()?)?;
//! scheduler.start()?;
//! scheduler.submit_fn(Priority::Normal, || Ok(()))?;
//! scheduler.stop();
//! # Ok::<(), taskmill::Error>(())
//! ```
//!
//! # Scheduling policy
//!
//! Strict priority dominance: every dequeue scans levels from `Critical`
//! down and takes the head of the first non-empty queue. A sustained stream
//! of high-priority work therefore starves lower levels indefinitely - an
//! accepted, documented tradeoff, not a bug. There is no execution timeout
//! and no preemption of running tasks; `cancel_all` discards pending work
//! only.

#![warn(missing_docs, missing_debug_implementations)]

mod backoff;
pub mod config;
pub mod error;
pub mod handle;
mod queue;
pub mod runtime;
pub mod scheduler;
pub mod task;
mod worker;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use handle::CompletionHandle;
pub use runtime::{global, init, init_with_config, obtain, shutdown};
pub use scheduler::{Scheduler, StatsSnapshot};
pub use task::{Priority, TaskError, TaskId, TaskResult};
