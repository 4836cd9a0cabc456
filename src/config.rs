//! Scheduler configuration and its builder.

use crate::error::{Error, Result};
use std::time::Duration;

/// Scheduler configuration.
///
/// Obtained through [`Config::builder`] or [`Config::default`]; validated
/// before a [`crate::Scheduler`] is constructed from it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Worker thread count. `None` means one worker per available CPU.
    pub num_workers: Option<usize>,
    /// Delay applied after the first empty scan.
    pub idle_min_delay: Duration,
    /// Cap on the idle-backoff delay.
    pub idle_max_delay: Duration,
    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
    /// Stack size for worker threads, if overridden.
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_workers: None,
            idle_min_delay: Duration::from_millis(1),
            idle_max_delay: Duration::from_millis(250),
            thread_name_prefix: "taskmill-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
        }
    }
}

impl Config {
    /// Start building a configuration.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Check the configuration for internal consistency.
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.num_workers {
            if n == 0 {
                return Err(Error::config("num_workers must be > 0"));
            }
            if n > 1024 {
                return Err(Error::config("num_workers too large (max 1024)"));
            }
        }

        if self.idle_min_delay.is_zero() {
            return Err(Error::config("idle_min_delay must be > 0"));
        }
        if self.idle_min_delay > self.idle_max_delay {
            return Err(Error::config("idle_min_delay must be <= idle_max_delay"));
        }

        Ok(())
    }

    /// Effective worker count.
    pub fn worker_threads(&self) -> usize {
        self.num_workers.unwrap_or_else(num_cpus::get)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a builder seeded with the defaults.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set an explicit worker thread count.
    pub fn num_workers(mut self, n: usize) -> Self {
        self.config.num_workers = Some(n);
        self
    }

    /// Set the initial idle-backoff delay.
    pub fn idle_min_delay(mut self, delay: Duration) -> Self {
        self.config.idle_min_delay = delay;
        self
    }

    /// Set the idle-backoff cap.
    pub fn idle_max_delay(mut self, delay: Duration) -> Self {
        self.config.idle_max_delay = delay;
        self
    }

    /// Set the worker thread name prefix.
    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
