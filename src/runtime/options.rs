//! # Thread Configuration
//!
//! [`ThreadOptions`] describes how the worker thread behind a [`Thread`](crate::runtime::Thread)
//! is created. It derives `serde` traits, so embedding applications can keep it in their own
//! configuration files; missing fields fall back to the defaults.
//!
//! ```rust
//! use actor_mailbox::runtime::{ThreadOptions, ThreadPriority};
//!
//! let options = ThreadOptions::named("tile-decoder")
//!     .with_priority(ThreadPriority::Normal)
//!     .with_stack_size(512 * 1024);
//! assert_eq!(options.name, "tile-decoder");
//! ```

use serde::{Deserialize, Serialize};

/// OS scheduling priority of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadPriority {
    /// Background work; the worker lowers its own priority where the platform allows it.
    #[default]
    Low,
    /// Leave the inherited priority untouched.
    Normal,
}

/// Worker thread settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadOptions {
    /// OS thread name, also used in log fields.
    pub name: String,
    pub priority: ThreadPriority,
    /// Stack size in bytes; `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl Default for ThreadOptions {
    fn default() -> Self {
        Self {
            name: "actor".to_string(),
            priority: ThreadPriority::default(),
            stack_size: None,
        }
    }
}

impl ThreadOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}
