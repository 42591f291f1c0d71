#![forbid(unsafe_code)]

pub mod kv;
pub mod lockout;
pub mod progress;

mod keys;

pub use kv::{InMemoryKv, KeyValueStore, StorageError};
pub use lockout::{LOCKOUT_DURATION_SECS, LockoutRegistry};
pub use progress::ProgressStore;
