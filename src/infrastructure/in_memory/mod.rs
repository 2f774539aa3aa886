//! In-process backend: three stores behind one lock, persisted as a JSON snapshot.

pub mod arena;
pub mod history;
pub mod refunds;
pub mod storage;
pub mod users;

pub use storage::{JsonStorage, Snapshot};
