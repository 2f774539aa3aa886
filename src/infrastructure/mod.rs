//! Storage backends and event sinks behind the domain ports.

pub mod events;
pub mod in_memory;
#[cfg(feature = "storage-postgres")]
pub mod postgres;
