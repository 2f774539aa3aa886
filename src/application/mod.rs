//! Application layer: the pickup point's use cases and the machinery that runs them.
//!
//! [`service::OrderService`] enforces the order lifecycle on top of an injected storage backend,
//! [`dispatcher::WorkerPool`] runs commands concurrently, and [`context::AppContext`] ties the two
//! together for one session.

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod service;
