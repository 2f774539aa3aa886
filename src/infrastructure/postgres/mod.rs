mod history;
mod rows;
mod storage;
pub mod tx_manager;
mod views;

pub use storage::PostgresStorage;
pub use tx_manager::{AccessMode, IsolationLevel, TxManager};
