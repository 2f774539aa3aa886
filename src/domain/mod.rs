//! Domain layer: parcels, their lifecycle, and the ports the engine is driven through.

pub mod clock;
pub mod event;
pub mod order;
pub mod packaging;
pub mod ports;
