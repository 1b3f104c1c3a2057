//! Placement v1 clients.

pub mod client;
pub mod mock;

pub use client::{PlacementClient, DEFAULT_PLACEMENT_MICROVERSION};
pub use mock::MockPlacementService;
