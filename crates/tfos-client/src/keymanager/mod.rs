//! Key Manager v1 (secret ACL) clients.

pub mod client;
pub mod mock;

pub use client::KeyManagerClient;
pub use mock::MockKeyManagerService;
