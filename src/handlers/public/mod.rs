// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service metadata, health, and token acquisition through the identity
// provider.

pub mod auth;
pub mod status;

pub use status::{health, root};
