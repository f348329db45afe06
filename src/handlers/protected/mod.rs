// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here sits behind `require_bearer`, which inserts the verified
// `AuthUser`. Missing or invalid tokens never reach these handlers.

pub mod auth; // Profile and administrator user management
pub mod documents; // Document requests and uploads
pub mod notifications; // Caller's notification feed
