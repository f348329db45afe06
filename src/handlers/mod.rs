// handlers/mod.rs - two security tiers
//
// Public (no auth) -> Protected (bearer token verified by `require_bearer`).
// Role checks happen inside each protected handler or the service it calls.

pub mod protected;
pub mod public;
