// handlers/protected/auth/mod.rs - Administrator account management

pub mod profile; // GET /auth/profile, GET /auth/admin
pub mod users; // /auth/users[/:id], POST /auth/add-user

pub use profile::{admin_check, profile};
pub use users::{add_user, delete_user, get_user, list_users, update_user};
