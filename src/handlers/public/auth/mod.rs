// handlers/public/auth/mod.rs - Token acquisition and password recovery

pub mod login; // POST /auth/login, POST /auth/user/login
pub mod password; // POST /auth/password-reset, POST /auth/reset-password

pub use login::{admin_login, user_login};
pub use password::{password_reset, reset_password};
