// handlers/protected/documents/mod.rs - Document request workflow endpoints

pub mod requests; // /documents/requests[/:id], /documents/my-requests
pub mod upload; // POST /documents/upload

pub use requests::{create_request, get_request, list_requests, my_requests, update_status};
pub use upload::upload;
