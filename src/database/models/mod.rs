pub mod notification;
pub mod profile;
pub mod request;

pub use notification::{NewNotification, Notification};
pub use profile::{Profile, ProfileFields};
pub use request::{DocumentRequest, NewDocumentRequest};
