//! Clients for the services the gateway delegates to: the identity
//! provider, the blob store and outgoing mail.

pub mod blob;
pub mod identity;
pub mod mail;

pub use blob::{BlobError, BlobStore, CloudinaryBlobStore, MemoryBlobStore, UploadedFile};
pub use identity::{IdentityError, IdentityProvider, IdentityToolkitClient, NewAccount, SignIn};
pub use mail::{LogMailer, MailError, MailMessage, Mailer, SmtpMailer};
