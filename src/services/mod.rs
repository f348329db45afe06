pub mod accounts;
pub mod documents;
pub mod policy;
pub mod workflow;

pub use accounts::AccountService;
pub use documents::DocumentService;
pub use policy::WorkflowPolicy;
pub use workflow::WorkflowEngine;
