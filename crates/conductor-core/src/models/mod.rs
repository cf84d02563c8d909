pub mod error;
pub mod payload;
pub mod request;
pub mod task;

pub use error::{CoreError, CoreErrorKind, CoreResult};
pub use payload::{Payload, required_text, text_payload};
pub use request::WorkflowRequest;
pub use task::{OwnerId, TaskId, TaskRecord, TaskStatus};
