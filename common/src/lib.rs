pub mod classify;
pub mod event;
pub mod job;
pub mod view;

pub use classify::{classify, Classification};
pub use event::{states, StatusEvent, Terminal};
pub use job::{DeleteResponse, JobId, JobMetadata, LifecycleOutcome, NewTaskResponse, TaskSummary};
pub use view::{EventCategory, ProgressDetails, StatusView};
