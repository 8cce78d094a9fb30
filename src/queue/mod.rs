//! Generation job queue

pub mod job;
pub mod job_queue;
pub mod payload;
pub mod session;

pub use job::{GenerationJob, JobStatus, CANCELLED_MESSAGE, NO_IMAGES_MESSAGE};
pub use job_queue::{CostEstimate, JobQueue, QueueConfig, QueueServices, SubmitRequest, Submission};
pub use session::{Session, SessionFactory, SessionRegistry};
