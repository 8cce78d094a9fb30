//! Provider module - gateway contract and HTTP client

pub mod http_provider;
pub mod traits;

pub use http_provider::HttpProvider;
pub use traits::{
    ErrorBody, LogLine, OutputImage, ProgressSender, ProviderError, ProviderGateway,
    ProviderOutput, QueueUpdate, DEFAULT_FAILURE_MESSAGE, STATUS_IN_PROGRESS,
};
