// Download queue: bounded-concurrency dispatcher shared by the HTTP API and the bot

pub mod dispatcher;
pub mod jobs;

pub use dispatcher::Dispatcher;
pub use jobs::{Completion, DispatchError, JobId, QueueStatus};
