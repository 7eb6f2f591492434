pub mod discovery;
pub mod error;
pub mod fetch;
pub mod mapping;
pub mod orchestrator;
pub mod progress;

pub use error::EngineError;
pub use orchestrator::{Orchestrator, RunSyncAllHandle, RunSyncOutcome};
pub use progress::{progress_channel, ProgressEmitter, ProgressReceiver, ProgressSender, SyncStatusBoard};
