//! Orchestration: retry scheduling, polling, run tracking, and the flows
//! built from them.

pub mod account;
pub mod poll;
pub mod profile;
pub mod resume;
pub mod retry;
pub mod run;
pub mod store;

pub use account::{AccountSync, AccountSyncReport, SyncFlow};
pub use poll::{poll_until_terminal, FailureReason, PollError, PollPolicy, PollStep, Polled};
pub use profile::ProfileSync;
pub use resume::{ParseReport, ResumeParsing};
pub use retry::{run_with_retry, Retried, RetryBound, RetryError, RetryObserver, RetryPolicy, Retryable};
pub use run::{Run, RunTracker};
pub use store::ProfileStore;
