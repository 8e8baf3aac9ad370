//! # Task System Core Traits
//!
//! ## Core Components
//! - `Task`: A unit of work executed on a worker thread
//! - `TaskResult`: The outcome of a task, handled on the coordinating thread
//!
//! ## Task Lifecycle
//! 1. A `Task` is scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method runs on a worker thread
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` runs on the coordinating thread, records
//!    itself in the build report and may return follow-up tasks

use crate::pipeline::BuildReport;

/// A unit of work that can be executed on a worker thread.
///
/// Tasks own everything they need (typically `Arc` handles to shared, read-only
/// state) so they can be moved across threads.
pub trait Task: Send {
    /// Performs the work and returns its result.
    ///
    /// Errors are not propagated out of this method; they are carried inside
    /// the returned result and reported by `handle_result`.
    fn process(&self) -> Box<dyn TaskResult + Send>;
}

/// The result of processing a `Task`.
pub trait TaskResult: Send {
    /// Handles the result on the coordinating thread.
    ///
    /// # Arguments
    /// * `report` - Build report to record the outcome in
    ///
    /// # Returns
    /// New tasks to schedule (can be empty)
    fn handle_result(self: Box<Self>, report: &mut BuildReport) -> Vec<Box<dyn Task + Send>>;
}
