//! # Task Management System
//!
//! A small worker pool for executing tile builds across threads.
//!
//! ## Architecture Overview
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work executed on a worker thread
//! - `TaskResult`: The result of a completed task, which can spawn additional tasks
//! - `TaskChannel`: Communication channel between the coordinator and one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager hands tasks to idle workers round-robin, queueing the rest
//! 3. Workers process tasks and send back results
//! 4. Results are handled on the coordinating thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks (a tile spawns its children)
//! 6. `run_until_idle()` repeats this until no task is queued or in flight
//!
//! ## Worker Failure
//! A worker that panics drops its result channel. The coordinator notices the
//! disconnect, writes off the task that was in flight on it and stops
//! scheduling on that worker, so a crashed build never hangs the pipeline.

pub mod task;

use crate::pipeline::BuildReport;
use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use task::{Task, TaskResult};

/// Maximum number of tasks that can be in flight per worker channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

/// How long the coordinator sleeps when no result is ready.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A communication channel between the coordinator and a worker thread.
struct TaskChannel {
    task_sender: Option<Sender<Box<dyn Task + Send>>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    worker: Option<JoinHandle<()>>,
    alive: bool,
}

impl TaskChannel {
    fn accepts_tasks(&self) -> bool {
        self.alive && self.num_tasks_in_flight < MAX_TASKS_IN_FLIGHT
    }
}

/// Manages a pool of worker threads and coordinates task execution.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
}

impl TaskManager {
    /// Creates a new `TaskManager` with `num_workers` worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create; at least one is
    ///   always created
    ///
    /// # Returns
    /// The manager, or the I/O error raised when a worker thread cannot be spawned
    pub fn new(num_workers: usize) -> std::io::Result<Self> {
        let num_workers = num_workers.max(1);
        let mut channels = Vec::with_capacity(num_workers);

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let worker = thread::Builder::new()
                .name(format!("tile-worker-{}", index))
                .spawn(move || {
                    while let Ok(task) = task_rx.recv() {
                        let result = task.process();
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                })?;

            channels.push(TaskChannel {
                task_sender: Some(task_tx),
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                worker: Some(worker),
                alive: true,
            });
        }
        info!("Started {} tile workers", num_workers);

        Ok(TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Tasks currently executing on workers.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels.iter().map(|c| c.num_tasks_in_flight).sum()
    }

    pub fn queued_task_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// True when nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }

    /// Sends a task to a specific worker, returning it on failure.
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        let channel = &mut self.channels[channel_idx];
        let Some(sender) = channel.task_sender.as_ref() else {
            channel.alive = false;
            return Err(task);
        };
        match sender.send(task) {
            Ok(()) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(failed) => {
                channel.alive = false;
                Err(failed.0)
            }
        }
    }

    /// Finds a worker that can accept a task, round-robin from the last used one.
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|offset| (self.current_channel + offset) % count)
            .find(|&idx| self.channels[idx].accepts_tasks())
    }

    /// Publishes a task for execution.
    ///
    /// # Returns
    /// - `true` if the task was handed to a worker immediately
    /// - `false` if it was queued because all workers are busy
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        let Some(channel_idx) = self.find_available_channel() else {
            self.queued_tasks.push_back(task);
            return false;
        };
        match self.try_send_task(task, channel_idx) {
            Ok(()) => {
                self.current_channel = (channel_idx + 1) % self.channels.len();
                true
            }
            Err(task) => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Hands queued tasks to idle workers, oldest first.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                return;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(()) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => self.queued_tasks.push_front(task),
            }
        }
    }

    /// Handles all results that workers have sent back so far.
    ///
    /// # Arguments
    /// * `report` - Build report the results are recorded in
    ///
    /// # Returns
    /// The number of results handled
    pub fn process_completed_tasks(&mut self, report: &mut BuildReport) -> usize {
        let mut tasks_to_queue = Vec::new();
        let mut handled = 0;
        for (index, channel) in self.channels.iter_mut().enumerate() {
            loop {
                match channel.result_receiver.try_recv() {
                    Ok(result) => {
                        channel.num_tasks_in_flight -= 1;
                        handled += 1;
                        tasks_to_queue.extend(result.handle_result(report));
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        if channel.alive {
                            error!("Tile worker {} stopped unexpectedly", index);
                        }
                        if channel.num_tasks_in_flight > 0 {
                            warn!(
                                "Writing off {} task(s) lost with worker {}",
                                channel.num_tasks_in_flight, index
                            );
                            report.record_lost_tasks(channel.num_tasks_in_flight);
                            channel.num_tasks_in_flight = 0;
                        }
                        channel.alive = false;
                        break;
                    }
                }
            }
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
        handled
    }

    /// Drives the pool until every task, including the ones spawned by
    /// results, has been handled.
    ///
    /// Returns early, leaving tasks queued, if every worker has died.
    pub fn run_until_idle(&mut self, report: &mut BuildReport) {
        loop {
            let handled = self.process_completed_tasks(report);
            self.process_queued_tasks();
            if self.is_idle() {
                return;
            }
            if self.channels.iter().all(|c| !c.alive) {
                error!(
                    "All tile workers stopped; {} task(s) left unprocessed",
                    self.queued_tasks.len()
                );
                return;
            }
            if handled == 0 {
                thread::sleep(POLL_INTERVAL);
            }
        }
    }

    /// Stops the workers and waits for them to exit.
    pub fn shutdown(mut self) {
        for channel in &mut self.channels {
            channel.task_sender.take();
        }
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if let Some(worker) = channel.worker.take() {
                if worker.join().is_err() {
                    warn!("Tile worker {} panicked", index);
                }
            }
        }
        debug!("Task manager shut down");
    }
}
