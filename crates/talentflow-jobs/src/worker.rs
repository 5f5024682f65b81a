//! Task worker and runner for processing background tasks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use talentflow_core::{Result, TaskRepository, TaskType};
use talentflow_db::Database;

use crate::handler::{TaskContext, TaskHandler, TaskResult};
use crate::DEFAULT_POLL_INTERVAL_MS;

/// Configuration for the task worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of concurrent tasks.
    pub max_concurrent_tasks: usize,
    /// Whether to enable task processing.
    pub enabled: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_concurrent_tasks: talentflow_core::defaults::TASK_MAX_CONCURRENT,
            enabled: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `TASK_WORKER_ENABLED` | `true` | Enable/disable task processing |
    /// | `TASK_MAX_CONCURRENT` | `4` | Max concurrent tasks |
    /// | `TASK_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    pub fn from_env() -> Self {
        let enabled = std::env::var("TASK_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let max_concurrent_tasks = std::env::var("TASK_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(talentflow_core::defaults::TASK_MAX_CONCURRENT)
            .max(1);

        let poll_interval_ms = std::env::var("TASK_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            max_concurrent_tasks,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Set maximum concurrent tasks.
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Enable or disable task processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the task worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A task was started.
    TaskStarted { task_id: Uuid, task_type: TaskType },
    /// Task progress was updated.
    TaskProgress {
        task_id: Uuid,
        percent: i32,
        message: Option<String>,
    },
    /// A task completed successfully.
    TaskCompleted { task_id: Uuid, task_type: TaskType },
    /// A task failed.
    TaskFailed {
        task_id: Uuid,
        task_type: TaskType,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx.send(()).await.map_err(|_| {
            talentflow_core::Error::Internal("Failed to send shutdown signal".into())
        })?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Task worker that processes tasks from the queue.
pub struct TaskWorker {
    db: Database,
    config: WorkerConfig,
    handlers: Arc<RwLock<HashMap<TaskType, Arc<dyn TaskHandler>>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl TaskWorker {
    /// Create a new task worker.
    pub fn new(db: Database, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(talentflow_core::defaults::EVENT_BUS_CAPACITY);
        Self {
            db,
            config,
            handlers: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
        }
    }

    /// Register a handler for a task type.
    pub async fn register_handler<H: TaskHandler + 'static>(&self, handler: H) {
        let task_type = handler.task_type();
        let mut handlers = self.handlers.write().await;
        handlers.insert(task_type, Arc::new(handler));
        debug!(?task_type, "Registered task handler");
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let worker = Arc::new(self);
        let worker_clone = worker.clone();

        tokio::spawn(async move {
            worker_clone.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the worker loop with concurrent task processing.
    ///
    /// Claims up to `max_concurrent_tasks` at a time and processes them
    /// concurrently. Sleeps only when the queue is empty, and wakes early
    /// when the repository signals a new enqueue.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Task worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            max_concurrent = self.config.max_concurrent_tasks,
            "Task worker started"
        );

        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let max_concurrent = self.config.max_concurrent_tasks;
        let wake = self.db.tasks.task_notify();

        loop {
            // Check for shutdown before claiming tasks
            if shutdown_rx.try_recv().is_ok() {
                info!("Task worker received shutdown signal");
                break;
            }

            // Claim up to max_concurrent tasks
            let mut claimed = 0;
            let mut tasks = tokio::task::JoinSet::new();

            for _ in 0..max_concurrent {
                match self.claim_task().await {
                    Some(task) => {
                        claimed += 1;
                        let worker = self.clone_refs();
                        tasks.spawn(async move {
                            worker.execute_task(task).await;
                        });
                    }
                    None => break,
                }
            }

            if claimed == 0 {
                // Queue empty. Sleep, but wake early on enqueue.
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Task worker received shutdown signal");
                        break;
                    }
                    _ = wake.notified() => {}
                    _ = sleep(poll_interval) => {}
                }
            } else {
                debug!(claimed, "Processing concurrent task batch");
                // Wait for all claimed tasks to complete
                while let Some(result) = tasks.join_next().await {
                    if let Err(e) = result {
                        error!(error = ?e, "Task panicked");
                    }
                }
                // No sleep, immediately try to claim more tasks
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Task worker stopped");
    }

    /// Claim the next available task without processing it.
    async fn claim_task(&self) -> Option<talentflow_core::Task> {
        let task_types: Vec<TaskType> = {
            let handlers = self.handlers.read().await;
            handlers.keys().copied().collect()
        };

        match self.db.tasks.claim_next(&task_types).await {
            Ok(Some(task)) => Some(task),
            Ok(None) => None,
            Err(e) => {
                error!(error = ?e, "Failed to claim task");
                None
            }
        }
    }

    /// Clone references needed for spawned task executions.
    fn clone_refs(&self) -> TaskWorkerRef {
        TaskWorkerRef {
            db: self.db.clone(),
            handlers: self.handlers.clone(),
            event_tx: self.event_tx.clone(),
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Get the pending task count.
    pub async fn pending_count(&self) -> Result<i64> {
        self.db.tasks.pending_count().await
    }
}

/// Lightweight reference bundle for executing a single task in a spawned
/// tokio task.
struct TaskWorkerRef {
    db: Database,
    handlers: Arc<RwLock<HashMap<TaskType, Arc<dyn TaskHandler>>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl TaskWorkerRef {
    /// Execute a single claimed task.
    async fn execute_task(self, task: talentflow_core::Task) {
        let start = Instant::now();
        let task_id = task.id;
        let task_type = task.task_type;

        info!(?task_id, ?task_type, "Processing task");

        let _ = self
            .event_tx
            .send(WorkerEvent::TaskStarted { task_id, task_type });

        // Find a handler for this task type
        let handler = {
            let handlers = self.handlers.read().await;
            handlers.get(&task_type).cloned()
        };

        let result = match handler {
            Some(handler) => {
                let event_tx = self.event_tx.clone();
                let progress_db = self.db.clone();
                let ctx =
                    TaskContext::new(task).with_progress_callback(move |percent, message| {
                        let message = message.map(String::from);
                        let _ = event_tx.send(WorkerEvent::TaskProgress {
                            task_id,
                            percent,
                            message: message.clone(),
                        });
                        // Persist off the handler's path; progress is
                        // advisory and must not block task execution.
                        let db = progress_db.clone();
                        tokio::spawn(async move {
                            if let Err(e) = db
                                .tasks
                                .update_progress(task_id, percent, message.as_deref())
                                .await
                            {
                                debug!(error = ?e, ?task_id, "Failed to persist task progress");
                            }
                        });
                    });

                let task_timeout =
                    Duration::from_secs(talentflow_core::defaults::TASK_TIMEOUT_SECS);
                match tokio::time::timeout(task_timeout, handler.execute(ctx)).await {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            ?task_id,
                            ?task_type,
                            "Task exceeded timeout of {}s",
                            talentflow_core::defaults::TASK_TIMEOUT_SECS
                        );
                        TaskResult::Failed(format!(
                            "Task exceeded timeout of {}s",
                            talentflow_core::defaults::TASK_TIMEOUT_SECS
                        ))
                    }
                }
            }
            None => {
                warn!(?task_type, "No handler registered for task type");
                TaskResult::Failed(format!("No handler for task type: {:?}", task_type))
            }
        };

        match result {
            TaskResult::Success(result_data) => {
                if let Err(e) = self.db.tasks.complete(task_id, result_data).await {
                    error!(error = ?e, ?task_id, "Failed to mark task as completed");
                } else {
                    info!(
                        ?task_id,
                        ?task_type,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Task completed successfully"
                    );
                    let _ = self
                        .event_tx
                        .send(WorkerEvent::TaskCompleted { task_id, task_type });
                }
            }
            TaskResult::Failed(error) | TaskResult::Retry(error) => {
                if let Err(e) = self.db.tasks.fail(task_id, &error).await {
                    error!(error = ?e, ?task_id, "Failed to mark task as failed");
                } else {
                    warn!(
                        ?task_id,
                        ?task_type,
                        %error,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Task failed"
                    );
                    let _ = self.event_tx.send(WorkerEvent::TaskFailed {
                        task_id,
                        task_type,
                        error,
                    });
                }
            }
        }
    }
}

/// Builder for creating a task worker with handlers.
pub struct WorkerBuilder {
    db: Database,
    config: WorkerConfig,
    handlers: Vec<Box<dyn TaskHandler>>,
}

impl WorkerBuilder {
    /// Create a new worker builder.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            config: WorkerConfig::default(),
            handlers: Vec::new(),
        }
    }

    /// Set the worker configuration.
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a handler.
    pub fn with_handler<H: TaskHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    /// Build and return the worker.
    pub async fn build(self) -> TaskWorker {
        let worker = TaskWorker::new(self.db, self.config);

        for handler in self.handlers {
            let task_type = handler.task_type();
            let mut handlers = worker.handlers.write().await;
            handlers.insert(task_type, Arc::from(handler));
        }

        worker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use talentflow_core::{Task, TaskStatus};
    use talentflow_db::test_fixtures::lazy_test_pool;

    fn pending_task(task_type: TaskType) -> Task {
        Task {
            id: Uuid::new_v4(),
            matching_id: None,
            task_type,
            status: TaskStatus::Pending,
            priority: 5,
            payload: None,
            result: None,
            error_message: None,
            progress_percent: 0,
            progress_message: None,
            retry_count: 0,
            max_retries: 3,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    struct ReportingHandler;

    #[async_trait::async_trait]
    impl TaskHandler for ReportingHandler {
        fn task_type(&self) -> TaskType {
            TaskType::CandidateExtraction
        }

        async fn execute(&self, ctx: TaskContext) -> TaskResult {
            ctx.report_progress(42, Some("working"));
            TaskResult::Success(None)
        }
    }

    #[tokio::test]
    async fn test_execute_task_reports_progress_events() {
        let worker = TaskWorker::new(Database::new(lazy_test_pool()), WorkerConfig::default());
        worker.register_handler(ReportingHandler).await;
        let mut events = worker.events();

        worker
            .clone_refs()
            .execute_task(pending_task(TaskType::CandidateExtraction))
            .await;

        let mut saw_progress = false;
        while let Ok(event) = events.try_recv() {
            if let WorkerEvent::TaskProgress { percent, message, .. } = event {
                assert_eq!(percent, 42);
                assert_eq!(message.as_deref(), Some("working"));
                saw_progress = true;
            }
        }
        assert!(saw_progress, "handler progress should reach subscribers");
    }

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(config.max_concurrent_tasks, 4);
        assert!(config.enabled);
    }

    #[test]
    fn test_worker_config_builder() {
        let config = WorkerConfig::default()
            .with_poll_interval(1000)
            .with_max_concurrent(8)
            .with_enabled(false);

        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.max_concurrent_tasks, 8);
        assert!(!config.enabled);
    }

    #[test]
    fn test_worker_config_chaining_order_independence() {
        let config1 = WorkerConfig::default()
            .with_enabled(false)
            .with_max_concurrent(10)
            .with_poll_interval(3000);

        let config2 = WorkerConfig::default()
            .with_poll_interval(3000)
            .with_enabled(false)
            .with_max_concurrent(10);

        assert_eq!(config1.poll_interval_ms, config2.poll_interval_ms);
        assert_eq!(config1.max_concurrent_tasks, config2.max_concurrent_tasks);
        assert_eq!(config1.enabled, config2.enabled);
    }

    #[test]
    fn test_worker_event_task_progress() {
        let task_id = Uuid::new_v4();
        let event = WorkerEvent::TaskProgress {
            task_id,
            percent: 50,
            message: Some("halfway".to_string()),
        };

        match event {
            WorkerEvent::TaskProgress {
                task_id: id,
                percent,
                message,
            } => {
                assert_eq!(id, task_id);
                assert_eq!(percent, 50);
                assert_eq!(message, Some("halfway".to_string()));
            }
            _ => panic!("Wrong event variant"),
        }
    }

    #[test]
    fn test_worker_event_task_failed() {
        let task_id = Uuid::new_v4();
        let event = WorkerEvent::TaskFailed {
            task_id,
            task_type: TaskType::MatchingEvaluation,
            error: "test error".to_string(),
        };

        match event {
            WorkerEvent::TaskFailed {
                task_id: id,
                task_type,
                error,
            } => {
                assert_eq!(id, task_id);
                assert_eq!(task_type, TaskType::MatchingEvaluation);
                assert_eq!(error, "test error");
            }
            _ => panic!("Wrong event variant"),
        }
    }

    #[test]
    fn test_worker_event_lifecycle_variants() {
        assert!(matches!(WorkerEvent::WorkerStarted, WorkerEvent::WorkerStarted));
        assert!(matches!(WorkerEvent::WorkerStopped, WorkerEvent::WorkerStopped));
    }

    #[test]
    fn test_worker_event_clone() {
        let task_id = Uuid::new_v4();
        let event1 = WorkerEvent::TaskStarted {
            task_id,
            task_type: TaskType::CandidateExtraction,
        };

        let event2 = event1.clone();

        match (event1, event2) {
            (
                WorkerEvent::TaskStarted {
                    task_id: id1,
                    task_type: tt1,
                },
                WorkerEvent::TaskStarted {
                    task_id: id2,
                    task_type: tt2,
                },
            ) => {
                assert_eq!(id1, id2);
                assert_eq!(tt1, tt2);
            }
            _ => panic!("Clone failed"),
        }
    }
}
