//! Task handlers for each task type.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use talentflow_core::{Task, TaskType};

/// Progress callback type for task handlers.
pub type ProgressCallback = Box<dyn Fn(i32, Option<&str>) + Send + Sync>;

/// Context provided to task handlers.
pub struct TaskContext {
    /// The task being processed.
    pub task: Task,
    /// Progress callback for updating task progress.
    progress_callback: Option<ProgressCallback>,
}

impl TaskContext {
    /// Create a new task context.
    pub fn new(task: Task) -> Self {
        Self {
            task,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(i32, Option<&str>) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Report progress to the callback.
    pub fn report_progress(&self, percent: i32, message: Option<&str>) {
        if let Some(ref callback) = self.progress_callback {
            callback(percent, message);
        }
    }

    /// Get the matching ID for this task, if any.
    pub fn matching_id(&self) -> Option<Uuid> {
        self.task.matching_id
    }

    /// Get the task payload.
    pub fn payload(&self) -> Option<&JsonValue> {
        self.task.payload.as_ref()
    }
}

/// Result of task execution.
#[derive(Debug)]
pub enum TaskResult {
    /// Task completed successfully with optional result data.
    Success(Option<JsonValue>),
    /// Task failed with an error message.
    Failed(String),
    /// Task should be retried.
    Retry(String),
}

/// Trait for task handlers.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// The task type this handler processes.
    fn task_type(&self) -> TaskType;

    /// Execute the task.
    async fn execute(&self, ctx: TaskContext) -> TaskResult;

    /// Check if this handler can process the given task type.
    fn can_handle(&self, task_type: TaskType) -> bool {
        self.task_type() == task_type
    }
}

/// No-op handler for testing.
pub struct NoOpHandler {
    task_type: TaskType,
}

impl NoOpHandler {
    /// Create a new no-op handler for the given task type.
    pub fn new(task_type: TaskType) -> Self {
        Self { task_type }
    }
}

#[async_trait]
impl TaskHandler for NoOpHandler {
    fn task_type(&self) -> TaskType {
        self.task_type
    }

    async fn execute(&self, ctx: TaskContext) -> TaskResult {
        ctx.report_progress(50, Some("Processing..."));
        ctx.report_progress(100, Some("Done"));
        TaskResult::Success(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use talentflow_core::TaskStatus;

    fn task(task_type: TaskType, matching_id: Option<Uuid>) -> Task {
        Task {
            id: Uuid::new_v4(),
            matching_id,
            task_type,
            status: TaskStatus::Pending,
            priority: 0,
            payload: None,
            result: None,
            error_message: None,
            progress_percent: 0,
            progress_message: None,
            retry_count: 0,
            max_retries: 3,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn test_context_matching_id() {
        let matching_id = Uuid::new_v4();
        let ctx = TaskContext::new(task(TaskType::MatchingEvaluation, Some(matching_id)));
        assert_eq!(ctx.matching_id(), Some(matching_id));

        let ctx = TaskContext::new(task(TaskType::CandidateExtraction, None));
        assert!(ctx.matching_id().is_none());
    }

    #[test]
    fn test_context_payload() {
        let mut t = task(TaskType::CandidateExtraction, None);
        t.payload = Some(serde_json::json!({"cv_path": "docs/ab/cd/x.pdf"}));

        let ctx = TaskContext::new(t);
        assert_eq!(
            ctx.payload().unwrap()["cv_path"],
            serde_json::json!("docs/ab/cd/x.pdf")
        );
    }

    #[test]
    fn test_progress_callback_invoked() {
        let seen: Arc<Mutex<Vec<(i32, Option<String>)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let ctx = TaskContext::new(task(TaskType::CandidateExtraction, None))
            .with_progress_callback(move |percent, message| {
                sink.lock()
                    .unwrap()
                    .push((percent, message.map(String::from)));
            });

        ctx.report_progress(25, Some("quarter"));
        ctx.report_progress(100, None);

        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], (25, Some("quarter".to_string())));
        assert_eq!(calls[1], (100, None));
    }

    #[tokio::test]
    async fn test_noop_handler() {
        let handler = NoOpHandler::new(TaskType::CandidateExtraction);
        assert_eq!(handler.task_type(), TaskType::CandidateExtraction);
        assert!(handler.can_handle(TaskType::CandidateExtraction));
        assert!(!handler.can_handle(TaskType::MatchingEvaluation));

        let ctx = TaskContext::new(task(TaskType::CandidateExtraction, None));
        let result = handler.execute(ctx).await;
        assert!(matches!(result, TaskResult::Success(_)));
    }
}
