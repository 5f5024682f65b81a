//! Evaluation sweep: promote `created` matchings into the task queue.
//!
//! Ordering matters here. Each matching is first enqueued (deduplicated
//! against pending or running evaluation tasks), and only matchings that
//! are confirmed covered by a task are moved to `queued`. A matching is
//! never marked queued without a task backing it.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use talentflow_core::{
    MatchingQueued, MatchingRepository, MatchingStatus, Result, TaskRepository, TaskType,
};

pub struct EvaluationSweep {
    matchings: Arc<dyn MatchingRepository>,
    tasks: Arc<dyn TaskRepository>,
}

impl EvaluationSweep {
    pub fn new(matchings: Arc<dyn MatchingRepository>, tasks: Arc<dyn TaskRepository>) -> Self {
        Self { matchings, tasks }
    }

    /// Run one sweep. Returns the matchings promoted to `queued`.
    pub async fn run(&self) -> Result<Vec<MatchingQueued>> {
        let created = self.matchings.list_created().await?;
        if created.is_empty() {
            return Ok(Vec::new());
        }

        let priority = TaskType::MatchingEvaluation.default_priority();
        let mut covered: Vec<Uuid> = Vec::with_capacity(created.len());

        for matching_id in created {
            let queued = self
                .tasks
                .queue_deduplicated(
                    TaskType::MatchingEvaluation,
                    matching_id,
                    Some(json!({ "matching_id": matching_id })),
                    priority,
                )
                .await;

            match queued {
                // Some = task inserted, None = an active task already
                // covers this matching. Both mean the matching is backed.
                Ok(_) => covered.push(matching_id),
                Err(e) => {
                    warn!(
                        matching_id = %matching_id,
                        error = %e,
                        "Failed to enqueue evaluation task, leaving matching as created"
                    );
                }
            }
        }

        let promoted = self.matchings.mark_queued(&covered).await?;

        info!(
            subsystem = "jobs",
            component = "sweep",
            promoted = promoted.len(),
            "Evaluation sweep complete"
        );

        Ok(promoted
            .into_iter()
            .map(|id| MatchingQueued {
                id,
                status: MatchingStatus::Queued,
            })
            .collect())
    }
}
