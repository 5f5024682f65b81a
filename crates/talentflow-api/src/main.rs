//! talentflow-api - HTTP API server for the talentflow matching pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use talentflow_core::{
    defaults, new_v7, Candidate, CandidateDetails, CandidateRepository, CreateJobPosting,
    DocumentStore,
    EmbeddingBackend, EvaluationView, GenerationBackend, InferenceBackend, JobPosting,
    JobPostingRepository, Matching, MatchingQueued, MatchingRepository, MatchingResult,
    MatchingStatus, QueueStats, Task, TaskRepository, TaskType,
};
use talentflow_db::{
    Database, FilesystemStore, JobPostingIndexer, PgCandidateRepository, PgChunkRepository,
    PgJobPostingRepository, PgMatchingRepository, PgRubricRepository, PgTaskRepository,
};
use talentflow_inference::{CandidateExtractor, OllamaBackend};
use talentflow_jobs::{
    EvaluationHandler, EvaluationSweep, ExtractionHandler, WorkerBuilder, WorkerConfig,
};
use talentflow_scoring::ScoringFlow;
use talentflow_search::{JobSearchEngine, RubricRetriever};

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
///
/// UUIDv7 embeds a Unix timestamp, so IDs sort chronologically — useful for
/// log correlation and tracing a candidate upload through the pipeline.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    db: Database,
    /// Content-addressed storage for uploaded candidate documents.
    documents: Arc<dyn DocumentStore>,
    /// Chunks and embeds job postings at the seeding boundary.
    indexer: Arc<JobPostingIndexer>,
    /// Promotes `created` matchings into the evaluation queue.
    sweep: Arc<EvaluationSweep>,
}

/// OpenAPI documentation served through Swagger UI at `/docs`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Talentflow API",
        description = "Asynchronous candidate-to-job matching and scoring pipeline"
    ),
    components(schemas(
        Candidate,
        JobPosting,
        Matching,
        MatchingStatus,
        MatchingResult,
        EvaluationView,
        MatchingQueued
    )),
    tags(
        (name = "Candidates", description = "Candidate document upload and lookup"),
        (name = "Job Postings", description = "Job posting seeding and indexing"),
        (name = "Matchings", description = "Matching lifecycle and evaluation results"),
        (name = "Tasks", description = "Background task queue"),
        (name = "System", description = "Health checks")
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT - "json" or "text" (default: "text")
    //   RUST_LOG   - standard env filter (default: "talentflow_api=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "talentflow_api=debug,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/talentflow".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("TALENTFLOW_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);
    let upload_dir = std::env::var("TALENTFLOW_UPLOAD_DIR")
        .unwrap_or_else(|_| defaults::UPLOAD_DIR.to_string());

    // Connect to database and run pending migrations
    info!("Connecting to database...");
    let db = Database::connect(&database_url).await?;
    info!("Database connected");
    db.migrate().await?;
    info!("Database migrations complete");

    // Initialize document storage; a full write/read/delete round-trip
    // catches permission problems before the first upload does.
    let store = FilesystemStore::new(&upload_dir);
    store
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("document storage validation failed: {}", e))?;
    let documents: Arc<dyn DocumentStore> = Arc::new(store);
    info!("Document storage initialized at {}", upload_dir);

    // Verify inference backend is reachable. The worker keeps running
    // either way; tasks fail individually while Ollama is down.
    {
        let backend = OllamaBackend::from_env();
        match backend.health_check().await {
            Ok(()) => info!(
                embed_model = EmbeddingBackend::embed_model(&backend),
                gen_model = GenerationBackend::gen_model(&backend),
                "Inference backend reachable"
            ),
            Err(e) => warn!(error = %e, "Inference backend not reachable at startup"),
        }
    }

    let pool = db.pool().clone();

    // Create and start the task worker
    let worker_config = WorkerConfig::from_env();
    let _worker_handle = if worker_config.enabled {
        info!("Starting task worker...");
        let backend = Arc::new(OllamaBackend::from_env());

        let extraction = ExtractionHandler::new(
            Arc::new(PgCandidateRepository::new(pool.clone())),
            Arc::new(PgMatchingRepository::new(pool.clone())),
            documents.clone(),
            CandidateExtractor::new(backend.clone()),
            JobSearchEngine::new(
                Arc::new(PgChunkRepository::new(pool.clone())),
                Arc::new(PgJobPostingRepository::new(pool.clone())),
                backend.clone(),
                backend.clone(),
            ),
        );
        let evaluation = EvaluationHandler::new(
            Arc::new(PgMatchingRepository::new(pool.clone())),
            Arc::new(PgCandidateRepository::new(pool.clone())),
            Arc::new(PgJobPostingRepository::new(pool.clone())),
            RubricRetriever::new(Arc::new(PgRubricRepository::new(pool.clone()))),
            ScoringFlow::new(backend.clone()),
        );

        let worker = WorkerBuilder::new(db.clone())
            .with_config(worker_config)
            .with_handler(extraction)
            .with_handler(evaluation)
            .build()
            .await;

        let handle = worker.start();
        info!("Task worker started");
        Some(handle)
    } else {
        info!("Task worker disabled");
        None
    };

    // Periodic queue hygiene: drop terminal tasks older than a day
    let cleanup_db = db.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match cleanup_db.tasks.cleanup(24).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Cleaned up old terminal tasks"),
                Err(e) => warn!(error = %e, "Task cleanup failed"),
            }
        }
    });

    // Create app state
    let state = AppState {
        db,
        documents,
        indexer: Arc::new(JobPostingIndexer::new(
            Arc::new(PgChunkRepository::new(pool.clone())),
            Arc::new(OllamaBackend::from_env()),
        )),
        sweep: Arc::new(EvaluationSweep::new(
            Arc::new(PgMatchingRepository::new(pool.clone())),
            Arc::new(PgTaskRepository::new(pool)),
        )),
    };

    let app = api_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the full application router with middleware.
fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // OpenAPI / Swagger UI
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Candidates
        .route("/api/v1/candidates", post(upload_candidate))
        .route(
            "/api/v1/candidates/:id",
            get(get_candidate).delete(delete_candidate),
        )
        // Job postings
        .route(
            "/api/v1/job-postings",
            get(list_job_postings).post(create_job_posting),
        )
        .route("/api/v1/job-postings/:id", get(get_job_posting))
        // Matchings
        .route("/api/v1/matchings/sweep", post(run_sweep))
        .route("/api/v1/evaluations/:id", get(get_evaluation))
        // Tasks
        .route("/api/v1/tasks/pending", get(pending_tasks_count))
        .route("/api/v1/tasks/stats", get(task_queue_stats))
        .route("/api/v1/tasks/:id", get(get_task))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT]),
        )
        .layer(RequestBodyLimitLayer::new(defaults::MAX_UPLOAD_BYTES))
        .with_state(state)
}

// =============================================================================
// SYSTEM
// =============================================================================

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// =============================================================================
// CANDIDATES
// =============================================================================

/// Upload a CV and project report pair, queueing the extraction pipeline.
///
/// Expects a multipart form with two file fields, `cv` and `project_report`.
/// Both documents are stored content-addressed, then a candidate extraction
/// task is queued. Extraction, job search, and matching creation all happen
/// in the background; the response only acknowledges the upload.
///
/// # Returns
/// - 202 Accepted with `{ "task_id": "<uuid>", "candidate_id": "<uuid>" }`
/// - 400 Bad Request if a field is missing or empty
async fn upload_candidate(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut cv: Option<(String, Vec<u8>)> = None;
    let mut report: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().unwrap_or("upload.txt").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {}", e)))?
            .to_vec();
        match name.as_str() {
            "cv" => cv = Some((file_name, bytes)),
            "project_report" => report = Some((file_name, bytes)),
            _ => {}
        }
    }

    let (cv_name, cv_bytes) =
        cv.ok_or_else(|| ApiError::BadRequest("Missing 'cv' file field".to_string()))?;
    let (report_name, report_bytes) = report
        .ok_or_else(|| ApiError::BadRequest("Missing 'project_report' file field".to_string()))?;

    if cv_bytes.is_empty() || report_bytes.is_empty() {
        return Err(ApiError::BadRequest(
            "Uploaded documents must not be empty".to_string(),
        ));
    }

    let cv_path = state.documents.store(&cv_name, &cv_bytes).await?;
    let report_path = state.documents.store(&report_name, &report_bytes).await?;

    // The candidate id is assigned here and rides in the payload, so a
    // retried extraction task persists into the same row.
    let candidate_id = new_v7();
    let task_id = state
        .db
        .tasks
        .queue(
            TaskType::CandidateExtraction,
            None,
            Some(serde_json::json!({
                "candidate_id": candidate_id,
                "cv_path": cv_path,
                "project_report_path": report_path,
            })),
            TaskType::CandidateExtraction.default_priority(),
        )
        .await?;

    info!(
        task_id = %task_id,
        candidate_id = %candidate_id,
        cv_path = %cv_path,
        report_path = %report_path,
        "Candidate upload accepted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "task_id": task_id, "candidate_id": candidate_id })),
    ))
}

/// Fetch a candidate with its experiences and projects.
async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CandidateDetails>, ApiError> {
    let details = state.db.candidates.fetch(id).await?;
    Ok(Json(details))
}

/// Soft-delete a candidate. Historical matchings stay resolvable.
async fn delete_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.db.candidates.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// JOB POSTINGS
// =============================================================================

/// Create a job posting and index it into the vector store.
///
/// Indexing is synchronous: the posting is chunked, embedded, and stored
/// before the response returns, so it is immediately searchable.
///
/// # Returns
/// - 201 Created with `{ "id": "<uuid>", "chunk_count": n }`
/// - 400 Bad Request if the title is missing
/// - 502 Bad Gateway if the embedding backend fails
async fn create_job_posting(
    State(state): State<AppState>,
    Json(req): Json<CreateJobPosting>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Job posting title is required".to_string(),
        ));
    }

    let id = state.db.job_postings.insert(req).await?;
    let posting = state.db.job_postings.get(id).await?;
    let chunk_count = state.indexer.index_posting(&posting).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": id,
            "chunk_count": chunk_count,
        })),
    ))
}

async fn list_job_postings(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobPosting>>, ApiError> {
    let postings = state.db.job_postings.list().await?;
    Ok(Json(postings))
}

async fn get_job_posting(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobPosting>, ApiError> {
    let posting = state.db.job_postings.get(id).await?;
    Ok(Json(posting))
}

// =============================================================================
// MATCHINGS
// =============================================================================

/// Run one evaluation sweep over all `created` matchings.
///
/// Each matching gets a deduplicated evaluation task before it is promoted
/// to `queued`; the response lists only the matchings that actually moved.
async fn run_sweep(State(state): State<AppState>) -> Result<Json<Vec<MatchingQueued>>, ApiError> {
    let promoted = state.sweep.run().await?;
    Ok(Json(promoted))
}

/// Fetch the status of a matching plus its result once completed.
async fn get_evaluation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<EvaluationView>, ApiError> {
    let view = state.db.matchings.evaluation(id).await?;
    Ok(Json(view))
}

// =============================================================================
// TASKS
// =============================================================================

async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = state.db.tasks.get(id).await?;
    Ok(Json(task))
}

async fn pending_tasks_count(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = state.db.tasks.pending_count().await?;
    Ok(Json(serde_json::json!({ "pending": pending })))
}

async fn task_queue_stats(State(state): State<AppState>) -> Result<Json<QueueStats>, ApiError> {
    let stats = state.db.tasks.stats().await?;
    Ok(Json(stats))
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
enum ApiError {
    Internal(talentflow_core::Error),
    NotFound(String),
    BadRequest(String),
    Upstream(String),
}

impl From<talentflow_core::Error> for ApiError {
    fn from(err: talentflow_core::Error) -> Self {
        use talentflow_core::Error;
        match &err {
            Error::NotFound(msg) => ApiError::NotFound(msg.clone()),
            Error::CandidateNotFound(_)
            | Error::JobPostingNotFound(_)
            | Error::MatchingNotFound(_) => ApiError::NotFound(err.to_string()),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg.clone()),
            Error::Database(sqlx::Error::RowNotFound) => ApiError::NotFound(err.to_string()),
            Error::Embedding(_) | Error::Inference(_) | Error::Request(_) => {
                ApiError::Upstream(err.to_string())
            }
            _ => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
