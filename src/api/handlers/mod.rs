use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::api::types::*;
use crate::api::AppState;
use crate::gateway::ExecutionContext;
use crate::lister::ListerError;
use crate::models::*;
use crate::walkthrough::{self, TrackerError};

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map tracker failures onto HTTP statuses. Storage details are logged
/// server-side and never sent to the client.
fn tracker_error(e: TrackerError) -> (StatusCode, String) {
    match e {
        TrackerError::InvalidArgument(msg) => {
            tracing::warn!("Validation error: {}", msg);
            (StatusCode::BAD_REQUEST, msg)
        }
        TrackerError::StorageUnavailable { .. } => {
            tracing::error!("{}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Progress storage is busy, try again".to_string(),
            )
        }
        TrackerError::Storage(err) => {
            tracing::error!("Internal error: {:#}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn lister_error(e: ListerError) -> (StatusCode, String) {
    match e {
        ListerError::InvalidSource(_) | ListerError::NotFound(_) => {
            tracing::warn!("Invalid project source: {}", e);
            (StatusCode::BAD_REQUEST, "Invalid project path.".to_string())
        }
        other => {
            tracing::error!("File listing failed: {}", other);
            (
                StatusCode::BAD_GATEWAY,
                "Could not list project files".to_string(),
            )
        }
    }
}

fn parse_step_no(step_no: i64) -> ApiResult<u32> {
    u32::try_from(step_no)
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            tracing::warn!("Validation error: step_no {} out of range", step_no);
            (
                StatusCode::BAD_REQUEST,
                "step_no must be a positive integer".to_string(),
            )
        })
}

fn no_plan() -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        "No plan recorded for this walkthrough; start it first".to_string(),
    )
}

/// Find a step of the key's recorded plan, with the features it came from.
fn find_step(state: &AppState, key: &ProjectKey, step_no: u32) -> ApiResult<(Step, FeatureSet)> {
    let snapshot = state
        .tracker
        .plan_snapshot(key)
        .map_err(tracker_error)?
        .ok_or_else(no_plan)?;

    let step = snapshot.plan.step(step_no).cloned().ok_or((
        StatusCode::NOT_FOUND,
        format!("Step {} not found", step_no),
    ))?;
    Ok((step, snapshot.features))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Planning
// ============================================================

pub async fn plan_files(
    State(state): State<AppState>,
    Json(input): Json<PlanRequest>,
) -> ApiResult<Json<PlanResponse>> {
    let files = match (input.files, input.project_path) {
        (Some(files), _) => files,
        (None, Some(path)) => state
            .lister
            .list_project_files(&path)
            .await
            .map_err(lister_error)?,
        (None, None) => Vec::new(),
    };

    let features = walkthrough::extract(&files);
    let steps = walkthrough::plan(&features);
    Ok(Json(PlanResponse {
        total_steps: steps.len(),
        features,
        steps,
    }))
}

pub async fn start_walkthrough(
    State(state): State<AppState>,
    Json(input): Json<StartWalkthroughRequest>,
) -> ApiResult<Json<WalkthroughResponse>> {
    let key = ProjectKey::new(&input.project_path, &input.user_id);
    let files = match input.files {
        Some(files) => files,
        None => state
            .lister
            .list_project_files(&input.project_path)
            .await
            .map_err(lister_error)?,
    };

    let features = walkthrough::extract(&files);
    let plan = walkthrough::plan(&features);
    tracing::info!(
        %key,
        files = files.len(),
        stack = features.primary_stack(),
        steps = plan.len(),
        "planned walkthrough"
    );

    let (progress, snapshot) = state
        .tracker
        .record_plan(&key, features, plan)
        .map_err(tracker_error)?;

    Ok(Json(WalkthroughResponse {
        progress,
        total_steps: snapshot.plan.len(),
        features: snapshot.features,
        steps: snapshot.plan,
    }))
}

pub async fn get_steps(
    State(state): State<AppState>,
    Json(input): Json<SessionRequest>,
) -> ApiResult<Json<PlanResponse>> {
    let snapshot = state
        .tracker
        .plan_snapshot(&input.key())
        .map_err(tracker_error)?
        .ok_or_else(no_plan)?;

    Ok(Json(PlanResponse {
        total_steps: snapshot.plan.len(),
        features: snapshot.features,
        steps: snapshot.plan,
    }))
}

// ============================================================
// Progress
// ============================================================

pub async fn session_status(
    State(state): State<AppState>,
    Json(input): Json<SessionRequest>,
) -> ApiResult<Json<SessionProgress>> {
    state
        .tracker
        .get_status(&input.key())
        .map(Json)
        .map_err(tracker_error)
}

pub async fn complete_step(
    State(state): State<AppState>,
    Json(input): Json<StepRequest>,
) -> ApiResult<Json<SessionProgress>> {
    let step_no = parse_step_no(input.step_no)?;
    state
        .tracker
        .complete_step(&input.key(), step_no)
        .map(Json)
        .map_err(tracker_error)
}

pub async fn execute_step(
    State(state): State<AppState>,
    Json(input): Json<ExecuteStepRequest>,
) -> ApiResult<Json<ExecuteStepResponse>> {
    let step_no = parse_step_no(input.step_no)?;
    let key = ProjectKey::new(&input.project_path, &input.user_id);
    let (step, _) = find_step(&state, &key, step_no)?;

    let context = ExecutionContext {
        project_key: key.clone(),
        project_path: input.project_path,
        interface: input.interface,
    };
    let outcome = state.gateway.execute(&step, &context).await;

    let (record, progress) = state
        .tracker
        .record_execution(&key, step_no, outcome)
        .map_err(tracker_error)?;

    let guidance = if record.success {
        None
    } else {
        Some(failure_guidance(&state, &key, &step, &record.message).await)
    };

    Ok(Json(ExecuteStepResponse {
        step_no,
        step_title: step.title,
        success: record.success,
        message: record.message,
        guidance,
        progress,
    }))
}

/// The step's troubleshooting notes, extended by the answer engine when one
/// is configured and answers.
async fn failure_guidance(state: &AppState, key: &ProjectKey, step: &Step, message: &str) -> String {
    let mut guidance = step.troubleshooting.clone();
    let Some(engine) = &state.answers else {
        return guidance;
    };

    let question = format!(
        "Troubleshooting help for failed step: {}. Command: {}. Error: {}",
        step.title,
        step.command.as_deref().unwrap_or("none"),
        message
    );
    match engine.answer(&question, step).await {
        Ok(answer) if !answer.answer.trim().is_empty() => {
            guidance.push_str("\n\nAdditional help: ");
            guidance.push_str(&answer.answer);
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(%key, step_no = step.step_no, "answer engine failed: {:#}", e),
    }
    guidance
}

pub async fn resume(
    State(state): State<AppState>,
    Json(input): Json<SessionRequest>,
) -> ApiResult<Json<ResumeResponse>> {
    state
        .tracker
        .resume(&input.key())
        .map(|s| Json(s.into()))
        .map_err(tracker_error)
}

pub async fn reset(
    State(state): State<AppState>,
    Json(input): Json<SessionRequest>,
) -> ApiResult<Json<SessionProgress>> {
    state
        .tracker
        .reset(&input.key())
        .map(Json)
        .map_err(tracker_error)
}

pub async fn list_executions(
    State(state): State<AppState>,
    Json(input): Json<SessionRequest>,
) -> ApiResult<Json<Vec<ExecutionRecord>>> {
    state
        .tracker
        .executions(&input.key())
        .map(Json)
        .map_err(tracker_error)
}

// ============================================================
// Help
// ============================================================

pub async fn get_help(
    State(state): State<AppState>,
    Json(input): Json<HelpRequest>,
) -> ApiResult<Json<HelpResponse>> {
    let step_no = parse_step_no(input.step_no)?;
    let key = ProjectKey::new(&input.project_path, &input.user_id);
    let (step, features) = find_step(&state, &key, step_no)?;

    let asked = input
        .question
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty());

    let (help_content, sources) = match (asked, &state.answers) {
        (Some(question), Some(engine)) => match engine.answer(question, &step).await {
            Ok(answer) => (answer.answer, answer.sources),
            Err(e) => {
                tracing::warn!(%key, step_no, "answer engine failed: {:#}", e);
                (walkthrough::explain(&step, &features), Vec::new())
            }
        },
        _ => (walkthrough::explain(&step, &features), Vec::new()),
    };

    Ok(Json(HelpResponse {
        step_no,
        step_title: step.title,
        help_content,
        sources,
        related_files: step.related_files,
        prerequisites: step.prerequisites,
    }))
}
