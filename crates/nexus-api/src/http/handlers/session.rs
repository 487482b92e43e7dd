//! Team collaboration session handlers for the REST API.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

use nexus_core::session::service::{BotQuestion, ExecutionReport};
use nexus_types::bot::{Bot, BotId, TeamId};
use nexus_types::error::SessionError;
use nexus_types::session::{
    CreateSessionRequest, NewPhaseMessage, NewSuggestion, SessionId, SuggestionStatus,
    TaskAssignment, TeamSession,
};

use crate::http::error::AppError;
use crate::http::extractors::auth::Authenticated;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

type SessionResponse = Json<ApiResponse<TeamSession>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotQuestionBody {
    pub bot_id: BotId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizePlanningBody {
    #[serde(default)]
    pub task_assignments: Vec<TaskAssignment>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionStatusBody {
    pub status: SuggestionStatus,
}

/// A path id that fails to parse cannot name an existing session.
fn parse_session_id(raw: &str) -> Result<SessionId, AppError> {
    raw.parse()
        .map_err(|_| AppError::Session(SessionError::NotFound))
}

fn session_links(resp: ApiResponse<TeamSession>) -> ApiResponse<TeamSession> {
    let Some(session) = resp.data.as_ref() else {
        return resp;
    };
    let self_link = format!("/api/v1/team-sessions/{}", session.id);
    let team_link = format!("/api/v1/teams/{}/sessions", session.team_id);
    resp.with_link("self", &self_link).with_link("team_sessions", &team_link)
}

/// POST /api/v1/team-sessions - Start a session for a team.
pub async fn create_session(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(body): Json<CreateSessionRequest>,
) -> Result<(StatusCode, SessionResponse), AppError> {
    let timer = RequestTimer::start();
    let session = state
        .session_service
        .create_session(&auth.user_id, body)
        .await?;
    Ok((StatusCode::CREATED, Json(session_links(timer.respond(session)))))
}

/// GET /api/v1/teams/{team_id}/sessions - The caller's sessions for a team, newest first.
pub async fn list_team_sessions(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(team_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<TeamSession>>>, AppError> {
    let timer = RequestTimer::start();
    let team_id: TeamId = team_id
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid team id '{team_id}'")))?;

    let sessions = state
        .session_service
        .list_team_sessions(&team_id, &auth.user_id)
        .await?;
    let self_link = format!("/api/v1/teams/{team_id}/sessions");
    Ok(Json(timer.respond(sessions).with_link("self", &self_link)))
}

/// GET /api/v1/teams/{team_id}/bots - Members of a team, in join order.
pub async fn list_team_bots(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(team_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Bot>>>, AppError> {
    let timer = RequestTimer::start();
    let team_id: TeamId = team_id
        .parse()
        .map_err(|_| AppError::Validation(format!("invalid team id '{team_id}'")))?;

    let bots = state
        .session_service
        .list_team_bots(&team_id, &auth.user_id)
        .await?;
    let self_link = format!("/api/v1/teams/{team_id}/bots");
    Ok(Json(timer.respond(bots).with_link("self", &self_link)))
}

/// GET /api/v1/team-sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<SessionResponse, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let session = state.session_service.get_session(&id, &auth.user_id).await?;
    Ok(Json(session_links(timer.respond(session))))
}

/// DELETE /api/v1/team-sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    state
        .session_service
        .delete_session(&id, &auth.user_id)
        .await?;
    Ok(Json(timer.respond(serde_json::json!({
        "deleted": true,
        "id": id.to_string(),
    }))))
}

/// POST /api/v1/team-sessions/{id}/planning-message
pub async fn append_planning_message(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<NewPhaseMessage>,
) -> Result<SessionResponse, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let session = state
        .session_service
        .append_planning_message(&id, &auth.user_id, body)
        .await?;
    Ok(Json(session_links(timer.respond(session))))
}

/// POST /api/v1/team-sessions/{id}/planning/bot-question - Ask a bot for clarifying questions.
pub async fn generate_bot_question(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<BotQuestionBody>,
) -> Result<Json<ApiResponse<BotQuestion>>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let result = state
        .session_service
        .generate_bot_question(&id, &auth.user_id, &body.bot_id)
        .await?;
    let self_link = format!("/api/v1/team-sessions/{id}");
    Ok(Json(timer.respond(result).with_link("session", &self_link)))
}

/// POST /api/v1/team-sessions/{id}/finalize-planning
pub async fn finalize_planning(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<FinalizePlanningBody>,
) -> Result<SessionResponse, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let session = state
        .session_service
        .finalize_planning(&id, &auth.user_id, body.task_assignments)
        .await?;
    Ok(Json(session_links(timer.respond(session))))
}

/// POST /api/v1/team-sessions/{id}/execute - Run every task in order.
pub async fn execute(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ExecutionReport>>, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let report = state.session_service.execute(&id, &auth.user_id).await?;
    let self_link = format!("/api/v1/team-sessions/{id}");
    Ok(Json(timer.respond(report).with_link("session", &self_link)))
}

/// POST /api/v1/team-sessions/{id}/review-message
pub async fn append_review_message(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<NewPhaseMessage>,
) -> Result<SessionResponse, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let session = state
        .session_service
        .append_review_message(&id, &auth.user_id, body)
        .await?;
    Ok(Json(session_links(timer.respond(session))))
}

/// POST /api/v1/team-sessions/{id}/suggestion
pub async fn add_suggestion(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
    Json(body): Json<NewSuggestion>,
) -> Result<SessionResponse, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let session = state
        .session_service
        .add_suggestion(&id, &auth.user_id, body)
        .await?;
    Ok(Json(session_links(timer.respond(session))))
}

/// PATCH /api/v1/team-sessions/{id}/suggestion/{suggestion_id}
pub async fn set_suggestion_status(
    State(state): State<AppState>,
    auth: Authenticated,
    Path((id, suggestion_id)): Path<(String, String)>,
    Json(body): Json<SuggestionStatusBody>,
) -> Result<SessionResponse, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let session = state
        .session_service
        .set_suggestion_status(&id, &auth.user_id, &suggestion_id, body.status)
        .await?;
    Ok(Json(session_links(timer.respond(session))))
}

/// POST /api/v1/team-sessions/{id}/complete
pub async fn complete_session(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<SessionResponse, AppError> {
    let timer = RequestTimer::start();
    let id = parse_session_id(&id)?;
    let session = state
        .session_service
        .complete_session(&id, &auth.user_id)
        .await?;
    Ok(Json(session_links(timer.respond(session))))
}
