//! Team collaboration session types for Nexus.
//!
//! A session walks a team of bots through four phases: planning, execution,
//! review, and completion. These types model the session record and the
//! ordered logs it accumulates along the way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::bot::{BotId, TeamId};

/// Task given to a bot whose assignment was left blank during planning.
pub const DEFAULT_TASK: &str = "Contribute to the project based on your expertise";

/// Unique identifier for a collaboration session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle phase of a collaboration session.
///
/// Phases are declared in their only legal order, so the derived `Ord`
/// doubles as the "has advanced past" relation.
///
/// Maps to the CHECK constraint in the SQLite schema:
/// `CHECK (phase IN ('planning', 'execution', 'review', 'completed'))`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Planning,
    Execution,
    Review,
    Completed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        self == SessionPhase::Completed
    }
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Planning
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Planning => write!(f, "planning"),
            SessionPhase::Execution => write!(f, "execution"),
            SessionPhase::Review => write!(f, "review"),
            SessionPhase::Completed => write!(f, "completed"),
        }
    }
}

impl FromStr for SessionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planning" => Ok(SessionPhase::Planning),
            "execution" => Ok(SessionPhase::Execution),
            "review" => Ok(SessionPhase::Review),
            "completed" => Ok(SessionPhase::Completed),
            other => Err(format!("invalid session phase: '{other}'")),
        }
    }
}

/// Who said something in a planning or review discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speaker::User => write!(f, "user"),
            Speaker::Bot => write!(f, "bot"),
        }
    }
}

/// One entry in the planning or review discussion log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseMessage {
    pub speaker: Speaker,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<BotId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_name: Option<String>,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A discussion message as submitted by a caller, before it is timestamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhaseMessage {
    pub speaker: Speaker,
    pub content: String,
    #[serde(default)]
    pub bot_id: Option<BotId>,
    #[serde(default)]
    pub bot_name: Option<String>,
}

/// The task a single bot was given when planning was finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub bot_id: BotId,
    pub bot_name: String,
    pub task: String,
}

/// Outcome of one bot's task during execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    Success,
    Error,
}

impl fmt::Display for OutputStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputStatus::Success => write!(f, "success"),
            OutputStatus::Error => write!(f, "error"),
        }
    }
}

/// Result of executing one task assignment.
///
/// `output` is empty when `status` is `Error`; the provider's message is in
/// `error` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutput {
    pub bot_id: BotId,
    pub bot_name: String,
    pub task: String,
    pub output: String,
    pub status: OutputStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutput {
    pub fn is_success(&self) -> bool {
        self.status == OutputStatus::Success
    }
}

/// Kind of proposal a bot raises during review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// Propose another pass over some piece of work.
    Iteration,
    /// Point out a problem in some piece of work.
    Critique,
}

/// Human decision on a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

impl Default for SuggestionStatus {
    fn default() -> Self {
        SuggestionStatus::Pending
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuggestionStatus::Pending => write!(f, "pending"),
            SuggestionStatus::Approved => write!(f, "approved"),
            SuggestionStatus::Rejected => write!(f, "rejected"),
        }
    }
}

impl FromStr for SuggestionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SuggestionStatus::Pending),
            "approved" => Ok(SuggestionStatus::Approved),
            "rejected" => Ok(SuggestionStatus::Rejected),
            other => Err(format!("invalid suggestion status: '{other}'")),
        }
    }
}

/// A review-phase proposal awaiting (or carrying) a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub bot_id: BotId,
    pub bot_name: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    /// Which bot's work the suggestion is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub content: String,
    pub status: SuggestionStatus,
    pub timestamp: DateTime<Utc>,
}

/// A suggestion as submitted by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSuggestion {
    pub bot_id: BotId,
    pub bot_name: String,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    #[serde(default)]
    pub target: Option<String>,
    pub content: String,
}

/// A team collaboration session.
///
/// Owned by exactly one user and scoped to one team. The ordered logs are
/// only ever appended to, and `task_assignments` / `execution_outputs` are
/// each written once, at the phase transition that produces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSession {
    pub id: SessionId,
    pub team_id: TeamId,
    pub user_id: String,
    pub title: String,
    pub brief: String,
    pub phase: SessionPhase,
    pub planning_messages: Vec<PhaseMessage>,
    pub task_assignments: Vec<TaskAssignment>,
    pub execution_outputs: Vec<ExecutionOutput>,
    pub review_messages: Vec<PhaseMessage>,
    pub suggestions: Vec<Suggestion>,
    /// Optimistic concurrency counter, bumped on every successful save.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamSession {
    /// Start a fresh session in the planning phase.
    pub fn new(team_id: TeamId, user_id: String, title: String, brief: String) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            team_id,
            user_id,
            title,
            brief,
            phase: SessionPhase::Planning,
            planning_messages: Vec::new(),
            task_assignments: Vec::new(),
            execution_outputs: Vec::new(),
            review_messages: Vec::new(),
            suggestions: Vec::new(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Request to open a new collaboration session for a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub team_id: TeamId,
    pub title: String,
    pub brief: String,
}
