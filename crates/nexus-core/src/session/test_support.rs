//! Test doubles shared by the session tests: a scripted provider and
//! in-memory repositories.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use nexus_types::bot::{Bot, BotId, Team, TeamId};
use nexus_types::error::RepositoryError;
use nexus_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
};
use nexus_types::session::{SessionId, TeamSession};

use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::provider::LlmProvider;
use crate::repository::roster::RosterRepository;
use crate::repository::session::SessionRepository;

pub type CallLog = Arc<Mutex<Vec<CompletionRequest>>>;

pub const MOCK_OUTPUT_CAP: u32 = 4096;

pub enum MockReply {
    Text(String),
    /// Text cut off at the token limit.
    Truncated(String),
    Fail(LlmError),
    Hang,
}

/// Replies from a script, in order; answers `"ok"` once the script runs out.
pub struct MockProvider {
    script: Mutex<VecDeque<MockReply>>,
    calls: CallLog,
    capabilities: ProviderCapabilities,
}

impl MockProvider {
    pub fn scripted(replies: Vec<MockReply>) -> (BoxLlmProvider, CallLog) {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let provider = Self {
            script: Mutex::new(replies.into()),
            calls: calls.clone(),
            capabilities: ProviderCapabilities {
                max_output_tokens: MOCK_OUTPUT_CAP,
            },
        };
        (BoxLlmProvider::new(provider), calls)
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.lock().unwrap().push(request.clone());
        let reply = self.script.lock().unwrap().pop_front();
        let (content, stop_reason) = match reply {
            Some(MockReply::Text(text)) => (text, StopReason::EndTurn),
            Some(MockReply::Truncated(text)) => (text, StopReason::MaxTokens),
            Some(MockReply::Fail(e)) => return Err(e),
            Some(MockReply::Hang) => std::future::pending().await,
            None => ("ok".to_string(), StopReason::EndTurn),
        };
        Ok(CompletionResponse {
            id: "mock-1".to_string(),
            content,
            model: request.model.clone(),
            stop_reason,
            usage: Usage::default(),
        })
    }
}

pub fn sample_bot(name: &str) -> Bot {
    let now = Utc::now();
    Bot {
        id: BotId::new(),
        user_id: "user-1".to_string(),
        name: name.to_string(),
        description: None,
        model: format!("vendor/{}", name.to_lowercase()),
        system_prompt: Some(format!("You are {name}.")),
        temperature: 0.5,
        max_tokens: 800,
        role: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn sample_team(user_id: &str) -> Team {
    let now = Utc::now();
    Team {
        id: TeamId::new(),
        user_id: user_id.to_string(),
        name: "Launch crew".to_string(),
        description: None,
        created_at: now,
        updated_at: now,
    }
}

#[derive(Clone, Default)]
pub struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, TeamSession>>>,
}

impl InMemorySessionRepository {
    /// Bump the stored version behind the service's back.
    pub fn touch(&self, id: &SessionId) {
        if let Some(session) = self.sessions.lock().unwrap().get_mut(id) {
            session.version += 1;
        }
    }
}

impl SessionRepository for InMemorySessionRepository {
    async fn create(&self, session: &TeamSession) -> Result<TeamSession, RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.id) {
            return Err(RepositoryError::Conflict(session.id.to_string()));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(session.clone())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<TeamSession>, RepositoryError> {
        Ok(self.sessions.lock().unwrap().get(id).cloned())
    }

    async fn save(
        &self,
        session: &TeamSession,
        expected_version: i64,
    ) -> Result<TeamSession, RepositoryError> {
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions.get_mut(&session.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::Conflict(format!(
                "session {} is at version {}, expected {expected_version}",
                session.id, stored.version
            )));
        }
        let mut updated = session.clone();
        updated.version = expected_version + 1;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn list_by_team(&self, team_id: &TeamId) -> Result<Vec<TeamSession>, RepositoryError> {
        let mut sessions: Vec<TeamSession> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| &s.team_id == team_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn delete(&self, id: &SessionId) -> Result<(), RepositoryError> {
        match self.sessions.lock().unwrap().remove(id) {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryRosterRepository {
    bots: Arc<Mutex<Vec<Bot>>>,
    teams: Arc<Mutex<Vec<Team>>>,
    members: Arc<Mutex<Vec<(TeamId, BotId)>>>,
}

impl RosterRepository for InMemoryRosterRepository {
    async fn create_bot(&self, bot: &Bot) -> Result<Bot, RepositoryError> {
        self.bots.lock().unwrap().push(bot.clone());
        Ok(bot.clone())
    }

    async fn get_bot(&self, id: &BotId) -> Result<Option<Bot>, RepositoryError> {
        Ok(self.bots.lock().unwrap().iter().find(|b| &b.id == id).cloned())
    }

    async fn list_bots(&self, user_id: &str) -> Result<Vec<Bot>, RepositoryError> {
        Ok(self
            .bots
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_team(&self, team: &Team) -> Result<Team, RepositoryError> {
        self.teams.lock().unwrap().push(team.clone());
        Ok(team.clone())
    }

    async fn get_team(&self, id: &TeamId) -> Result<Option<Team>, RepositoryError> {
        Ok(self.teams.lock().unwrap().iter().find(|t| &t.id == id).cloned())
    }

    async fn add_team_member(&self, team_id: &TeamId, bot_id: &BotId) -> Result<(), RepositoryError> {
        let mut members = self.members.lock().unwrap();
        if members.iter().any(|(t, b)| t == team_id && b == bot_id) {
            return Err(RepositoryError::Conflict(format!("{bot_id} already in {team_id}")));
        }
        members.push((team_id.clone(), bot_id.clone()));
        Ok(())
    }

    async fn remove_team_member(&self, team_id: &TeamId, bot_id: &BotId) -> Result<(), RepositoryError> {
        let mut members = self.members.lock().unwrap();
        let before = members.len();
        members.retain(|(t, b)| !(t == team_id && b == bot_id));
        if members.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_team_bots(&self, team_id: &TeamId) -> Result<Vec<Bot>, RepositoryError> {
        let members = self.members.lock().unwrap();
        let bots = self.bots.lock().unwrap();
        Ok(members
            .iter()
            .filter(|(t, _)| t == team_id)
            .filter_map(|(_, b)| bots.iter().find(|bot| &bot.id == b).cloned())
            .collect())
    }
}
