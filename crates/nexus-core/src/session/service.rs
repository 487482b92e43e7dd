//! Collaboration session service.
//!
//! Every mutating operation follows the same shape: load the session,
//! check ownership, apply a transition from [`machine`](super::machine) or
//! [`ledger`](super::ledger), then save with a version check so concurrent
//! writers get a `Conflict` instead of silently overwriting each other.

use serde::Serialize;
use tracing::{info, warn};

use nexus_types::bot::{Bot, BotId, TeamId};
use nexus_types::config::ExecutionSettings;
use nexus_types::error::SessionError;
use nexus_types::llm::CompletionRequest;
use nexus_types::session::{
    CreateSessionRequest, ExecutionOutput, NewPhaseMessage, NewSuggestion, SessionId, SessionPhase,
    Speaker, SuggestionStatus, TaskAssignment, TeamSession,
};

use crate::repository::roster::RosterRepository;
use crate::repository::session::SessionRepository;

use super::executor::{ResolvedAssignment, TaskExecutor, strip_control_chars};
use super::{ledger, machine, prompt};

/// Result of asking a bot for clarifying questions.
#[derive(Debug, Clone, Serialize)]
pub struct BotQuestion {
    pub session: TeamSession,
    pub question: String,
}

/// Result of running the execution phase.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub session: TeamSession,
    pub responses: Vec<ExecutionOutput>,
}

/// Service driving team sessions through their phases.
///
/// Generic over repository traits so nexus-core never depends on
/// nexus-infra.
pub struct SessionService<S: SessionRepository, R: RosterRepository> {
    sessions: S,
    roster: R,
    executor: TaskExecutor,
    question_max_tokens: u32,
}

impl<S: SessionRepository, R: RosterRepository> SessionService<S, R> {
    pub fn new(sessions: S, roster: R, executor: TaskExecutor, settings: &ExecutionSettings) -> Self {
        Self {
            sessions,
            roster,
            executor,
            question_max_tokens: settings.question_max_tokens,
        }
    }

    /// Access the roster repository (used by the CLI for bot/team management).
    pub fn roster(&self) -> &R {
        &self.roster
    }

    /// Start a session for one of the user's teams, in the planning phase.
    pub async fn create_session(
        &self,
        user_id: &str,
        request: CreateSessionRequest,
    ) -> Result<TeamSession, SessionError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(SessionError::Validation("title cannot be empty".to_string()));
        }
        if request.brief.trim().is_empty() {
            return Err(SessionError::Validation("brief cannot be empty".to_string()));
        }

        let team = self
            .roster
            .get_team(&request.team_id)
            .await?
            .ok_or_else(|| SessionError::Validation(format!("team '{}' does not exist", request.team_id)))?;
        if team.user_id != user_id {
            return Err(SessionError::Forbidden);
        }

        let session = TeamSession::new(
            request.team_id,
            user_id.to_string(),
            title.to_string(),
            request.brief,
        );
        let session = self.sessions.create(&session).await?;
        info!(session_id = %session.id, team_id = %session.team_id, "created team session");
        Ok(session)
    }

    /// Fetch a session the user owns.
    pub async fn get_session(
        &self,
        id: &SessionId,
        user_id: &str,
    ) -> Result<TeamSession, SessionError> {
        let session = self.sessions.get(id).await?.ok_or(SessionError::NotFound)?;
        if !session.is_owned_by(user_id) {
            return Err(SessionError::Forbidden);
        }
        Ok(session)
    }

    /// The user's sessions for a team, newest first.
    pub async fn list_team_sessions(
        &self,
        team_id: &TeamId,
        user_id: &str,
    ) -> Result<Vec<TeamSession>, SessionError> {
        let sessions = self.sessions.list_by_team(team_id).await?;
        Ok(sessions.into_iter().filter(|s| s.is_owned_by(user_id)).collect())
    }

    /// Members of a team the user owns, in the order they joined.
    pub async fn list_team_bots(
        &self,
        team_id: &TeamId,
        user_id: &str,
    ) -> Result<Vec<Bot>, SessionError> {
        let team = self
            .roster
            .get_team(team_id)
            .await?
            .ok_or_else(|| SessionError::TeamNotFound(team_id.clone()))?;
        if team.user_id != user_id {
            return Err(SessionError::Forbidden);
        }
        Ok(self.roster.get_team_bots(team_id).await?)
    }

    pub async fn append_planning_message(
        &self,
        id: &SessionId,
        user_id: &str,
        message: NewPhaseMessage,
    ) -> Result<TeamSession, SessionError> {
        let mut session = self.get_session(id, user_id).await?;
        let expected = session.version;
        machine::append_planning_message(&mut session, message)?;
        self.persist(session, expected).await
    }

    /// Ask a team bot for clarifying questions about the brief.
    ///
    /// The bot's answer is appended to the planning discussion. Provider
    /// failures and empty answers are replaced by a canned question, so
    /// this never fails because of the provider.
    pub async fn generate_bot_question(
        &self,
        id: &SessionId,
        user_id: &str,
        bot_id: &BotId,
    ) -> Result<BotQuestion, SessionError> {
        let mut session = self.get_session(id, user_id).await?;
        machine::require_phase(&session, SessionPhase::Planning)?;
        let expected = session.version;

        let team_bots = self.roster.get_team_bots(&session.team_id).await?;
        let bot = team_bots
            .into_iter()
            .find(|b| &b.id == bot_id)
            .ok_or_else(|| SessionError::BotNotFound(bot_id.clone()))?;

        let question = self.ask_question(&bot, &session.brief).await;

        machine::append_planning_message(
            &mut session,
            NewPhaseMessage {
                speaker: Speaker::Bot,
                content: question.clone(),
                bot_id: Some(bot.id.clone()),
                bot_name: Some(bot.name.clone()),
            },
        )?;
        let session = self.persist(session, expected).await?;
        Ok(BotQuestion { session, question })
    }

    async fn ask_question(&self, bot: &Bot, brief: &str) -> String {
        let request = CompletionRequest {
            model: bot.model.clone(),
            messages: prompt::build_question_messages(bot, brief),
            max_tokens: self.question_max_tokens,
            temperature: Some(bot.temperature),
        };

        match self.executor.call(&request).await {
            Ok(response) => {
                let text = strip_control_chars(&response.content);
                if text.is_empty() {
                    warn!(bot = %bot.name, "empty bot question, using fallback");
                    prompt::fallback_question(&bot.name)
                } else {
                    text
                }
            }
            Err(e) => {
                warn!(bot = %bot.name, error = %e, "bot question failed, using fallback");
                prompt::fallback_question(&bot.name)
            }
        }
    }

    /// Fix the task assignments and move to execution.
    pub async fn finalize_planning(
        &self,
        id: &SessionId,
        user_id: &str,
        assignments: Vec<TaskAssignment>,
    ) -> Result<TeamSession, SessionError> {
        let mut session = self.get_session(id, user_id).await?;
        let expected = session.version;
        machine::finalize_planning(&mut session, assignments)?;
        let session = self.persist(session, expected).await?;
        info!(
            session_id = %session.id,
            tasks = session.task_assignments.len(),
            "planning finalized"
        );
        Ok(session)
    }

    /// Run every task assignment in order and move to review.
    ///
    /// Bots are resolved against the team's current roster before any
    /// provider call, so a missing bot fails the whole operation up front.
    pub async fn execute(
        &self,
        id: &SessionId,
        user_id: &str,
    ) -> Result<ExecutionReport, SessionError> {
        let mut session = self.get_session(id, user_id).await?;
        machine::ensure_executable(&session)?;
        let expected = session.version;

        let team_bots = self.roster.get_team_bots(&session.team_id).await?;
        let resolved = session
            .task_assignments
            .iter()
            .map(|a| {
                let bot = team_bots
                    .iter()
                    .find(|b| b.id == a.bot_id)
                    .ok_or_else(|| SessionError::BotNotFound(a.bot_id.clone()))?;
                Ok(ResolvedAssignment {
                    bot_id: bot.id.clone(),
                    bot_name: bot.name.clone(),
                    model: bot.model.clone(),
                    system_prompt: bot.system_prompt.clone(),
                    task: a.task.clone(),
                    temperature: bot.temperature,
                    max_tokens: bot.max_tokens,
                })
            })
            .collect::<Result<Vec<_>, SessionError>>()?;

        info!(
            session_id = %session.id,
            tasks = resolved.len(),
            provider = self.executor.provider_name(),
            "executing team tasks"
        );
        let responses = self.executor.run(&session.brief, &resolved).await;

        machine::record_execution(&mut session, responses.clone())?;
        let session = self.persist(session, expected).await?;
        Ok(ExecutionReport { session, responses })
    }

    pub async fn append_review_message(
        &self,
        id: &SessionId,
        user_id: &str,
        message: NewPhaseMessage,
    ) -> Result<TeamSession, SessionError> {
        let mut session = self.get_session(id, user_id).await?;
        let expected = session.version;
        machine::append_review_message(&mut session, message)?;
        self.persist(session, expected).await
    }

    pub async fn add_suggestion(
        &self,
        id: &SessionId,
        user_id: &str,
        suggestion: NewSuggestion,
    ) -> Result<TeamSession, SessionError> {
        let mut session = self.get_session(id, user_id).await?;
        let expected = session.version;
        let added = ledger::add_suggestion(&mut session, suggestion)?;
        info!(session_id = %session.id, suggestion_id = %added.id, "suggestion added");
        self.persist(session, expected).await
    }

    pub async fn set_suggestion_status(
        &self,
        id: &SessionId,
        user_id: &str,
        suggestion_id: &str,
        status: SuggestionStatus,
    ) -> Result<TeamSession, SessionError> {
        let mut session = self.get_session(id, user_id).await?;
        let expected = session.version;
        ledger::set_status(&mut session, suggestion_id, status)?;
        self.persist(session, expected).await
    }

    /// Close the session. Completing a completed session returns it as is.
    pub async fn complete_session(
        &self,
        id: &SessionId,
        user_id: &str,
    ) -> Result<TeamSession, SessionError> {
        let mut session = self.get_session(id, user_id).await?;
        let expected = session.version;
        if !machine::complete(&mut session) {
            return Ok(session);
        }
        let session = self.persist(session, expected).await?;
        info!(session_id = %session.id, "session completed");
        Ok(session)
    }

    pub async fn delete_session(&self, id: &SessionId, user_id: &str) -> Result<(), SessionError> {
        let session = self.get_session(id, user_id).await?;
        self.sessions.delete(&session.id).await?;
        info!(session_id = %session.id, "session deleted");
        Ok(())
    }

    async fn persist(
        &self,
        session: TeamSession,
        expected_version: i64,
    ) -> Result<TeamSession, SessionError> {
        self.sessions.save(&session, expected_version).await.map_err(|e| {
            warn!(session_id = %session.id, error = %e, "session save failed");
            SessionError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use nexus_types::bot::Team;
    use nexus_types::llm::LlmError;
    use nexus_types::session::{OutputStatus, Suggestion, SuggestionKind};

    use crate::session::executor::CallPolicy;
    use crate::session::test_support::{
        CallLog, InMemoryRosterRepository, InMemorySessionRepository, MockProvider, MockReply,
        sample_bot, sample_team,
    };

    const OWNER: &str = "user-1";

    struct Fixture {
        service: SessionService<InMemorySessionRepository, InMemoryRosterRepository>,
        sessions: InMemorySessionRepository,
        roster: InMemoryRosterRepository,
        calls: CallLog,
        team: Team,
        bots: Vec<Bot>,
    }

    async fn fixture(replies: Vec<MockReply>) -> Fixture {
        let sessions = InMemorySessionRepository::default();
        let roster = InMemoryRosterRepository::default();
        let team = roster.create_team(&sample_team(OWNER)).await.unwrap();
        let mut bots = Vec::new();
        for name in ["Ada", "Grace", "Linus"] {
            let bot = roster.create_bot(&sample_bot(name)).await.unwrap();
            roster.add_team_member(&team.id, &bot.id).await.unwrap();
            bots.push(bot);
        }

        let (provider, calls) = MockProvider::scripted(replies);
        let policy = CallPolicy {
            timeout: Duration::from_secs(5),
            max_retries: 1,
            retry_backoff: Duration::ZERO,
        };
        let executor = TaskExecutor::new(Arc::new(provider), policy);
        let service = SessionService::new(
            sessions.clone(),
            roster.clone(),
            executor,
            &ExecutionSettings::default(),
        );
        Fixture {
            service,
            sessions,
            roster,
            calls,
            team,
            bots,
        }
    }

    impl Fixture {
        async fn create(&self) -> TeamSession {
            self.service
                .create_session(
                    OWNER,
                    CreateSessionRequest {
                        team_id: self.team.id.clone(),
                        title: "Bakery launch".to_string(),
                        brief: "Open a neighborhood bakery".to_string(),
                    },
                )
                .await
                .unwrap()
        }

        fn assignments(&self, tasks: &[&str]) -> Vec<TaskAssignment> {
            self.bots
                .iter()
                .zip(tasks)
                .map(|(bot, task)| TaskAssignment {
                    bot_id: bot.id.clone(),
                    bot_name: bot.name.clone(),
                    task: task.to_string(),
                })
                .collect()
        }

        async fn in_review(&self) -> TeamSession {
            let s = self.create().await;
            self.service
                .finalize_planning(&s.id, OWNER, self.assignments(&["Research", "Write"]))
                .await
                .unwrap();
            self.service.execute(&s.id, OWNER).await.unwrap().session
        }
    }

    fn user_says(content: &str) -> NewPhaseMessage {
        NewPhaseMessage {
            speaker: Speaker::User,
            content: content.to_string(),
            bot_id: None,
            bot_name: None,
        }
    }

    #[tokio::test]
    async fn create_starts_in_planning() {
        let f = fixture(vec![]).await;
        let s = f.create().await;
        assert_eq!(s.phase, SessionPhase::Planning);
        assert_eq!(s.version, 1);
        assert!(s.planning_messages.is_empty());
        assert!(s.task_assignments.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_blank_brief() {
        let f = fixture(vec![]).await;
        let err = f
            .service
            .create_session(
                OWNER,
                CreateSessionRequest {
                    team_id: f.team.id.clone(),
                    title: "Launch".to_string(),
                    brief: "  ".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
    }

    #[tokio::test]
    async fn create_on_foreign_team_is_forbidden() {
        let f = fixture(vec![]).await;
        let err = f
            .service
            .create_session(
                "intruder",
                CreateSessionRequest {
                    team_id: f.team.id.clone(),
                    title: "Launch".to_string(),
                    brief: "Brief".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Forbidden));
    }

    #[tokio::test]
    async fn other_users_are_forbidden() {
        let f = fixture(vec![]).await;
        let s = f.create().await;

        let err = f.service.get_session(&s.id, "intruder").await.unwrap_err();
        assert!(matches!(err, SessionError::Forbidden));

        let err = f
            .service
            .append_planning_message(&s.id, "intruder", user_says("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Forbidden));

        let err = f.service.complete_session(&s.id, "intruder").await.unwrap_err();
        assert!(matches!(err, SessionError::Forbidden));

        let unchanged = f.service.get_session(&s.id, OWNER).await.unwrap();
        assert_eq!(unchanged.version, s.version);
        assert_eq!(unchanged.phase, SessionPhase::Planning);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let f = fixture(vec![]).await;
        let err = f.service.get_session(&SessionId::new(), OWNER).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound));
    }

    #[tokio::test]
    async fn list_filters_by_owner_newest_first() {
        let f = fixture(vec![]).await;
        let older = f.create().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let newer = f.create().await;

        let mut foreign = TeamSession::new(
            f.team.id.clone(),
            "someone-else".to_string(),
            "Theirs".to_string(),
            "Brief".to_string(),
        );
        foreign.created_at = newer.created_at + chrono::Duration::seconds(1);
        f.sessions.create(&foreign).await.unwrap();

        let listed = f.service.list_team_sessions(&f.team.id, OWNER).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn planning_messages_bump_version() {
        let f = fixture(vec![]).await;
        let s = f.create().await;
        let s = f
            .service
            .append_planning_message(&s.id, OWNER, user_says("Budget is tight"))
            .await
            .unwrap();
        assert_eq!(s.version, 2);
        assert_eq!(s.planning_messages.len(), 1);
        assert_eq!(s.planning_messages[0].speaker, Speaker::User);
    }

    #[tokio::test]
    async fn bot_question_appends_provider_text() {
        let f = fixture(vec![MockReply::Text("  Who is the audience?  ".into())]).await;
        let s = f.create().await;

        let result = f
            .service
            .generate_bot_question(&s.id, OWNER, &f.bots[1].id)
            .await
            .unwrap();

        assert_eq!(result.question, "Who is the audience?");
        let message = &result.session.planning_messages[0];
        assert_eq!(message.speaker, Speaker::Bot);
        assert_eq!(message.bot_id.as_ref(), Some(&f.bots[1].id));
        assert_eq!(message.bot_name.as_deref(), Some("Grace"));
        assert_eq!(message.content, "Who is the audience?");

        let calls = f.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].max_tokens, 200);
        assert_eq!(calls[0].temperature, Some(f.bots[1].temperature));
        assert_eq!(calls[0].model, f.bots[1].model);
    }

    #[tokio::test]
    async fn bot_question_falls_back_on_provider_error() {
        let f = fixture(vec![MockReply::Fail(LlmError::AuthenticationFailed)]).await;
        let s = f.create().await;

        let result = f
            .service
            .generate_bot_question(&s.id, OWNER, &f.bots[0].id)
            .await
            .unwrap();

        assert_eq!(result.question, prompt::fallback_question("Ada"));
        assert_eq!(result.session.planning_messages.len(), 1);
    }

    #[tokio::test]
    async fn bot_question_falls_back_on_empty_text() {
        let f = fixture(vec![MockReply::Text("   ".into())]).await;
        let s = f.create().await;
        let result = f
            .service
            .generate_bot_question(&s.id, OWNER, &f.bots[0].id)
            .await
            .unwrap();
        assert_eq!(result.question, prompt::fallback_question("Ada"));
    }

    #[tokio::test]
    async fn bot_question_of_only_control_chars_falls_back() {
        let f = fixture(vec![MockReply::Text("\u{0}\u{7}".into())]).await;
        let s = f.create().await;
        let result = f
            .service
            .generate_bot_question(&s.id, OWNER, &f.bots[0].id)
            .await
            .unwrap();
        assert_eq!(result.question, prompt::fallback_question("Ada"));
        let stored = result.session.planning_messages.last().unwrap();
        assert_eq!(stored.content, prompt::fallback_question("Ada"));
    }

    #[tokio::test]
    async fn bot_question_strips_embedded_control_chars() {
        let f = fixture(vec![MockReply::Text(" Who\u{1b}[0m buys bread?\u{7f}\n".into())]).await;
        let s = f.create().await;
        let result = f
            .service
            .generate_bot_question(&s.id, OWNER, &f.bots[0].id)
            .await
            .unwrap();
        assert_eq!(result.question, "Who[0m buys bread?");
    }

    #[tokio::test]
    async fn bot_question_for_non_member_fails() {
        let f = fixture(vec![]).await;
        let s = f.create().await;
        let stranger = f.roster.create_bot(&sample_bot("Stranger")).await.unwrap();

        let err = f
            .service
            .generate_bot_question(&s.id, OWNER, &stranger.id)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::BotNotFound(id) if id == stranger.id));
        assert!(f.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn bot_question_requires_planning() {
        let f = fixture(vec![]).await;
        let s = f.in_review().await;
        let calls_before = f.calls.lock().unwrap().len();

        let err = f
            .service
            .generate_bot_question(&s.id, OWNER, &f.bots[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
        assert_eq!(f.calls.lock().unwrap().len(), calls_before);
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let f = fixture(vec![
            MockReply::Text("market notes".into()),
            MockReply::Text("menu draft".into()),
            MockReply::Text("final plan".into()),
        ])
        .await;
        let s = f.create().await;

        let s = f
            .service
            .finalize_planning(&s.id, OWNER, f.assignments(&["Research", "", "Edit"]))
            .await
            .unwrap();
        assert_eq!(s.phase, SessionPhase::Execution);
        assert_eq!(s.task_assignments[1].task, nexus_types::session::DEFAULT_TASK);

        let report = f.service.execute(&s.id, OWNER).await.unwrap();
        assert_eq!(report.session.phase, SessionPhase::Review);
        assert_eq!(report.responses.len(), 3);
        assert_eq!(report.session.execution_outputs, report.responses);
        for (output, assignment) in report.responses.iter().zip(&report.session.task_assignments) {
            assert_eq!(output.bot_id, assignment.bot_id);
            assert_eq!(output.task, assignment.task);
        }

        {
            let calls = f.calls.lock().unwrap();
            assert_eq!(calls[0].model, f.bots[0].model);
            assert_eq!(calls[0].max_tokens, f.bots[0].max_tokens);
            assert!(calls[2].messages[1].content.contains("1. Ada (Research):\nmarket notes"));
            assert!(calls[2].messages[1].content.contains("2. Grace ("));
        }

        let s = f
            .service
            .append_review_message(&s.id, OWNER, user_says("Looks good"))
            .await
            .unwrap();
        assert_eq!(s.review_messages.len(), 1);

        let s = f
            .service
            .add_suggestion(
                &s.id,
                OWNER,
                NewSuggestion {
                    bot_id: f.bots[2].id.clone(),
                    bot_name: "Linus".to_string(),
                    kind: SuggestionKind::Iteration,
                    target: Some("Grace".to_string()),
                    content: "Add seasonal items".to_string(),
                },
            )
            .await
            .unwrap();
        let suggestion_id = s.suggestions[0].id.clone();

        let s = f.service.complete_session(&s.id, OWNER).await.unwrap();
        assert_eq!(s.phase, SessionPhase::Completed);

        let s = f
            .service
            .set_suggestion_status(&s.id, OWNER, &suggestion_id, SuggestionStatus::Approved)
            .await
            .unwrap();
        assert_eq!(s.suggestions[0].status, SuggestionStatus::Approved);
        assert_eq!(s.phase, SessionPhase::Completed);
        assert_eq!(s.execution_outputs.len(), 3);
    }

    #[tokio::test]
    async fn approving_a_suggestion_leaves_the_rest_of_the_session() {
        let f = fixture(vec![]).await;
        let s = f.in_review().await;
        let before = f
            .service
            .add_suggestion(
                &s.id,
                OWNER,
                NewSuggestion {
                    bot_id: f.bots[0].id.clone(),
                    bot_name: "Ada".to_string(),
                    kind: SuggestionKind::Critique,
                    target: Some("Grace".to_string()),
                    content: "Shorter sentences".to_string(),
                },
            )
            .await
            .unwrap();
        let suggestion_id = before.suggestions[0].id.clone();

        let after = f
            .service
            .set_suggestion_status(&s.id, OWNER, &suggestion_id, SuggestionStatus::Approved)
            .await
            .unwrap();

        assert_eq!(
            after.suggestions,
            vec![Suggestion {
                status: SuggestionStatus::Approved,
                ..before.suggestions[0].clone()
            }]
        );
        assert_eq!(after.phase, before.phase);
        assert_eq!(after.execution_outputs, before.execution_outputs);
        assert_eq!(after.task_assignments, before.task_assignments);
        assert_eq!(after.planning_messages, before.planning_messages);
        assert_eq!(after.review_messages, before.review_messages);
        assert_eq!(after.brief, before.brief);
    }

    #[tokio::test]
    async fn failed_task_does_not_abort_execution() {
        let f = fixture(vec![
            MockReply::Text("ok one".into()),
            MockReply::Fail(LlmError::InvalidRequest("bad model".into())),
        ])
        .await;
        let s = f.create().await;
        f.service
            .finalize_planning(&s.id, OWNER, f.assignments(&["One", "Two", "Three"]))
            .await
            .unwrap();

        let report = f.service.execute(&s.id, OWNER).await.unwrap();
        let statuses: Vec<_> = report.responses.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [OutputStatus::Success, OutputStatus::Error, OutputStatus::Success]
        );
        assert_eq!(report.session.phase, SessionPhase::Review);
    }

    #[tokio::test]
    async fn execute_twice_is_rejected() {
        let f = fixture(vec![]).await;
        let s = f.in_review().await;
        let calls_before = f.calls.lock().unwrap().len();

        let err = f.service.execute(&s.id, OWNER).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
        assert_eq!(f.calls.lock().unwrap().len(), calls_before);
    }

    #[tokio::test]
    async fn execute_without_assignments_is_rejected() {
        let f = fixture(vec![]).await;
        let s = f.create().await;
        f.service.finalize_planning(&s.id, OWNER, Vec::new()).await.unwrap();

        let err = f.service.execute(&s.id, OWNER).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
        let s = f.service.get_session(&s.id, OWNER).await.unwrap();
        assert_eq!(s.phase, SessionPhase::Execution);
    }

    #[tokio::test]
    async fn team_bots_are_listed_for_the_owner_only() {
        let f = fixture(vec![]).await;
        let bots = f.service.list_team_bots(&f.team.id, OWNER).await.unwrap();
        let names: Vec<_> = bots.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Ada", "Grace", "Linus"]);

        f.roster
            .remove_team_member(&f.team.id, &f.bots[0].id)
            .await
            .unwrap();
        let bots = f.service.list_team_bots(&f.team.id, OWNER).await.unwrap();
        assert_eq!(bots[0].name, "Grace");

        let err = f.service.list_team_bots(&f.team.id, "user-2").await.unwrap_err();
        assert!(matches!(err, SessionError::Forbidden));
        let missing = TeamId::new();
        let err = f.service.list_team_bots(&missing, OWNER).await.unwrap_err();
        assert!(matches!(err, SessionError::TeamNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn execute_with_removed_bot_fails_before_any_call() {
        let f = fixture(vec![]).await;
        let s = f.create().await;
        f.service
            .finalize_planning(&s.id, OWNER, f.assignments(&["One", "Two"]))
            .await
            .unwrap();
        f.roster
            .remove_team_member(&f.team.id, &f.bots[1].id)
            .await
            .unwrap();

        let err = f.service.execute(&s.id, OWNER).await.unwrap_err();
        assert!(matches!(err, SessionError::BotNotFound(id) if id == f.bots[1].id));
        assert!(f.calls.lock().unwrap().is_empty());
        let s = f.service.get_session(&s.id, OWNER).await.unwrap();
        assert_eq!(s.phase, SessionPhase::Execution);
        assert!(s.execution_outputs.is_empty());
    }

    #[tokio::test]
    async fn review_operations_require_review() {
        let f = fixture(vec![]).await;
        let s = f.create().await;
        let err = f
            .service
            .append_review_message(&s.id, OWNER, user_says("early"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
    }

    #[tokio::test]
    async fn unknown_suggestion_is_not_found() {
        let f = fixture(vec![]).await;
        let s = f.in_review().await;
        let err = f
            .service
            .set_suggestion_status(&s.id, OWNER, "sugg_nope", SuggestionStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::SuggestionNotFound(_)));
    }

    #[tokio::test]
    async fn complete_twice_is_noop() {
        let f = fixture(vec![]).await;
        let s = f.create().await;
        let first = f.service.complete_session(&s.id, OWNER).await.unwrap();
        let second = f.service.complete_session(&s.id, OWNER).await.unwrap();
        assert_eq!(first.version, second.version);
        assert_eq!(second.phase, SessionPhase::Completed);

        let err = f
            .service
            .append_planning_message(&s.id, OWNER, user_says("after the fact"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
    }

    #[tokio::test]
    async fn stale_write_is_a_conflict() {
        let f = fixture(vec![]).await;
        let s = f.create().await;
        f.sessions.touch(&s.id);

        // The service reloads, so its own writes succeed against the new version.
        let s = f
            .service
            .append_planning_message(&s.id, OWNER, user_says("still fine"))
            .await
            .unwrap();
        assert_eq!(s.version, 3);

        // A write based on an old snapshot does not.
        let err = f.sessions.save(&s, 1).await.unwrap_err();
        let err = SessionError::from(err);
        assert!(matches!(err, SessionError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let f = fixture(vec![]).await;
        let s = f.create().await;

        let err = f.service.delete_session(&s.id, "intruder").await.unwrap_err();
        assert!(matches!(err, SessionError::Forbidden));

        f.service.delete_session(&s.id, OWNER).await.unwrap();
        let err = f.service.get_session(&s.id, OWNER).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound));
    }
}
