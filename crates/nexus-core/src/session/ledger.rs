//! Review-phase suggestions and their approval status.
//!
//! Approval is advisory: it never touches outputs or the phase.

use chrono::Utc;
use uuid::Uuid;

use nexus_types::error::SessionError;
use nexus_types::session::{NewSuggestion, SessionPhase, Suggestion, SuggestionStatus, TeamSession};

use super::machine::require_phase;

/// Fresh suggestion identifier, `sugg_` followed by a v7 UUID.
pub fn new_suggestion_id() -> String {
    format!("sugg_{}", Uuid::now_v7().simple())
}

/// Record a pending suggestion. Review phase only.
pub fn add_suggestion(
    session: &mut TeamSession,
    suggestion: NewSuggestion,
) -> Result<Suggestion, SessionError> {
    require_phase(session, SessionPhase::Review)?;
    if suggestion.content.trim().is_empty() {
        return Err(SessionError::Validation("suggestion content cannot be empty".to_string()));
    }

    let now = Utc::now();
    let suggestion = Suggestion {
        id: new_suggestion_id(),
        bot_id: suggestion.bot_id,
        bot_name: suggestion.bot_name,
        kind: suggestion.kind,
        target: suggestion.target,
        content: suggestion.content,
        status: SuggestionStatus::Pending,
        timestamp: now,
    };
    session.suggestions.push(suggestion.clone());
    session.updated_at = now;
    Ok(suggestion)
}

/// Overwrite a suggestion's status, in any phase.
///
/// Setting the status it already has is a no-op.
pub fn set_status(
    session: &mut TeamSession,
    suggestion_id: &str,
    status: SuggestionStatus,
) -> Result<(), SessionError> {
    let suggestion = session
        .suggestions
        .iter_mut()
        .find(|s| s.id == suggestion_id)
        .ok_or_else(|| SessionError::SuggestionNotFound(suggestion_id.to_string()))?;
    if suggestion.status != status {
        suggestion.status = status;
        session.updated_at = Utc::now();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_types::bot::{BotId, TeamId};
    use nexus_types::session::SuggestionKind;

    fn review_session() -> TeamSession {
        let mut s = TeamSession::new(
            TeamId::new(),
            "user-1".to_string(),
            "Launch".to_string(),
            "Brief".to_string(),
        );
        s.phase = SessionPhase::Review;
        s
    }

    fn pending_count(session: &TeamSession) -> usize {
        session
            .suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Pending)
            .count()
    }

    fn critique(content: &str) -> NewSuggestion {
        NewSuggestion {
            bot_id: BotId::new(),
            bot_name: "Critic".to_string(),
            kind: SuggestionKind::Critique,
            target: Some("Ada".to_string()),
            content: content.to_string(),
        }
    }

    #[test]
    fn new_suggestions_are_pending_with_unique_ids() {
        let mut s = review_session();
        let a = add_suggestion(&mut s, critique("Tighten the intro")).unwrap();
        let b = add_suggestion(&mut s, critique("Cite sources")).unwrap();
        assert!(a.id.starts_with("sugg_"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.status, SuggestionStatus::Pending);
        assert_eq!(pending_count(&s), 2);
    }

    #[test]
    fn suggestions_only_in_review() {
        let mut s = review_session();
        s.phase = SessionPhase::Execution;
        let err = add_suggestion(&mut s, critique("Too soon")).unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
    }

    #[test]
    fn status_can_change_after_completion() {
        let mut s = review_session();
        let added = add_suggestion(&mut s, critique("Tighten the intro")).unwrap();
        s.phase = SessionPhase::Completed;

        set_status(&mut s, &added.id, SuggestionStatus::Approved).unwrap();
        set_status(&mut s, &added.id, SuggestionStatus::Approved).unwrap();
        assert_eq!(s.suggestions[0].status, SuggestionStatus::Approved);

        set_status(&mut s, &added.id, SuggestionStatus::Rejected).unwrap();
        assert_eq!(s.suggestions[0].status, SuggestionStatus::Rejected);
        assert_eq!(pending_count(&s), 0);
    }

    #[test]
    fn approval_changes_only_the_status() {
        let mut s = review_session();
        let added = add_suggestion(&mut s, critique("Tighten the intro")).unwrap();
        let other = add_suggestion(&mut s, critique("Cite sources")).unwrap();
        let phase = s.phase;

        set_status(&mut s, &added.id, SuggestionStatus::Approved).unwrap();

        assert_eq!(
            s.suggestions[0],
            Suggestion {
                status: SuggestionStatus::Approved,
                ..added
            }
        );
        assert_eq!(s.suggestions[1], other);
        assert_eq!(s.phase, phase);
        assert!(s.execution_outputs.is_empty());
    }

    #[test]
    fn unknown_suggestion_is_reported() {
        let mut s = review_session();
        let err = set_status(&mut s, "sugg_missing", SuggestionStatus::Approved).unwrap_err();
        assert!(matches!(err, SessionError::SuggestionNotFound(id) if id == "sugg_missing"));
    }
}
