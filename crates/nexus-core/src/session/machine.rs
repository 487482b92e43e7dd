//! Pure phase transitions for a [`TeamSession`].
//!
//! Every function checks the phase first and leaves the session untouched
//! when it refuses. Persistence and ownership checks live in the service.

use chrono::Utc;

use nexus_types::error::SessionError;
use nexus_types::session::{
    DEFAULT_TASK, ExecutionOutput, NewPhaseMessage, PhaseMessage, SessionPhase, TaskAssignment,
    TeamSession,
};

pub(crate) fn require_phase(
    session: &TeamSession,
    expected: SessionPhase,
) -> Result<(), SessionError> {
    if session.phase == expected {
        Ok(())
    } else {
        Err(SessionError::invalid_phase(
            session.phase,
            format!("session not in {expected} phase"),
        ))
    }
}

fn stamp(message: NewPhaseMessage) -> Result<PhaseMessage, SessionError> {
    if message.content.trim().is_empty() {
        return Err(SessionError::Validation("message content cannot be empty".to_string()));
    }
    Ok(PhaseMessage {
        speaker: message.speaker,
        bot_id: message.bot_id,
        bot_name: message.bot_name,
        content: message.content,
        timestamp: Utc::now(),
    })
}

fn touch(session: &mut TeamSession) {
    session.updated_at = Utc::now();
}

/// Append to the planning discussion. Planning phase only.
pub fn append_planning_message(
    session: &mut TeamSession,
    message: NewPhaseMessage,
) -> Result<(), SessionError> {
    require_phase(session, SessionPhase::Planning)?;
    let message = stamp(message)?;
    session.planning_messages.push(message);
    touch(session);
    Ok(())
}

/// Append to the review discussion. Review phase only.
pub fn append_review_message(
    session: &mut TeamSession,
    message: NewPhaseMessage,
) -> Result<(), SessionError> {
    require_phase(session, SessionPhase::Review)?;
    let message = stamp(message)?;
    session.review_messages.push(message);
    touch(session);
    Ok(())
}

/// Store the task assignments and move to execution.
///
/// Blank tasks get [`DEFAULT_TASK`]. Assignments are written once: the
/// phase change makes a second call fail.
pub fn finalize_planning(
    session: &mut TeamSession,
    assignments: Vec<TaskAssignment>,
) -> Result<(), SessionError> {
    require_phase(session, SessionPhase::Planning)?;
    session.task_assignments = assignments
        .into_iter()
        .map(|mut a| {
            if a.task.trim().is_empty() {
                a.task = DEFAULT_TASK.to_string();
            }
            a
        })
        .collect();
    session.phase = SessionPhase::Execution;
    touch(session);
    Ok(())
}

/// Check that the session can run its execution phase.
pub fn ensure_executable(session: &TeamSession) -> Result<(), SessionError> {
    require_phase(session, SessionPhase::Execution)?;
    if session.task_assignments.is_empty() {
        return Err(SessionError::invalid_phase(
            session.phase,
            "no task assignments found",
        ));
    }
    Ok(())
}

/// Store execution outputs and move to review.
///
/// `outputs` must line up one-to-one with the task assignments.
pub fn record_execution(
    session: &mut TeamSession,
    outputs: Vec<ExecutionOutput>,
) -> Result<(), SessionError> {
    ensure_executable(session)?;
    let aligned = outputs.len() == session.task_assignments.len()
        && outputs
            .iter()
            .zip(&session.task_assignments)
            .all(|(o, a)| o.bot_id == a.bot_id && o.task == a.task);
    if !aligned {
        return Err(SessionError::Validation(
            "execution outputs do not match task assignments".to_string(),
        ));
    }
    session.execution_outputs = outputs;
    session.phase = SessionPhase::Review;
    touch(session);
    Ok(())
}

/// Mark the session completed from any phase.
///
/// Returns `false` when it already was, in which case nothing changes.
pub fn complete(session: &mut TeamSession) -> bool {
    if session.phase.is_terminal() {
        return false;
    }
    session.phase = SessionPhase::Completed;
    touch(session);
    true
}
