//! Prompt builders for collaboration sessions.
//!
//! Two prompts exist: the chained execution prompt, which hands each bot the
//! brief, its own task, and every earlier teammate's output; and the
//! planning question prompt, which asks a bot for clarifying questions.

use nexus_types::bot::Bot;
use nexus_types::llm::Message;

/// One earlier teammate's result, as shown to later bots.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorContribution {
    pub bot_name: String,
    pub task: String,
    /// Sanitized output, or `"⚠️ Error: {message}"` for a failed task.
    pub output: String,
}

/// Build the messages for one execution-phase task.
///
/// Layout of the user message:
/// ```text
/// PROJECT BRIEF:
/// {brief}
///
/// YOUR SPECIFIC TASK:
/// {task}
///
/// PREVIOUS TEAM MEMBERS' WORK: ...   (or the first-member notice)
/// ```
///
/// A blank system prompt is omitted rather than sent empty.
pub fn build_chained_messages(
    brief: &str,
    system_prompt: Option<&str>,
    task: &str,
    prior: &[PriorContribution],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);

    if let Some(system) = system_prompt.filter(|s| !s.trim().is_empty()) {
        messages.push(Message::system(system));
    }

    let mut content = format!("PROJECT BRIEF:\n{brief}\n\nYOUR SPECIFIC TASK:\n{task}\n\n");

    if prior.is_empty() {
        content.push_str(
            "You are the first team member to work on this project. \
             Complete your task to set the foundation for the rest of the team.\n",
        );
    } else {
        content.push_str("PREVIOUS TEAM MEMBERS' WORK:\n");
        content.push_str(
            "(You can build upon, reference, or incorporate these outputs in your response)\n\n",
        );
        for (i, contribution) in prior.iter().enumerate() {
            content.push_str(&format!(
                "{}. {} ({}):\n{}\n\n",
                i + 1,
                contribution.bot_name,
                contribution.task,
                contribution.output
            ));
        }
        content.push_str(
            "---\n\nNow, complete YOUR task while considering the work done by your \
             teammates above. You may reference, build upon, or synthesize their \
             contributions as needed.\n",
        );
    }

    messages.push(Message::user(content));
    messages
}

/// Build the messages asking a bot for clarifying questions about a brief.
pub fn build_question_messages(bot: &Bot, brief: &str) -> Vec<Message> {
    let system = bot
        .system_prompt
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| default_system_prompt(&bot.name));

    vec![
        Message::system(system),
        Message::user(format!(
            "PROJECT BRIEF:\n{brief}\n\nYou are part of a team working on this project. \
             Based on the brief, what clarifying questions do you have? Ask 1-2 specific \
             questions that will help you understand your role and what's expected. \
             Keep it concise."
        )),
    ]
}

/// System prompt for a bot that has none of its own.
pub fn default_system_prompt(bot_name: &str) -> String {
    format!("You are {bot_name}, a helpful AI assistant working on a team project.")
}

/// Question used when the provider fails or returns nothing.
pub fn fallback_question(bot_name: &str) -> String {
    format!(
        "As {bot_name}, I'd like to know more about the specific requirements and \
         expectations for my role in this project."
    )
}
