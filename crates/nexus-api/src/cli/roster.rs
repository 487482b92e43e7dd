//! Roster CLI commands: create bots and teams, manage membership, list.

use anyhow::{Context, Result, bail};
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use nexus_core::repository::roster::RosterRepository;
use nexus_types::bot::{Bot, BotId, CreateBotRequest, Team, TeamId};
use nexus_types::config::ExecutionSettings;
use nexus_types::error::RepositoryError;
use nexus_types::session::SessionPhase;

use crate::state::AppState;

/// Turn a create request into a bot owned by `user_id`, filling unset
/// fields from the execution defaults.
pub fn build_bot(
    user_id: &str,
    request: CreateBotRequest,
    defaults: &ExecutionSettings,
) -> Result<Bot> {
    let name = request.name.trim();
    if name.is_empty() {
        bail!("bot name cannot be empty");
    }
    let model = request.model.trim();
    if model.is_empty() {
        bail!("model cannot be empty");
    }
    let temperature = request.temperature.unwrap_or(defaults.default_temperature);
    if !(0.0..=2.0).contains(&temperature) {
        bail!("temperature must be between 0.0 and 2.0, got {temperature}");
    }
    let max_tokens = request.max_tokens.unwrap_or(defaults.default_max_tokens);
    if max_tokens == 0 {
        bail!("max tokens must be positive");
    }

    let now = Utc::now();
    Ok(Bot {
        id: BotId::new(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        description: request.description,
        model: model.to_string(),
        system_prompt: request.system_prompt.filter(|p| !p.trim().is_empty()),
        temperature,
        max_tokens,
        role: request.role,
        created_at: now,
        updated_at: now,
    })
}

pub async fn create_bot(
    state: &AppState,
    user_id: &str,
    request: CreateBotRequest,
    json: bool,
) -> Result<()> {
    let bot = build_bot(user_id, request, &state.config.execution)?;
    let bot = state.session_service.roster().create_bot(&bot).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bot)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Bot created successfully!",
        style("✓").green().bold()
    );
    println!();
    println!("  {}  {}", style("Name:").bold(), style(&bot.name).cyan());
    println!("  {}  {}", style("Model:").bold(), bot.model);
    println!(
        "  {}  {:.1} / {} tokens",
        style("Sampling:").bold(),
        bot.temperature,
        bot.max_tokens
    );
    println!("  {}  {}", style("ID:").bold(), style(bot.id.to_string()).dim());
    println!();
    Ok(())
}

pub async fn create_team(
    state: &AppState,
    user_id: &str,
    name: String,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("team name cannot be empty");
    }

    let now = Utc::now();
    let team = Team {
        id: TeamId::new(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        description,
        created_at: now,
        updated_at: now,
    };
    let team = state.session_service.roster().create_team(&team).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&team)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Team {} created",
        style("✓").green().bold(),
        style(&team.name).cyan()
    );
    println!("  {}  {}", style("ID:").bold(), style(team.id.to_string()).dim());
    println!(
        "  {} Add bots with: {}",
        style("•").dim(),
        style(format!("nexus team add-bot {} <bot-id>", team.id)).yellow()
    );
    println!();
    Ok(())
}

pub async fn add_team_bot(
    state: &AppState,
    user_id: &str,
    team_id: &str,
    bot_id: &str,
    json: bool,
) -> Result<()> {
    let team_id: TeamId = team_id
        .parse()
        .with_context(|| format!("invalid team id '{team_id}'"))?;
    let bot_id: BotId = bot_id
        .parse()
        .with_context(|| format!("invalid bot id '{bot_id}'"))?;

    let roster = state.session_service.roster();
    let team = roster
        .get_team(&team_id)
        .await?
        .filter(|t| t.user_id == user_id)
        .with_context(|| format!("team '{team_id}' not found"))?;
    let bot = roster
        .get_bot(&bot_id)
        .await?
        .filter(|b| b.user_id == user_id)
        .with_context(|| format!("bot '{bot_id}' not found"))?;

    match roster.add_team_member(&team.id, &bot.id).await {
        Ok(()) => {}
        Err(RepositoryError::Conflict(_)) => {
            bail!("{} is already a member of {}", bot.name, team.name)
        }
        Err(e) => return Err(e.into()),
    }

    if json {
        println!(
            "{}",
            serde_json::json!({"teamId": team.id, "botId": bot.id, "added": true})
        );
    } else {
        println!();
        println!(
            "  {} Added {} to {}",
            style("✓").green().bold(),
            style(&bot.name).cyan(),
            style(&team.name).cyan()
        );
        println!();
    }
    Ok(())
}

pub async fn remove_team_bot(
    state: &AppState,
    user_id: &str,
    team_id: &str,
    bot_id: &str,
    json: bool,
) -> Result<()> {
    let team_id: TeamId = team_id
        .parse()
        .with_context(|| format!("invalid team id '{team_id}'"))?;
    let bot_id: BotId = bot_id
        .parse()
        .with_context(|| format!("invalid bot id '{bot_id}'"))?;

    let roster = state.session_service.roster();
    let team = roster
        .get_team(&team_id)
        .await?
        .filter(|t| t.user_id == user_id)
        .with_context(|| format!("team '{team_id}' not found"))?;

    match roster.remove_team_member(&team.id, &bot_id).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => {
            bail!("bot '{bot_id}' is not a member of {}", team.name)
        }
        Err(e) => return Err(e.into()),
    }

    if json {
        println!(
            "{}",
            serde_json::json!({"teamId": team.id, "botId": bot_id, "removed": true})
        );
    } else {
        println!();
        println!(
            "  {} Removed {} from {}",
            style("✓").green().bold(),
            style(bot_id.to_string()).dim(),
            style(&team.name).cyan()
        );
        println!();
    }
    Ok(())
}

pub async fn list_bots(state: &AppState, user_id: &str, json: bool) -> Result<()> {
    let bots = state.session_service.roster().list_bots(user_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bots)?);
        return Ok(());
    }

    if bots.is_empty() {
        println!();
        println!(
            "  {} No bots found. Create one with: {}",
            style("i").blue().bold(),
            style("nexus create bot --name <name>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Role").fg(Color::White),
        Cell::new("Temp").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for bot in &bots {
        table.add_row(vec![
            Cell::new(&bot.name).fg(Color::Cyan),
            Cell::new(&bot.model),
            Cell::new(bot.role.as_deref().unwrap_or("-")),
            Cell::new(format!("{:.1}", bot.temperature)),
            Cell::new(bot.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} bot{}",
        style(bots.len()).bold(),
        if bots.len() == 1 { "" } else { "s" }
    );
    println!();
    Ok(())
}

pub async fn list_sessions(
    state: &AppState,
    user_id: &str,
    team_id: &str,
    json: bool,
) -> Result<()> {
    let team_id: TeamId = team_id
        .parse()
        .with_context(|| format!("invalid team id '{team_id}'"))?;
    let sessions = state
        .session_service
        .list_team_sessions(&team_id, user_id)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!("  {} No sessions for this team yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Title").fg(Color::White),
        Cell::new("Phase").fg(Color::White),
        Cell::new("Tasks").fg(Color::White),
        Cell::new("Created").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(&session.title).fg(Color::Cyan),
            phase_cell(session.phase),
            Cell::new(session.task_assignments.len()),
            Cell::new(session.created_at.format("%Y-%m-%d %H:%M").to_string())
                .fg(Color::DarkGrey),
            Cell::new(session.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

fn phase_cell(phase: SessionPhase) -> Cell {
    let color = match phase {
        SessionPhase::Planning => Color::Yellow,
        SessionPhase::Execution => Color::Blue,
        SessionPhase::Review => Color::Magenta,
        SessionPhase::Completed => Color::Green,
    };
    Cell::new(phase.to_string()).fg(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;

    fn request(name: &str) -> CreateBotRequest {
        CreateBotRequest {
            name: name.to_string(),
            model: "gpt-4o-mini".to_string(),
            description: None,
            system_prompt: None,
            temperature: None,
            max_tokens: None,
            role: None,
        }
    }

    #[test]
    fn test_build_bot_applies_defaults() {
        let defaults = ExecutionSettings::default();
        let bot = build_bot("alice", request("  Scribe "), &defaults).unwrap();
        assert_eq!(bot.name, "Scribe");
        assert_eq!(bot.user_id, "alice");
        assert_eq!(bot.temperature, defaults.default_temperature);
        assert_eq!(bot.max_tokens, defaults.default_max_tokens);
    }

    #[test]
    fn test_build_bot_drops_blank_system_prompt() {
        let mut req = request("Scribe");
        req.system_prompt = Some("   ".to_string());
        let bot = build_bot("alice", req, &ExecutionSettings::default()).unwrap();
        assert!(bot.system_prompt.is_none());
    }

    #[tokio::test]
    async fn test_remove_team_bot_drops_membership_only() {
        let (state, _dir) = test_state().await;
        let roster = state.session_service.roster();
        let bot = build_bot("alice", request("Scribe"), &ExecutionSettings::default()).unwrap();
        let bot = roster.create_bot(&bot).await.unwrap();
        let now = Utc::now();
        let team = Team {
            id: TeamId::new(),
            user_id: "alice".to_string(),
            name: "Writers".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let team = roster.create_team(&team).await.unwrap();
        roster.add_team_member(&team.id, &bot.id).await.unwrap();

        let team_id = team.id.to_string();
        let bot_id = bot.id.to_string();
        // Someone else's team looks missing
        assert!(remove_team_bot(&state, "mallory", &team_id, &bot_id, true).await.is_err());

        remove_team_bot(&state, "alice", &team_id, &bot_id, true).await.unwrap();
        assert!(roster.get_team_bots(&team.id).await.unwrap().is_empty());
        assert!(roster.get_bot(&bot.id).await.unwrap().is_some());

        let err = remove_team_bot(&state, "alice", &team_id, &bot_id, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not a member"));
    }

    #[test]
    fn test_build_bot_rejects_bad_input() {
        let defaults = ExecutionSettings::default();
        assert!(build_bot("alice", request(" "), &defaults).is_err());

        let mut hot = request("Scribe");
        hot.temperature = Some(2.5);
        assert!(build_bot("alice", hot, &defaults).is_err());

        let mut capped = request("Scribe");
        capped.max_tokens = Some(0);
        assert!(build_bot("alice", capped, &defaults).is_err());
    }
}
