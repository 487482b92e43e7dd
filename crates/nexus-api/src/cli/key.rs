//! API key CLI commands.

use anyhow::{Result, bail};
use console::style;

use crate::http::extractors::auth::create_api_key;
use crate::state::AppState;

pub async fn create_key(state: &AppState, user_id: &str, name: &str, json: bool) -> Result<()> {
    if user_id.trim().is_empty() {
        bail!("user cannot be empty");
    }
    let key = create_api_key(&state.db_pool, user_id, name).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"user": user_id, "name": name, "key": key})
        );
        return Ok(());
    }

    print_new_key(user_id, &key);
    Ok(())
}

/// Print a freshly generated key with the show-once warning.
pub fn print_new_key(user_id: &str, key: &str) {
    println!();
    println!(
        "  {} API key for {} (save this -- it won't be shown again):",
        style("🔑").bold(),
        style(user_id).cyan()
    );
    println!();
    println!("  {}", style(key).yellow().bold());
    println!();
}
