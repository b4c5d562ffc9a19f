//! Store status command.

use samvad_core::repository::SessionRepository;

use crate::state::AppState;

/// `samvad status` - counts and data directory.
pub async fn status(state: &AppState, json: bool) -> anyhow::Result<()> {
    let users = state.users.count().await?;
    let sessions = state.sessions.count().await?;
    let messages: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
        .fetch_one(&state.db_pool.reader)
        .await?;
    let running = state.registry.running_sessions();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "data_dir": state.data_dir.display().to_string(),
                "users": users,
                "sessions": sessions,
                "messages": messages.0,
                "running_sessions": running,
            }))?
        );
    } else {
        println!();
        println!("  {} Samvad status", console::style("⚡").bold());
        println!();
        println!("  data dir:  {}", console::style(state.data_dir.display()).dim());
        println!("  users:     {users}");
        println!("  sessions:  {sessions} ({running} live in this process)");
        println!("  messages:  {}", messages.0);
        println!();
    }
    Ok(())
}
