//! Consultation listing command.

use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use sqlx::Row;

use crate::state::AppState;

/// `samvad sessions [--limit N]` - newest consultations across all users.
pub async fn list_sessions(state: &AppState, limit: i64, json: bool) -> anyhow::Result<()> {
    let rows = sqlx::query(
        "SELECT id, customer_id, provider_id, status, billed_seconds, rate_per_minute, \
         end_reason, created_at FROM sessions ORDER BY created_at DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&state.db_pool.reader)
    .await?;

    if json {
        let sessions: Vec<serde_json::Value> = rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.get::<String, _>("id"),
                    "customer_id": r.get::<String, _>("customer_id"),
                    "provider_id": r.get::<String, _>("provider_id"),
                    "status": r.get::<String, _>("status"),
                    "billed_seconds": r.get::<i64, _>("billed_seconds"),
                    "rate_per_minute": r.get::<i64, _>("rate_per_minute"),
                    "end_reason": r.get::<Option<String>, _>("end_reason"),
                    "created_at": r.get::<String, _>("created_at"),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!("  No consultations yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["id", "status", "billed", "rate/min", "reason", "created"]);

    for row in &rows {
        let billed: i64 = row.get("billed_seconds");
        table.add_row(vec![
            Cell::new(row.get::<String, _>("id")),
            Cell::new(row.get::<String, _>("status")),
            Cell::new(format!("{}m{:02}s", billed / 60, billed % 60)),
            Cell::new(row.get::<i64, _>("rate_per_minute")),
            Cell::new(
                row.get::<Option<String>, _>("end_reason")
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::new(row.get::<String, _>("created_at")),
        ]);
    }

    println!("{table}");
    Ok(())
}
