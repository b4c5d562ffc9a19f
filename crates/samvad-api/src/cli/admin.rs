//! User, token, wallet, and rate administration commands.

use samvad_core::ledger::Ledger;
use samvad_types::connection::PartyRole;
use uuid::Uuid;

use crate::state::AppState;

/// `samvad user add <phone> <name> [--provider]`
pub async fn add_user(
    state: &AppState,
    phone: &str,
    name: &str,
    provider: bool,
    json: bool,
) -> anyhow::Result<()> {
    let role = if provider {
        PartyRole::Provider
    } else {
        PartyRole::Customer
    };
    let user = state.users.create(phone, name, role).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "id": user.id,
                "phone_number": user.phone_number,
                "display_name": user.display_name,
                "role": user.role.to_string(),
            }))?
        );
    } else {
        println!();
        println!(
            "  {} Registered {} '{}'",
            console::style("✓").green(),
            user.role,
            console::style(&user.display_name).cyan()
        );
        println!("  id: {}", console::style(user.id).dim());
        println!();
    }
    Ok(())
}

/// `samvad user token <user_id>`
pub async fn issue_token(state: &AppState, user_id: &Uuid, json: bool) -> anyhow::Result<()> {
    let user = state
        .users
        .get(user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no user with id {user_id}"))?;
    let token = state.auth.issue(&user.id).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "user_id": user.id,
                "token": token,
            }))?
        );
    } else {
        println!();
        println!(
            "  {} Token for '{}' (save this -- it won't be shown again):",
            console::style("🔑").bold(),
            console::style(&user.display_name).cyan()
        );
        println!();
        println!("  {}", console::style(&token).yellow().bold());
        println!();
    }
    Ok(())
}

/// `samvad wallet topup <user_id> <amount>`
pub async fn topup_wallet(
    state: &AppState,
    user_id: &Uuid,
    amount: i64,
    json: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(amount > 0, "top-up amount must be positive");
    let balance = state.ledger.credit(user_id, amount).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "user_id": user_id,
                "balance": balance,
            }))?
        );
    } else {
        println!(
            "  {} Wallet credited; balance is now {}",
            console::style("✓").green(),
            console::style(balance).cyan()
        );
    }
    Ok(())
}

/// `samvad wallet balance <user_id>`
pub async fn show_balance(state: &AppState, user_id: &Uuid, json: bool) -> anyhow::Result<()> {
    let balance = state.ledger.balance(user_id).await.unwrap_or(0);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "user_id": user_id,
                "balance": balance,
            }))?
        );
    } else {
        println!("  Balance: {}", console::style(balance).cyan());
    }
    Ok(())
}

/// `samvad rate <provider_id> <rate>`
pub async fn set_rate(
    state: &AppState,
    provider_id: &Uuid,
    rate: i64,
    json: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(rate > 0, "rate must be positive");
    let provider = state
        .users
        .get(provider_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no user with id {provider_id}"))?;
    anyhow::ensure!(
        provider.role == PartyRole::Provider,
        "user {provider_id} is not a provider"
    );

    state.catalogue.set_chat_rate(provider_id, rate).await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "provider_id": provider_id,
                "chat_rate": rate,
            }))?
        );
    } else {
        println!(
            "  {} Chat rate for '{}' set to {} per minute",
            console::style("✓").green(),
            console::style(&provider.display_name).cyan(),
            rate
        );
    }
    Ok(())
}
