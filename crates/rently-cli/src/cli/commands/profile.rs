//! Profile command handlers.

use anyhow::Result;
use rently_core::auth::AuthError;

use super::{Controller, ensure_signed_in};

const SESSION_EXPIRED_MSG: &str = "Session expired. Please run 'rently login'.";

pub async fn show(controller: &mut Controller) -> Result<()> {
    ensure_signed_in(controller)?;

    match controller.fetch_profile().await {
        Ok(profile) => {
            println!("Username: {}", profile.username);
            println!("Email:    {}", profile.email);
            println!(
                "Phone:    {}",
                profile.phone_number.as_deref().unwrap_or("—")
            );
            if let Some(created) = profile.created_at {
                println!("Member since: {}", created.format("%Y-%m-%d"));
            }
            Ok(())
        }
        Err(AuthError::SessionExpired) => anyhow::bail!(SESSION_EXPIRED_MSG),
        Err(e) => anyhow::bail!("{e}"),
    }
}

pub async fn set_phone(controller: &mut Controller, phone: &str) -> Result<()> {
    ensure_signed_in(controller)?;

    match controller.update_phone_number(phone).await {
        Ok(user) => {
            println!("✓ Profile updated for {}", user.username);
            Ok(())
        }
        Err(AuthError::SessionExpired) => anyhow::bail!(SESSION_EXPIRED_MSG),
        Err(e) => anyhow::bail!("{e}"),
    }
}
