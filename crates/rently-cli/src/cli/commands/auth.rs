//! Auth command handlers.

use anyhow::Result;
use rently_core::auth::{AuthState, Credentials, SignupForm};
use rently_core::config::paths;

use super::{Controller, prompt};

pub async fn login(
    controller: &mut Controller,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    if let Some(user) = controller.current_user() {
        println!("Already logged in as {}.", user.username);
        println!("Run 'rently logout' first to switch accounts.");
        return Ok(());
    }

    let username = match username {
        Some(username) => username,
        None => prompt("Username: ")?,
    };
    let password = match password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };

    match controller.login(Credentials::new(username, password)).await {
        Ok(user) => {
            println!("✓ Logged in as {}", user.username);
            println!("  Session saved to: {}", paths::session_path().display());
            Ok(())
        }
        Err(e) => anyhow::bail!("{e}"),
    }
}

pub struct SignupArgs {
    pub username: String,
    pub email: String,
    pub password: Option<String>,
    pub confirm: Option<String>,
    pub phone: Option<String>,
}

pub async fn signup(controller: &mut Controller, args: SignupArgs) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => prompt("Password: ")?,
    };
    let confirm = match args.confirm {
        Some(confirm) => confirm,
        None => prompt("Confirm password: ")?,
    };

    // Checked before anything goes over the wire.
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }

    let form = SignupForm {
        username: args.username,
        email: args.email,
        password,
        phone_number: args.phone,
    };

    match controller.signup(form).await {
        Ok(user) => {
            println!("✓ Account created. Logged in as {}", user.username);
            println!("  Session saved to: {}", paths::session_path().display());
            Ok(())
        }
        Err(e) => anyhow::bail!("{e}"),
    }
}

pub fn logout(controller: &mut Controller) -> Result<()> {
    if !controller.state().is_authenticated() {
        println!("Not logged in (no session found).");
        return Ok(());
    }

    controller.logout()?;
    println!("✓ Logged out");
    println!("  Session removed from: {}", paths::session_path().display());
    Ok(())
}

pub fn whoami(controller: &Controller) -> Result<()> {
    match controller.state() {
        AuthState::Authenticated { user: Some(user) } => {
            println!("{} <{}> (id {})", user.username, user.email, user.id);
        }
        AuthState::Authenticated { user: None } => {
            println!("Logged in (user details unavailable; run 'rently profile show').");
        }
        _ => println!("Not logged in."),
    }
    Ok(())
}
