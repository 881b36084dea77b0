//! Command handlers.

pub mod auth;
pub mod config;
pub mod listings;
pub mod locations;
pub mod profile;

use std::io::{self, BufRead, Write};

use anyhow::Result;
use rently_core::auth::AuthController;
use rently_core::guard::{self, RouteDecision};
use rently_core::session::FsSessionStore;

/// The process-wide controller type used by all command handlers.
pub type Controller = AuthController<FsSessionStore>;

/// Gate for auth-required commands; the terminal analogue of a route
/// guard redirecting to the login view.
pub(crate) fn ensure_signed_in(controller: &Controller) -> Result<()> {
    match guard::can_enter(true, controller.state()) {
        RouteDecision::Allow => Ok(()),
        RouteDecision::Defer => anyhow::bail!("Session restore has not settled; try again"),
        RouteDecision::Redirect(_) => {
            anyhow::bail!("Not logged in. Run 'rently login' first.")
        }
    }
}

/// Reads one trimmed line from stdin after printing a label.
pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
