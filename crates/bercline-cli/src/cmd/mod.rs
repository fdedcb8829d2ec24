//! Subcommand implementations.

use std::io::Write;

use anyhow::{Context, Result};
use bercline_core::Session;

pub mod bulletins;
pub mod extract;
pub mod registry;
pub mod report;

/// Build a session from `BERC_TOKEN` or an interactive prompt.
///
/// The portal token is short-lived and scraped from a logged-in browser
/// session, so it is supplied at process start, never stored in config.
pub fn acquire_session(origin: Option<&str>) -> Result<Session> {
    let token = match std::env::var("BERC_TOKEN") {
        Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
        _ => {
            eprint!("Enter the portal bearer token: ");
            std::io::stderr().flush().ok();
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .context("Cannot read token from stdin")?;
            let token = line.trim().to_string();
            anyhow::ensure!(!token.is_empty(), "A bearer token is required");
            token
        }
    };
    let mut session = Session::new(token);
    if let Some(origin) = origin {
        session = session.with_origin(origin);
    }
    Ok(session)
}
