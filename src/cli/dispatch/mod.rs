//! Command-line argument dispatch.
//!
//! Maps validated CLI matches to the action the binary executes: the server
//! with its full configuration, or the offline credential hash tool.

use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to an action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    if let Some(sub) = matches.subcommand_matches("hash") {
        let password = sub
            .get_one::<String>("password")
            .cloned()
            .context("missing required argument: password")?;
        let iterations = sub.get_one::<u32>("iterations").copied().unwrap_or(100_000);
        return Ok(Action::Hash {
            password: SecretString::from(password),
            iterations,
        });
    }

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches.get_one::<String>("dsn").cloned(),
        jwt_secret: matches
            .get_one::<String>("jwt-secret")
            .cloned()
            .map(SecretString::from),
        password_hash: matches.get_one::<String>("password-hash").cloned(),
        password: matches
            .get_one::<String>("password")
            .cloned()
            .map(SecretString::from),
        frontend_url: matches
            .get_one::<String>("frontend-url")
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".to_string()),
    })
}
