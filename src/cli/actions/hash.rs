use crate::api::handlers::auth::credentials::CredentialRecord;
use crate::cli::actions::Action;
use anyhow::{Context, Result};
use rand::{rngs::OsRng, RngCore};
use secrecy::ExposeSecret;
use std::fmt::Write;

/// Handle the hash action: derive a credential record offline and print it
/// together with a fresh signing-key suggestion.
pub fn handle(action: Action) -> Result<()> {
    let Action::Hash {
        password,
        iterations,
    } = action
    else {
        return Ok(());
    };

    let record = CredentialRecord::generate(password.expose_secret(), iterations)?;

    // Self-check before the operator pastes the record into a deployment.
    if !record.verify(password.expose_secret()) {
        anyhow::bail!("generated record failed self-verification");
    }

    println!("Credential record (set as AUTH_PASSWORD_HASH):");
    println!("{record}");
    println!();
    println!("Suggested JWT_SECRET:");
    println!("{}", generate_signing_key()?);

    Ok(())
}

fn generate_signing_key() -> Result<String> {
    let mut bytes = [0u8; 64];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate signing key")?;

    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Infallible for String, but write! is the fmt API.
        let _ = write!(hex, "{byte:02x}");
    }
    Ok(hex)
}
