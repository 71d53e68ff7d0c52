//! Credential records and password verification.
//!
//! A record is `iterations:base64(salt):base64(hash)` where the hash is
//! PBKDF2-HMAC-SHA256 of the password. Records are generated offline by the
//! `hash` subcommand and compared on every login attempt; nothing derived
//! from the password is ever persisted per-session.

use anyhow::{Context, Result};
use base64ct::{Base64, Encoding};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use thiserror::Error;

pub const DEFAULT_ITERATIONS: u32 = 100_000;
const SALT_LENGTH: usize = 32;
const KEY_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected iterations:salt:hash")]
    Format,
    #[error("invalid iteration count")]
    Iterations,
    #[error("invalid base64 encoding")]
    Base64,
}

impl FromStr for CredentialRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let iterations = parts.next().ok_or(ParseError::Format)?;
        let salt = parts.next().ok_or(ParseError::Format)?;
        let hash = parts.next().ok_or(ParseError::Format)?;
        if parts.next().is_some() {
            return Err(ParseError::Format);
        }

        let iterations: u32 = iterations.parse().map_err(|_| ParseError::Iterations)?;
        if iterations == 0 {
            return Err(ParseError::Iterations);
        }
        let salt = Base64::decode_vec(salt).map_err(|_| ParseError::Base64)?;
        let hash = Base64::decode_vec(hash).map_err(|_| ParseError::Base64)?;
        if salt.is_empty() || hash.is_empty() {
            return Err(ParseError::Format);
        }

        Ok(Self {
            iterations,
            salt,
            hash,
        })
    }
}

impl fmt::Display for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.iterations,
            Base64::encode_string(&self.salt),
            Base64::encode_string(&self.hash)
        )
    }
}

impl CredentialRecord {
    /// Derive a fresh record for `password` with a random 32-byte salt.
    ///
    /// # Errors
    ///
    /// Returns an error if the system RNG fails to produce a salt.
    pub fn generate(password: &str, iterations: u32) -> Result<Self> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt)
            .context("failed to generate credential salt")?;

        let mut hash = vec![0u8; KEY_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

        Ok(Self {
            iterations,
            salt: salt.to_vec(),
            hash,
        })
    }

    /// Compare `password` against the stored hash in constant time.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        let mut derived = vec![0u8; self.hash.len()];
        pbkdf2_hmac::<Sha256>(
            password.as_bytes(),
            &self.salt,
            self.iterations,
            &mut derived,
        );
        constant_time_eq(&derived, &self.hash)
    }

    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

/// Constant-time byte comparison; length mismatches return false without
/// leaking where the inputs diverge.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
