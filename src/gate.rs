//! Session access gate. A SHA-256 digest comparison that keeps casual
//! visitors out; it is not a security boundary.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::logging;

/// SHA-256 of the deployment password.
pub const DEFAULT_PASSWORD_HASH: &str =
    "2b1f4d4bcd4094888b2ed7ef69946327bea0e6b7567abd68a6e0f0c56410612b";
pub const SESSION_KEY: &str = "awp_authenticated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    Empty,
    Incorrect,
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::Empty => f.write_str("Please enter a password"),
            GateError::Incorrect => f.write_str("Incorrect password. Please try again."),
        }
    }
}

impl std::error::Error for GateError {}

pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct AccessGate {
    expected_hash: String,
}

impl AccessGate {
    pub fn new(expected_hash: &str) -> Self {
        Self {
            expected_hash: expected_hash.trim().to_ascii_lowercase(),
        }
    }

    pub fn verify(&self, password: &str) -> Result<(), GateError> {
        if password.is_empty() {
            return Err(GateError::Empty);
        }
        let ok = hash_password(password) == self.expected_hash;
        logging::log_gate(ok);
        if ok {
            Ok(())
        } else {
            Err(GateError::Incorrect)
        }
    }
}

/// The session flag, kept as a marker file so it spans CLI invocations.
pub struct SessionFlag {
    path: PathBuf,
}

impl SessionFlag {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(SESSION_KEY),
        }
    }

    pub fn is_set(&self) -> bool {
        fs::read_to_string(&self.path)
            .map(|v| v.trim() == "true")
            .unwrap_or(false)
    }

    pub fn set(&self) -> io::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&self.path, "true")
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
