use std::path::PathBuf;

use crate::gate::DEFAULT_PASSWORD_HASH;

#[derive(Clone, Debug)]
pub struct Config {
    pub scenarios_source: String,
    pub setup_source: String,
    pub breakdown_source: String,
    pub password_hash: String,
    /// Lets scripted runs pass the gate without the login step.
    pub password: Option<String>,
    pub session_dir: PathBuf,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            scenarios_source: env_or("TTC_SCENARIOS", "data/ttc-scenarios-table.json"),
            setup_source: env_or("TTC_SETUP_TEMPLATE", "data/ttc-setup-sequence-2lane.json"),
            breakdown_source: env_or("TTC_BREAKDOWN_TEMPLATE", "data/ttc-breakdown-sequence.json"),
            password_hash: env_or("TTC_PASSWORD_HASH", DEFAULT_PASSWORD_HASH),
            password: std::env::var("TTC_PASSWORD").ok().filter(|p| !p.is_empty()),
            session_dir: std::env::var("TTC_SESSION_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir().join("ttcplan-session")),
        }
    }
}

/// Load status of one static feed. `Failed` is terminal for the session.
#[derive(Debug, Clone)]
pub enum DataSlot<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> DataSlot<T> {
    /// Record a load outcome. A slot only leaves `Pending` once.
    pub fn settle<E: std::fmt::Display>(&mut self, result: Result<T, E>) -> bool {
        if !matches!(self, DataSlot::Pending) {
            return false;
        }
        *self = match result {
            Ok(v) => DataSlot::Ready(v),
            Err(e) => DataSlot::Failed(e.to_string()),
        };
        true
    }
}

impl<T> Default for DataSlot<T> {
    fn default() -> Self {
        DataSlot::Pending
    }
}
