//! Error taxonomy. Every variant carries a message fit to show the user.

use std::fmt;

use crate::scenario::{ControlMethod, RoadType, ScenarioKey};

/// Which static feed an error or readiness check refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Scenarios,
    Templates,
}

impl Feed {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feed::Scenarios => "scenarios",
            Feed::Templates => "templates",
        }
    }
}

/// Failures while fetching or decoding static data.
#[derive(Debug, Clone, PartialEq)]
pub enum DataError {
    Source(String),
    Io { source: String, message: String },
    Http { source: String, message: String },
    Parse { source: String, message: String },
    DuplicateKey { key: ScenarioKey, first: usize, duplicate: usize },
    Template(String),
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::Source(s) => write!(f, "bad data source: {}", s),
            DataError::Io { source, message } => write!(f, "read {}: {}", source, message),
            DataError::Http { source, message } => write!(f, "fetch {}: {}", source, message),
            DataError::Parse { source, message } => write!(f, "parse {}: {}", source, message),
            DataError::DuplicateKey { key, first, duplicate } => write!(
                f,
                "duplicate scenario key [{}] at rows {} and {}",
                key, first, duplicate
            ),
            DataError::Template(msg) => write!(f, "template: {}", msg),
        }
    }
}

impl std::error::Error for DataError {}

/// Form input that cannot be looked up.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidSpeed(String),
    UnknownRoadType(String),
    UnknownState(String),
    UnknownDuration(String),
    UnknownControl(String),
    ControlRequiresTwoLane { control: ControlMethod, road_type: RoadType },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidSpeed(s) => {
                write!(f, "Invalid speed \"{}\". Enter the posted speed in mph.", s)
            }
            ValidationError::UnknownRoadType(s) => write!(f, "Unknown road type \"{}\".", s),
            ValidationError::UnknownState(s) => write!(f, "Unknown state \"{}\".", s),
            ValidationError::UnknownDuration(s) => write!(f, "Unknown work duration \"{}\".", s),
            ValidationError::UnknownControl(s) => write!(f, "Unknown control method \"{}\".", s),
            ValidationError::ControlRequiresTwoLane { .. } => f.write_str(concat!(
                "Flagger and AFAD control methods are only valid for 2-lane roads. ",
                "Please select \"Signs Only\" for multi-lane roads."
            )),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors surfaced to the interaction that triggered them.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    NotReady(Feed),
    LoadFailed { feed: Feed, message: String },
    Validation(ValidationError),
    NoMatch(ScenarioKey),
    DataIntegrity(String),
}

impl AppError {
    /// Whether retrying the same action later can succeed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AppError::LoadFailed { .. } | AppError::DataIntegrity(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotReady(Feed::Scenarios) => {
                f.write_str("Scenario data not loaded yet. Please wait and try again.")
            }
            AppError::NotReady(Feed::Templates) => {
                f.write_str("SOP data not loaded. Please wait and try again.")
            }
            AppError::LoadFailed { feed: Feed::Scenarios, .. } => {
                f.write_str("Failed to load scenario data. Please reload.")
            }
            AppError::LoadFailed { feed: Feed::Templates, .. } => {
                f.write_str("Could not load SOP templates. Please reload.")
            }
            AppError::Validation(err) => fmt::Display::fmt(err, f),
            AppError::NoMatch(_) => f.write_str(
                "No matching scenario found for the selected parameters. Please verify your inputs.",
            ),
            AppError::DataIntegrity(msg) => write!(f, "Scenario data error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}
