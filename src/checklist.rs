//! Setup and breakdown checklist templates, and placeholder substitution
//! into their step labels.

use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::scenario::ScenarioRecord;

/// Phase after which state-specific setup steps are spliced.
pub const FIRST_SIGN_PHASE_ID: &str = "phase-1-signs-a";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistTemplate {
    pub sections: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub label: String,
    #[serde(default)]
    pub critical: bool,
    /// Placeholders this label is expected to contain.
    #[serde(default)]
    pub placeholders: Vec<Placeholder>,
}

impl ChecklistTemplate {
    pub fn from_json(source: &str, bytes: &[u8]) -> Result<Self, DataError> {
        let template: ChecklistTemplate =
            serde_json::from_slice(bytes).map_err(|e| DataError::Parse {
                source: source.to_string(),
                message: e.to_string(),
            })?;
        if template.sections.is_empty() {
            return Err(DataError::Template(format!("{} has no sections", source)));
        }
        Ok(template)
    }

    pub fn phase(&self, id: &str) -> Option<&Phase> {
        self.sections.iter().find(|p| p.id == id)
    }

    pub fn step_count(&self) -> usize {
        self.sections.iter().map(|p| p.items.len()).sum()
    }

    /// The setup sequence must name the phase the state-specific steps follow.
    pub fn require_anchor(&self, source: &str) -> Result<(), DataError> {
        if self.phase(FIRST_SIGN_PHASE_ID).is_none() {
            return Err(DataError::Template(format!(
                "{} has no phase \"{}\"",
                source, FIRST_SIGN_PHASE_ID
            )));
        }
        Ok(())
    }
}

/// Known substitutable phrases in step labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    SignALocation,
    SignBLocation,
    SignCLocation,
    SpacingCalculation,
    TaperLength,
    BufferDistance,
    ConeSpacingBand,
}

impl Placeholder {
    /// Application order.
    pub const ALL: [Placeholder; 7] = [
        Placeholder::SignALocation,
        Placeholder::SignBLocation,
        Placeholder::SignCLocation,
        Placeholder::SpacingCalculation,
        Placeholder::TaperLength,
        Placeholder::BufferDistance,
        Placeholder::ConeSpacingBand,
    ];

    pub fn phrase(&self) -> &'static str {
        match self {
            Placeholder::SignALocation => "Sign A location",
            Placeholder::SignBLocation => "Sign B location",
            Placeholder::SignCLocation => "Sign C location",
            Placeholder::SpacingCalculation => "per spacing calculation",
            Placeholder::TaperLength => "Refer to spacing calculator for taper length",
            Placeholder::BufferDistance => "Refer to spacing calculator for buffer distances",
            Placeholder::ConeSpacingBand => "10ft (25-35mph), 15ft (40-50mph), 20ft (55-70mph)",
        }
    }

    fn replacement(&self, record: &ScenarioRecord, speed: u32) -> String {
        match self {
            Placeholder::SignALocation => format!(
                "Sign A location ({} ft from work area)",
                record.sign_a_distance_ft
            ),
            Placeholder::SignBLocation => format!(
                "Sign B location ({} ft from work area)",
                record.sign_b_distance_ft
            ),
            Placeholder::SignCLocation => format!(
                "Sign C location ({} ft from work area)",
                record.sign_c_distance_ft
            ),
            Placeholder::SpacingCalculation => format!("{} ft", record.sign_b_distance_ft),
            Placeholder::TaperLength => format!("Taper length: {} ft", record.taper_length_ft),
            Placeholder::BufferDistance => format!("Buffer space: {} ft", record.buffer_space_ft),
            Placeholder::ConeSpacingBand => format!(
                "{} ft (your speed: {} mph)",
                crate::policy::cone_spacing_band_ft(speed),
                speed
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub text: String,
    pub applied: Vec<Placeholder>,
}

impl Substitution {
    /// Declared placeholders that found no matching phrase.
    pub fn missing(&self, declared: &[Placeholder]) -> Vec<Placeholder> {
        declared
            .iter()
            .filter(|p| !self.applied.contains(p))
            .copied()
            .collect()
    }
}

/// Replace the first occurrence of each known phrase.
pub fn substitute(label: &str, record: &ScenarioRecord, speed: u32) -> Substitution {
    let mut text = label.to_string();
    let mut applied = Vec::new();
    for placeholder in Placeholder::ALL {
        let phrase = placeholder.phrase();
        if text.contains(phrase) {
            text = text.replacen(phrase, &placeholder.replacement(record, speed), 1);
            applied.push(placeholder);
        }
    }
    Substitution { text, applied }
}
