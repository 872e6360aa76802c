//! Scenario records: one pre-computed TTC configuration per row of the table.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Sentinel used by the published table for "no state-specific entry".
pub const NONE_SENTINEL: &str = "none";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadType {
    #[serde(rename = "2-lane-2-way")]
    TwoLaneTwoWay,
    #[serde(rename = "multi-lane-undivided")]
    MultiLaneUndivided,
    #[serde(rename = "multi-lane-divided")]
    MultiLaneDivided,
}

impl RoadType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "2-lane-2-way" => Some(RoadType::TwoLaneTwoWay),
            "multi-lane-undivided" => Some(RoadType::MultiLaneUndivided),
            "multi-lane-divided" => Some(RoadType::MultiLaneDivided),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoadType::TwoLaneTwoWay => "2-lane-2-way",
            RoadType::MultiLaneUndivided => "multi-lane-undivided",
            RoadType::MultiLaneDivided => "multi-lane-divided",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            RoadType::TwoLaneTwoWay => "2-Lane, 2-Way Road (TA-17)",
            RoadType::MultiLaneUndivided => "Multi-Lane Undivided Highway",
            RoadType::MultiLaneDivided => "Multi-Lane Divided Highway",
        }
    }

    pub fn is_two_lane(&self) -> bool {
        matches!(self, RoadType::TwoLaneTwoWay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkDuration {
    ShortTerm,
    Intermediate,
    LongTerm,
}

impl WorkDuration {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "short-term" => Some(WorkDuration::ShortTerm),
            "intermediate" => Some(WorkDuration::Intermediate),
            "long-term" => Some(WorkDuration::LongTerm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkDuration::ShortTerm => "short-term",
            WorkDuration::Intermediate => "intermediate",
            WorkDuration::LongTerm => "long-term",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            WorkDuration::ShortTerm => "Short-term (< 1 hour)",
            WorkDuration::Intermediate => "Intermediate (1-24 hours)",
            WorkDuration::LongTerm => "Long-term (> 24 hours)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlMethod {
    #[serde(rename = "none")]
    SignsOnly,
    #[serde(rename = "flagger")]
    Flagger,
    #[serde(rename = "AFAD")]
    Afad,
}

impl ControlMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "none" => Some(ControlMethod::SignsOnly),
            "flagger" => Some(ControlMethod::Flagger),
            "AFAD" => Some(ControlMethod::Afad),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ControlMethod::SignsOnly => "none",
            ControlMethod::Flagger => "flagger",
            ControlMethod::Afad => "AFAD",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ControlMethod::SignsOnly => "Signs Only",
            ControlMethod::Flagger => "Flagger Control",
            ControlMethod::Afad => "AFAD (Automated Flagger)",
        }
    }

    /// Flagger and AFAD operations need a person or device on each approach.
    pub fn needs_two_lane(&self) -> bool {
        matches!(self, ControlMethod::Flagger | ControlMethod::Afad)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StateCode {
    Fl,
    Tn,
    Nc,
    Sc,
    Ga,
}

impl StateCode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "FL" => Some(StateCode::Fl),
            "TN" => Some(StateCode::Tn),
            "NC" => Some(StateCode::Nc),
            "SC" => Some(StateCode::Sc),
            "GA" => Some(StateCode::Ga),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StateCode::Fl => "FL",
            StateCode::Tn => "TN",
            StateCode::Nc => "NC",
            StateCode::Sc => "SC",
            StateCode::Ga => "GA",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StateCode::Fl => "Florida",
            StateCode::Tn => "Tennessee",
            StateCode::Nc => "North Carolina",
            StateCode::Sc => "South Carolina",
            StateCode::Ga => "Georgia",
        }
    }
}

impl fmt::Display for StateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five fields that identify a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub speed: u32,
    pub road_type: RoadType,
    pub state: StateCode,
    pub duration: WorkDuration,
    pub control: ControlMethod,
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mph / {} / {} / {} / {}",
            self.speed,
            self.road_type.as_str(),
            self.state,
            self.duration.as_str(),
            self.control.as_str()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRecord {
    #[serde(deserialize_with = "feet")]
    pub speed_limit: u32,
    pub road_type: RoadType,
    pub state: StateCode,
    pub work_duration: WorkDuration,
    pub control_method: ControlMethod,

    #[serde(deserialize_with = "feet")]
    pub sign_a_distance_ft: u32,
    #[serde(deserialize_with = "feet")]
    pub sign_b_distance_ft: u32,
    #[serde(deserialize_with = "feet")]
    pub sign_c_distance_ft: u32,
    /// Only flagger/AFAD rows carry a fourth sign; `0` is treated as absent.
    #[serde(default, deserialize_with = "optional_feet")]
    pub sign_d_distance_ft: Option<u32>,
    #[serde(deserialize_with = "feet")]
    pub taper_length_ft: u32,
    #[serde(deserialize_with = "feet")]
    pub buffer_space_ft: u32,
    #[serde(deserialize_with = "feet")]
    pub cone_spacing_taper_ft: u32,
    #[serde(deserialize_with = "feet")]
    pub cone_spacing_tangent_ft: u32,
    pub device_type: String,
    #[serde(deserialize_with = "flag")]
    pub arrow_board_required: bool,
    #[serde(deserialize_with = "flag")]
    pub tma_required: bool,
    #[serde(default = "none_text")]
    pub state_notes: String,
    #[serde(default = "none_text")]
    pub state_signs_required: String,
    #[serde(default = "none_text")]
    pub state_equipment_required: String,
}

impl ScenarioRecord {
    pub fn key(&self) -> ScenarioKey {
        ScenarioKey {
            speed: self.speed_limit,
            road_type: self.road_type,
            state: self.state,
            duration: self.work_duration,
            control: self.control_method,
        }
    }

    pub fn sign_d(&self) -> Option<u32> {
        self.sign_d_distance_ft.filter(|d| *d > 0)
    }

    pub fn state_notes(&self) -> Option<&str> {
        let trimmed = self.state_notes.trim();
        if is_none_text(trimmed) {
            None
        } else {
            Some(trimmed)
        }
    }

    pub fn state_signs(&self) -> Vec<String> {
        split_list(&self.state_signs_required)
    }

    pub fn state_equipment(&self) -> Vec<String> {
        split_list(&self.state_equipment_required)
    }
}

fn none_text() -> String {
    NONE_SENTINEL.to_string()
}

fn is_none_text(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case(NONE_SENTINEL)
}

/// Split a `;`-separated state field, honouring the `none` sentinel.
pub fn split_list(field: &str) -> Vec<String> {
    if is_none_text(field.trim()) {
        return Vec::new();
    }
    field
        .split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Whole numbers, also when a spreadsheet export wrote them as `200.0`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(u64),
    Float(f64),
}

impl RawNumber {
    fn whole<E: serde::de::Error>(self) -> Result<u32, E> {
        match self {
            RawNumber::Int(n) => {
                u32::try_from(n).map_err(|_| E::custom(format!("value out of range: {}", n)))
            }
            RawNumber::Float(x)
                if x.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&x) =>
            {
                Ok(x as u32)
            }
            RawNumber::Float(x) => Err(E::custom(format!("expected a whole number, got {}", x))),
        }
    }
}

fn feet<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    RawNumber::deserialize(deserializer)?.whole()
}

fn optional_feet<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawNumber>::deserialize(deserializer)?
        .map(RawNumber::whole)
        .transpose()
}

/// The published table writes flags as "True"/"False"; plain booleans are accepted too.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => Ok(b),
        Raw::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!("bad flag value: {}", other))),
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_record() -> ScenarioRecord {
        ScenarioRecord {
            speed_limit: 45,
            road_type: RoadType::TwoLaneTwoWay,
            state: StateCode::Fl,
            work_duration: WorkDuration::LongTerm,
            control_method: ControlMethod::Flagger,
            sign_a_distance_ft: 350,
            sign_b_distance_ft: 350,
            sign_c_distance_ft: 350,
            sign_d_distance_ft: Some(200),
            taper_length_ft: 100,
            buffer_space_ft: 150,
            cone_spacing_taper_ft: 20,
            cone_spacing_tangent_ft: 30,
            device_type: "28\" traffic cones".to_string(),
            arrow_board_required: false,
            tma_required: false,
            state_notes: "FDOT Index 102-600 applies".to_string(),
            state_signs_required: "Speeding Fines Doubled (R2-6aP);End Road Work (G20-2)"
                .to_string(),
            state_equipment_required: "none".to_string(),
        }
    }

    #[test]
    fn test_parses_published_row() {
        let json = r#"{
            "speed_limit": 55,
            "road_type": "multi-lane-divided",
            "state": "NC",
            "work_duration": "short-term",
            "control_method": "none",
            "sign_a_distance_ft": 500,
            "sign_b_distance_ft": 500,
            "sign_c_distance_ft": 500,
            "sign_d_distance_ft": null,
            "taper_length_ft": 660,
            "buffer_space_ft": 495,
            "cone_spacing_taper_ft": 55,
            "cone_spacing_tangent_ft": 110,
            "device_type": "cones",
            "arrow_board_required": "False",
            "tma_required": "True",
            "state_notes": "none",
            "state_signs_required": "none",
            "state_equipment_required": "TMA (MASH TL-3)"
        }"#;
        let rec: ScenarioRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.road_type, RoadType::MultiLaneDivided);
        assert_eq!(rec.state, StateCode::Nc);
        assert_eq!(rec.control_method, ControlMethod::SignsOnly);
        assert!(rec.tma_required);
        assert!(!rec.arrow_board_required);
        assert_eq!(rec.sign_d(), None);
        assert_eq!(rec.state_notes(), None);
        assert_eq!(rec.state_equipment(), vec!["TMA (MASH TL-3)".to_string()]);
    }

    #[test]
    fn test_integral_float_columns_accepted() {
        let mut v = serde_json::to_value(sample_record()).unwrap();
        v["sign_d_distance_ft"] = serde_json::json!(200.0);
        v["taper_length_ft"] = serde_json::json!(100.0);
        let rec: ScenarioRecord = serde_json::from_value(v.clone()).unwrap();
        assert_eq!(rec.sign_d(), Some(200));
        assert_eq!(rec.taper_length_ft, 100);

        v["buffer_space_ft"] = serde_json::json!(150.5);
        assert!(serde_json::from_value::<ScenarioRecord>(v.clone()).is_err());
        v["buffer_space_ft"] = serde_json::json!(-150);
        assert!(serde_json::from_value::<ScenarioRecord>(v).is_err());
    }

    #[test]
    fn test_missing_sign_d_is_absent() {
        let mut v = serde_json::to_value(sample_record()).unwrap();
        v.as_object_mut().unwrap().remove("sign_d_distance_ft");
        let rec: ScenarioRecord = serde_json::from_value(v).unwrap();
        assert_eq!(rec.sign_d_distance_ft, None);
    }

    #[test]
    fn test_zero_sign_d_is_absent() {
        let mut rec = sample_record();
        rec.sign_d_distance_ft = Some(0);
        assert_eq!(rec.sign_d(), None);
        rec.sign_d_distance_ft = Some(250);
        assert_eq!(rec.sign_d(), Some(250));
    }

    #[test]
    fn test_split_list_drops_blanks() {
        assert_eq!(split_list("a; ;b;"), vec!["a".to_string(), "b".to_string()]);
        assert!(split_list("none").is_empty());
        assert!(split_list("  ").is_empty());
    }

    #[test]
    fn test_bad_flag_rejected() {
        let mut v = serde_json::to_value(sample_record()).unwrap();
        v["tma_required"] = serde_json::json!("maybe");
        assert!(serde_json::from_value::<ScenarioRecord>(v).is_err());
    }

    #[test]
    fn test_enum_parsing_matches_wire_names() {
        assert_eq!(RoadType::parse("2-lane-2-way"), Some(RoadType::TwoLaneTwoWay));
        assert_eq!(ControlMethod::parse("AFAD"), Some(ControlMethod::Afad));
        assert_eq!(ControlMethod::parse("afad"), None);
        assert_eq!(WorkDuration::parse("long-term"), Some(WorkDuration::LongTerm));
        assert_eq!(StateCode::parse("SC").map(|s| s.name()), Some("South Carolina"));
    }
}
