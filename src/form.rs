use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::scenario::{ControlMethod, RoadType, ScenarioKey, StateCode, WorkDuration};

pub const DEFAULT_WORK_AREA_FT: u32 = 500;

/// Field values exactly as the UI delivers them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawForm {
    pub speed: String,
    pub road_type: String,
    pub state: String,
    pub duration: String,
    pub control: String,
    pub work_area: Option<String>,
}

impl RawForm {
    pub fn parse(&self) -> Result<FormInput, ValidationError> {
        let speed = self
            .speed
            .trim()
            .parse::<u32>()
            .map_err(|_| ValidationError::InvalidSpeed(self.speed.clone()))?;
        let road_type = RoadType::parse(&self.road_type)
            .ok_or_else(|| ValidationError::UnknownRoadType(self.road_type.clone()))?;
        let state = StateCode::parse(&self.state)
            .ok_or_else(|| ValidationError::UnknownState(self.state.clone()))?;
        let duration = WorkDuration::parse(&self.duration)
            .ok_or_else(|| ValidationError::UnknownDuration(self.duration.clone()))?;
        let control = ControlMethod::parse(&self.control)
            .ok_or_else(|| ValidationError::UnknownControl(self.control.clone()))?;

        Ok(FormInput {
            speed,
            road_type,
            state,
            duration,
            control,
            work_area_ft: parse_work_area(self.work_area.as_deref()),
        })
    }
}

/// The leading run of digits is the length, so `750.5` and `800ft` read as
/// 750 and 800. Missing, non-numeric and zero lengths fall back to the default.
pub fn parse_work_area(raw: Option<&str>) -> u32 {
    raw.and_then(leading_integer)
        .filter(|ft| *ft > 0)
        .unwrap_or(DEFAULT_WORK_AREA_FT)
}

fn leading_integer(raw: &str) -> Option<u32> {
    let s = raw.trim_start();
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormInput {
    pub speed: u32,
    pub road_type: RoadType,
    pub state: StateCode,
    pub duration: WorkDuration,
    pub control: ControlMethod,
    pub work_area_ft: u32,
}

impl FormInput {
    pub fn key(&self) -> ScenarioKey {
        ScenarioKey {
            speed: self.speed,
            road_type: self.road_type,
            state: self.state,
            duration: self.duration,
            control: self.control,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.control.needs_two_lane() && !self.road_type.is_two_lane() {
            return Err(ValidationError::ControlRequiresTwoLane {
                control: self.control,
                road_type: self.road_type,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(road: &str, control: &str, work_area: Option<&str>) -> RawForm {
        RawForm {
            speed: "45".to_string(),
            road_type: road.to_string(),
            state: "FL".to_string(),
            duration: "long-term".to_string(),
            control: control.to_string(),
            work_area: work_area.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_work_area_defaults() {
        assert_eq!(parse_work_area(None), 500);
        assert_eq!(parse_work_area(Some("abc")), 500);
        assert_eq!(parse_work_area(Some("0")), 500);
        assert_eq!(parse_work_area(Some(" 800 ")), 800);
        assert_eq!(parse_work_area(Some("")), 500);
        assert_eq!(parse_work_area(Some("-40")), 500);
    }

    #[test]
    fn test_work_area_keeps_leading_integer() {
        assert_eq!(parse_work_area(Some("750.5")), 750);
        assert_eq!(parse_work_area(Some("800ft")), 800);
        assert_eq!(parse_work_area(Some("0.9")), 500);
        let form = raw("2-lane-2-way", "flagger", Some("750.5")).parse().unwrap();
        assert_eq!(form.work_area_ft, 750);
    }

    #[test]
    fn test_parse_full_form() {
        let form = raw("2-lane-2-way", "flagger", Some("750")).parse().unwrap();
        assert_eq!(form.speed, 45);
        assert_eq!(form.control, ControlMethod::Flagger);
        assert_eq!(form.work_area_ft, 750);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_flagger_on_multilane_rejected() {
        for control in ["flagger", "AFAD"] {
            for road in ["multi-lane-undivided", "multi-lane-divided"] {
                let form = raw(road, control, None).parse().unwrap();
                assert!(matches!(
                    form.validate(),
                    Err(ValidationError::ControlRequiresTwoLane { .. })
                ));
            }
        }
        let signs_only = raw("multi-lane-divided", "none", None).parse().unwrap();
        assert!(signs_only.validate().is_ok());
    }

    #[test]
    fn test_unknown_values_rejected() {
        let mut bad = raw("gravel", "none", None);
        assert!(matches!(bad.parse(), Err(ValidationError::UnknownRoadType(_))));
        bad = raw("2-lane-2-way", "none", None);
        bad.speed = "fast".to_string();
        assert!(matches!(bad.parse(), Err(ValidationError::InvalidSpeed(_))));
        bad.speed = "45".to_string();
        bad.state = "ZZ".to_string();
        assert!(matches!(bad.parse(), Err(ValidationError::UnknownState(_))));
    }
}
