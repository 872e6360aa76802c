//! Results panel: a pure projection of a calculation for display.

use serde::Serialize;
use std::fmt;

use crate::form::FormInput;
use crate::policy::{self, Crew};
use crate::quantities::ConeQuantities;
use crate::scenario::ScenarioRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignDistances {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateRequirements {
    pub notes: Option<String>,
    pub signs: Vec<String>,
    pub equipment: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsView {
    pub signs: SignDistances,
    pub taper_length_ft: u32,
    pub buffer_space_ft: u32,
    pub cone_spacing_taper_ft: u32,
    pub cone_spacing_tangent_ft: u32,
    pub device_type: String,
    pub device_quantity: String,
    pub arrow_board_required: bool,
    pub tma_required: bool,
    pub crew: Crew,
    pub signs_required: Vec<String>,
    pub state_requirements: Option<StateRequirements>,
}

pub fn render(record: &ScenarioRecord, form: &FormInput, cones: &ConeQuantities) -> ResultsView {
    let state_signs = record.state_signs();

    let mut signs_required: Vec<String> = policy::required_signs(form.road_type, form.control)
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    signs_required.extend(state_signs.iter().cloned());

    let notes = record.state_notes().map(|s| s.to_string());
    let equipment = record.state_equipment();
    let has_state_block = notes.is_some() || !state_signs.is_empty() || !equipment.is_empty();
    let state_requirements = if has_state_block {
        Some(StateRequirements {
            notes,
            signs: state_signs,
            equipment,
        })
    } else {
        None
    };

    ResultsView {
        signs: SignDistances {
            a: record.sign_a_distance_ft,
            b: record.sign_b_distance_ft,
            c: record.sign_c_distance_ft,
            d: record.sign_d(),
        },
        taper_length_ft: record.taper_length_ft,
        buffer_space_ft: record.buffer_space_ft,
        cone_spacing_taper_ft: record.cone_spacing_taper_ft,
        cone_spacing_tangent_ft: record.cone_spacing_tangent_ft,
        device_type: record.device_type.clone(),
        device_quantity: format!("{} cones (with 20% contingency)", cones.total),
        arrow_board_required: record.arrow_board_required,
        tma_required: record.tma_required,
        crew: policy::crew_size(form.road_type, form.control),
        signs_required,
        state_requirements,
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

impl fmt::Display for ResultsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Advance Warning Signs")?;
        writeln!(f, "  Sign A: {} ft", self.signs.a)?;
        writeln!(f, "  Sign B: {} ft", self.signs.b)?;
        writeln!(f, "  Sign C: {} ft", self.signs.c)?;
        if let Some(d) = self.signs.d {
            writeln!(f, "  Sign D: {} ft", d)?;
        }
        writeln!(f)?;
        writeln!(f, "Taper & Buffer")?;
        writeln!(f, "  Taper length:          {} ft", self.taper_length_ft)?;
        writeln!(f, "  Buffer space:          {} ft", self.buffer_space_ft)?;
        writeln!(f, "  Cone spacing (taper):  {} ft", self.cone_spacing_taper_ft)?;
        writeln!(f, "  Cone spacing (tangent): {} ft", self.cone_spacing_tangent_ft)?;
        writeln!(f)?;
        writeln!(f, "Equipment")?;
        writeln!(f, "  Device type:  {}", self.device_type)?;
        writeln!(f, "  Quantity:     {}", self.device_quantity)?;
        writeln!(f, "  Arrow board:  {}", yes_no(self.arrow_board_required))?;
        writeln!(f, "  TMA:          {}", yes_no(self.tma_required))?;
        writeln!(f, "  Crew size:    {} minimum ({})", self.crew.size, self.crew.roles)?;
        writeln!(f)?;
        writeln!(f, "Signs Required")?;
        for sign in &self.signs_required {
            writeln!(f, "  [{}]", sign)?;
        }
        if let Some(state) = &self.state_requirements {
            writeln!(f)?;
            writeln!(f, "State-Specific Requirements")?;
            if let Some(notes) = &state.notes {
                writeln!(f, "  {}", notes)?;
            }
            if !state.signs.is_empty() {
                writeln!(f, "  Additional Signs Required:")?;
                for s in &state.signs {
                    writeln!(f, "    - {}", s)?;
                }
            }
            if !state.equipment.is_empty() {
                writeln!(f, "  Additional Equipment Required:")?;
                for e in &state.equipment {
                    writeln!(f, "    - {}", e)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantities::cone_quantities;
    use crate::scenario::tests::sample_record;
    use crate::scenario::{ControlMethod, RoadType};

    fn form_for(record: &ScenarioRecord) -> FormInput {
        FormInput {
            speed: record.speed_limit,
            road_type: record.road_type,
            state: record.state,
            duration: record.work_duration,
            control: record.control_method,
            work_area_ft: 500,
        }
    }

    #[test]
    fn test_flagger_view() {
        let rec = sample_record();
        let form = form_for(&rec);
        let cones = cone_quantities(&rec, 500).unwrap();
        let view = render(&rec, &form, &cones);
        assert_eq!(view.signs.d, Some(200));
        assert_eq!(view.device_quantity, "39 cones (with 20% contingency)");
        assert_eq!(view.crew.size, 4);
        // 4 fixed signs + 2 state signs appended in order
        assert_eq!(view.signs_required.len(), 6);
        assert_eq!(view.signs_required[4], "Speeding Fines Doubled (R2-6aP)");
        let state = view.state_requirements.unwrap();
        assert!(state.notes.is_some());
        assert!(state.equipment.is_empty());
    }

    #[test]
    fn test_state_block_hidden_when_all_none() {
        let mut rec = sample_record();
        rec.road_type = RoadType::MultiLaneUndivided;
        rec.control_method = ControlMethod::SignsOnly;
        rec.sign_d_distance_ft = None;
        rec.state_notes = "none".to_string();
        rec.state_signs_required = "none".to_string();
        rec.state_equipment_required = "none".to_string();
        let form = form_for(&rec);
        let cones = cone_quantities(&rec, 500).unwrap();
        let view = render(&rec, &form, &cones);
        assert!(view.state_requirements.is_none());
        assert_eq!(view.signs.d, None);
        assert_eq!(view.signs_required.len(), 3);
        let text = view.to_string();
        assert!(!text.contains("Sign D:"));
        assert!(!text.contains("State-Specific"));
    }
}
