//! Fixed business rules keyed on the enumerated scenario fields.
//!
//! Everything here is a pure function of the form input and the matched
//! record, so each rule can be checked in isolation from rendering.

use serde::Serialize;

use crate::form::FormInput;
use crate::scenario::{ControlMethod, RoadType, ScenarioRecord, StateCode, WorkDuration};

/// Speed at and above which Class 3 vests are required.
pub const CLASS_3_VEST_MPH: u32 = 45;
/// Florida rumble-strip signage applies strictly above this speed.
pub const FL_RUMBLE_STRIP_MPH: u32 = 55;
/// Briefing flags sight distance as critical strictly above this speed.
pub const HIGH_SPEED_ZONE_MPH: u32 = 55;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Crew {
    pub size: u8,
    pub roles: &'static str,
}

pub fn crew_size(road_type: RoadType, control: ControlMethod) -> Crew {
    match (road_type, control) {
        (RoadType::TwoLaneTwoWay, ControlMethod::Flagger) => Crew {
            size: 4,
            roles: "2 flaggers, 1 driver, 1 qualified observer",
        },
        (RoadType::TwoLaneTwoWay, ControlMethod::Afad) => Crew {
            size: 3,
            roles: "1 driver, 1 AFAD operator, 1 qualified observer",
        },
        _ => Crew {
            size: 2,
            roles: "1 driver, 1 qualified observer",
        },
    }
}

/// Cone spacing for the speed band the posted speed falls in.
pub fn cone_spacing_band_ft(speed: u32) -> u32 {
    if speed <= 35 {
        10
    } else if speed <= 50 {
        15
    } else {
        20
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VestClass {
    Class2,
    Class3,
}

impl VestClass {
    pub fn for_speed(speed: u32) -> Self {
        if speed >= CLASS_3_VEST_MPH {
            VestClass::Class3
        } else {
            VestClass::Class2
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VestClass::Class2 => "Class 2",
            VestClass::Class3 => "Class 3",
        }
    }
}

/// Advance-warning signs placed for a road type and control method.
pub fn required_signs(road_type: RoadType, control: ControlMethod) -> Vec<&'static str> {
    let mut signs = Vec::new();
    if road_type.is_two_lane() {
        signs.push("Sign A: Road Work Ahead (W20-1) - Qty: 2");
        signs.push("Sign B: One Lane Road Ahead (W20-4) - Qty: 2");
        signs.push("Sign C: Be Prepared to Stop (W3-4) - Qty: 2");
        match control {
            ControlMethod::Flagger => signs.push("Sign D: Flagger Symbol (W20-7a) - Qty: 2"),
            ControlMethod::Afad => signs.push("Sign D: AFAD Ahead - Qty: 2"),
            ControlMethod::SignsOnly => {}
        }
    } else {
        signs.push("Sign A: Road Work Ahead (W20-1) - Qty: 1");
        if road_type == RoadType::MultiLaneDivided {
            signs.push("Sign B: Right Lane Closed Ahead (W20-5R) - Qty: 1");
        } else {
            signs.push("Sign B: Lane Closed Ahead (W20-5) - Qty: 1");
        }
        signs.push("Sign C: Merge Right (W4-1R) - Qty: 1");
    }
    signs
}

/// A state that mandates a TMA above a speed threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TmaMandate {
    pub state: StateCode,
    pub threshold_mph: u32,
    pub strictest: bool,
}

pub fn tma_mandate(state: StateCode) -> Option<TmaMandate> {
    match state {
        StateCode::Sc => Some(TmaMandate {
            state,
            threshold_mph: 40,
            strictest: true,
        }),
        StateCode::Nc => Some(TmaMandate {
            state,
            threshold_mph: 55,
            strictest: false,
        }),
        _ => None,
    }
}

pub fn florida_duration_signs(form: &FormInput) -> bool {
    form.state == StateCode::Fl && form.duration == WorkDuration::LongTerm
}

pub fn florida_rumble_strips(form: &FormInput) -> bool {
    form.state == StateCode::Fl && form.speed > FL_RUMBLE_STRIP_MPH
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Vest,
    Tma,
    ArrowBoard,
    DurationSigns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub critical: bool,
    pub text: String,
}

/// Safety-summary alerts. Rules are independent; all that apply are returned.
pub fn safety_alerts(record: &ScenarioRecord, form: &FormInput) -> Vec<Alert> {
    let mut alerts = Vec::new();

    match VestClass::for_speed(form.speed) {
        VestClass::Class3 => alerts.push(Alert {
            kind: AlertKind::Vest,
            critical: true,
            text: format!(
                "ANSI Class 3 vests REQUIRED (speed >={} mph)",
                CLASS_3_VEST_MPH
            ),
        }),
        VestClass::Class2 => alerts.push(Alert {
            kind: AlertKind::Vest,
            critical: false,
            text: "ANSI Class 2 vests minimum".to_string(),
        }),
    }

    if record.tma_required {
        if let Some(mandate) = tma_mandate(form.state) {
            let suffix = if mandate.strictest { " (STRICTEST in region)" } else { "" };
            alerts.push(Alert {
                kind: AlertKind::Tma,
                critical: true,
                text: format!(
                    "TMA MANDATORY - {} requires TMA at {}+ mph{}",
                    mandate.state.name(),
                    mandate.threshold_mph,
                    suffix
                ),
            });
        }
    }

    if record.arrow_board_required {
        alerts.push(Alert {
            kind: AlertKind::ArrowBoard,
            critical: true,
            text: "ARROW BOARD MANDATORY - Tennessee requires arrow boards for all multi-lane closures"
                .to_string(),
        });
    }

    if florida_duration_signs(form) {
        alerts.push(Alert {
            kind: AlertKind::DurationSigns,
            critical: true,
            text: concat!(
                "Florida DURATION SIGNS REQUIRED - \"Speeding Fines Doubled\" and ",
                "\"End Road Work\" signs mandatory for work >24 hours"
            )
            .to_string(),
        });
    }

    alerts
}

/// A setup step that comes from state rules rather than the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertedStep {
    pub label: String,
    pub critical: bool,
}

fn inserted(label: impl Into<String>, critical: bool) -> InsertedStep {
    InsertedStep {
        label: label.into(),
        critical,
    }
}

/// Steps spliced in after the first sign phase of the setup sequence.
pub fn state_setup_steps(record: &ScenarioRecord, form: &FormInput) -> Vec<InsertedStep> {
    let mut steps = Vec::new();

    if florida_duration_signs(form) {
        steps.push(inserted(
            "FL REQUIREMENT: Install \"Speeding Fines Doubled\" signs at both approaches",
            true,
        ));
        steps.push(inserted(
            concat!(
                "FL REQUIREMENT: Install \"End Road Work\" signs ",
                "(will be placed at termination during setup completion)"
            ),
            true,
        ));
    }

    if florida_rumble_strips(form) {
        steps.push(inserted(
            "FL REQUIREMENT: Install \"Rumble Strips Ahead\" signs at both approaches",
            true,
        ));
    }

    if record.arrow_board_required {
        steps.push(inserted(
            "TN REQUIREMENT: Position arrow board BEFORE installing cones (MANDATORY for multi-lane)",
            true,
        ));
        steps.push(inserted(
            "Arrow board in CAUTION mode while approaching taper installation",
            false,
        ));
    }

    if record.tma_required {
        let label = match tma_mandate(form.state) {
            Some(m) => {
                let strictest = if m.strictest { " (STRICTEST threshold)" } else { "" };
                format!(
                    "{} REQUIREMENT: Position TMA at work area start (MANDATORY at {}+ mph{})",
                    form.state, m.threshold_mph, strictest
                )
            }
            None => {
                "Position TMA at work area start (TMA required for this configuration)".to_string()
            }
        };
        steps.push(inserted(label, true));
        steps.push(inserted("Verify TMA is MASH/NCHRP 350 compliant", true));
        steps.push(inserted(
            "Driver positions TMA, then EXITS vehicle - TMA MUST BE UNOCCUPIED during work",
            true,
        ));
    }

    steps
}
