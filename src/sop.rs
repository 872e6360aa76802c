//! SOP assembly: the printable setup and breakdown procedure for one
//! calculation.
//!
//! The document is built as structured sections. The checklist templates
//! supply the setup and breakdown phases; everything else is fixed content
//! conditioned on the form input and the matched scenario. `Display` renders
//! the plain-text print form.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use crate::checklist::{self, ChecklistTemplate, FIRST_SIGN_PHASE_ID};
use crate::data::Templates;
use crate::form::FormInput;
use crate::logging;
use crate::policy::{self, Alert, VestClass};
use crate::quantities::ConeQuantities;
use crate::scenario::{ControlMethod, ScenarioRecord};

pub const SOP_TITLE: &str = "TTC Work Zone Setup & Breakdown SOP";
const BLANK: &str = "_______________________";

const CARDINAL_RULES: [(&str, &str); 3] = [
    (
        "Hazard Assessment",
        "Complete before EVERY operation. Document in PJSB. Reassess if conditions change.",
    ),
    (
        "Personal Protective Equipment",
        "Worn at ALL times outside vehicle. Daily inspection required. Replace immediately if damaged.",
    ),
    (
        "Qualified Traffic Observer",
        "Present during ALL setup/breakdown. Dedicated role. Authority to STOP WORK, no justification needed.",
    ),
];

#[derive(Debug, Clone, Serialize)]
pub struct SopDocument {
    pub sections: Vec<SopSection>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum SopSection {
    Header(Header),
    SafetySummary(SafetySummary),
    Equipment(EquipmentList),
    Briefing(Briefing),
    Setup(Procedure),
    Breakdown(Procedure),
    Reference(ReferenceCard),
}

#[derive(Debug, Clone, Serialize)]
pub struct Header {
    pub title: &'static str,
    pub configuration: &'static str,
    pub speed_mph: u32,
    pub state: &'static str,
    pub duration: &'static str,
    pub control: &'static str,
    pub generated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetySummary {
    pub alerts: Vec<Alert>,
    pub cardinal_rules: Vec<(&'static str, &'static str)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentList {
    pub categories: Vec<EquipmentCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentCategory {
    pub title: &'static str,
    pub note: Option<String>,
    pub items: Vec<EquipmentItem>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EquipmentItem {
    pub text: String,
    pub details: Vec<String>,
    pub state_specific: bool,
}

impl EquipmentItem {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            details: Vec::new(),
            state_specific: false,
        }
    }

    fn mandatory(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            details: Vec::new(),
            state_specific: true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Briefing {
    pub duration_note: &'static str,
    pub attendance_note: &'static str,
    pub blocks: Vec<BriefingBlock>,
    pub sign_off_lines: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BriefingBlock {
    pub title: &'static str,
    pub critical: bool,
    pub banner: Option<&'static str>,
    pub items: Vec<String>,
    pub notes: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Procedure {
    pub title: &'static str,
    pub banner: &'static str,
    pub banner_critical: bool,
    pub phases: Vec<ProcedurePhase>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcedurePhase {
    pub id: String,
    pub title: String,
    pub steps: Vec<ProcedureStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcedureStep {
    pub label: String,
    pub critical: bool,
    pub state_specific: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceCard {
    pub errant_vehicle: Vec<&'static str>,
    pub stop_work: Vec<&'static str>,
    pub whistle_protocol: Vec<(&'static str, &'static str)>,
    pub contacts: Vec<&'static str>,
    pub spacing: Vec<(&'static str, u32)>,
}

impl SopDocument {
    pub fn section_names(&self) -> Vec<&'static str> {
        self.sections
            .iter()
            .map(|s| match s {
                SopSection::Header(_) => "header",
                SopSection::SafetySummary(_) => "safety_summary",
                SopSection::Equipment(_) => "equipment",
                SopSection::Briefing(_) => "briefing",
                SopSection::Setup(_) => "setup",
                SopSection::Breakdown(_) => "breakdown",
                SopSection::Reference(_) => "reference",
            })
            .collect()
    }

    pub fn safety_summary(&self) -> Option<&SafetySummary> {
        self.sections.iter().find_map(|s| match s {
            SopSection::SafetySummary(summary) => Some(summary),
            _ => None,
        })
    }

    pub fn setup(&self) -> Option<&Procedure> {
        self.sections.iter().find_map(|s| match s {
            SopSection::Setup(p) => Some(p),
            _ => None,
        })
    }

    pub fn breakdown(&self) -> Option<&Procedure> {
        self.sections.iter().find_map(|s| match s {
            SopSection::Breakdown(p) => Some(p),
            _ => None,
        })
    }

    pub fn equipment(&self) -> Option<&EquipmentList> {
        self.sections.iter().find_map(|s| match s {
            SopSection::Equipment(e) => Some(e),
            _ => None,
        })
    }
}

pub struct SopAssembler<'a> {
    templates: &'a Templates,
}

impl<'a> SopAssembler<'a> {
    pub fn new(templates: &'a Templates) -> Self {
        Self { templates }
    }

    pub fn assemble(
        &self,
        record: &ScenarioRecord,
        form: &FormInput,
        cones: &ConeQuantities,
        generated: NaiveDate,
    ) -> SopDocument {
        let _scope = logging::ProfileScope::new("sop", "assemble");
        let mut warnings = Vec::new();

        let setup_phases = procedure_phases(
            &self.templates.setup,
            record,
            form,
            Some(policy::state_setup_steps(record, form)),
            &mut warnings,
        );
        let breakdown_phases = procedure_phases(
            &self.templates.breakdown,
            record,
            form,
            None,
            &mut warnings,
        );

        let sections = vec![
            SopSection::Header(header(form, generated)),
            SopSection::SafetySummary(SafetySummary {
                alerts: policy::safety_alerts(record, form),
                cardinal_rules: CARDINAL_RULES.to_vec(),
            }),
            SopSection::Equipment(equipment(record, form, cones)),
            SopSection::Briefing(briefing(form)),
            SopSection::Setup(Procedure {
                title: "Work Zone Setup Procedure",
                banner: "CRITICAL: Signs and devices installed WITH traffic flow (same direction as traffic travel)",
                banner_critical: false,
                phases: setup_phases,
            }),
            SopSection::Breakdown(Procedure {
                title: "Work Zone Breakdown Procedure",
                banner: "MOST DANGEROUS PHASE - Maximum vigilance required",
                banner_critical: true,
                phases: breakdown_phases,
            }),
            SopSection::Reference(reference(record)),
        ];

        for warning in &warnings {
            logging::log_sop_warning(warning);
        }

        SopDocument { sections, warnings }
    }
}

fn procedure_phases(
    template: &ChecklistTemplate,
    record: &ScenarioRecord,
    form: &FormInput,
    mut inserts: Option<Vec<policy::InsertedStep>>,
    warnings: &mut Vec<String>,
) -> Vec<ProcedurePhase> {
    let mut phases = Vec::with_capacity(template.sections.len());
    for phase in &template.sections {
        let mut steps = Vec::with_capacity(phase.items.len());
        for step in &phase.items {
            let sub = checklist::substitute(&step.label, record, form.speed);
            for missing in sub.missing(&step.placeholders) {
                warnings.push(format!(
                    "{}: step \"{}\" expected placeholder \"{}\"",
                    phase.id,
                    step.label,
                    missing.phrase()
                ));
            }
            steps.push(ProcedureStep {
                label: sub.text,
                critical: step.critical,
                state_specific: false,
            });
        }
        if phase.id == FIRST_SIGN_PHASE_ID {
            if let Some(extra) = inserts.take() {
                steps.extend(extra.into_iter().map(|s| ProcedureStep {
                    label: s.label,
                    critical: s.critical,
                    state_specific: true,
                }));
            }
        }
        phases.push(ProcedurePhase {
            id: phase.id.clone(),
            title: phase.title.clone(),
            steps,
        });
    }
    phases
}

fn header(form: &FormInput, generated: NaiveDate) -> Header {
    Header {
        title: SOP_TITLE,
        configuration: form.road_type.display_name(),
        speed_mph: form.speed,
        state: form.state.name(),
        duration: form.duration.display_name(),
        control: form.control.display_name(),
        generated: generated.format("%m/%d/%Y").to_string(),
    }
}

fn equipment(record: &ScenarioRecord, form: &FormInput, cones: &ConeQuantities) -> EquipmentList {
    let crew = policy::crew_size(form.road_type, form.control);
    let two_lane = form.road_type.is_two_lane();

    let mut devices = vec![EquipmentItem {
        text: format!(
            "Traffic cones (28\" minimum): {} total (includes 20% contingency)",
            cones.total
        ),
        details: vec![
            format!("Taper: {} cones", cones.taper),
            format!("Buffer: {} cones", cones.buffer),
            format!("Work area: {} cones", cones.work_area),
            format!("Termination: {} cones", cones.termination),
        ],
        state_specific: false,
    }];

    if two_lane {
        devices.push(EquipmentItem::plain(
            "Road Work Ahead signs (W20-1): 2 required (one per approach)",
        ));
        devices.push(EquipmentItem::plain("One Lane Road Ahead signs (W20-4): 2 required"));
        match form.control {
            ControlMethod::Flagger => {
                devices.push(EquipmentItem::plain("Flagger Ahead signs (W20-7): 2 required"));
                devices.push(EquipmentItem::plain("Be Prepared to Stop signs (W3-4): 2 required"));
            }
            ControlMethod::Afad => {
                devices.push(EquipmentItem::plain("AFAD Ahead signs: 2 required"))
            }
            ControlMethod::SignsOnly => {}
        }
    } else {
        devices.push(EquipmentItem::plain("Road Work Ahead sign (W20-1): 1 required"));
        devices.push(EquipmentItem::plain("Lane Closed Ahead sign (W20-5): 1 required"));
    }

    if policy::florida_duration_signs(form) {
        devices.push(EquipmentItem::mandatory(
            "FL REQUIRED: Speeding Fines Doubled sign (48\"x30\"): 2 required",
        ));
        devices.push(EquipmentItem::mandatory(
            "FL REQUIRED: End Road Work sign (48\"x48\"): 2 required",
        ));
    }
    if policy::florida_rumble_strips(form) {
        devices.push(EquipmentItem::mandatory(
            "FL REQUIRED: Rumble Strips Ahead sign (48\"x30\"): 2 required",
        ));
    }
    devices.push(EquipmentItem::plain(format!(
        "Sign stands: {} minimum",
        if two_lane { "8-10" } else { "4-6" }
    )));

    let mut special = Vec::new();
    if record.arrow_board_required {
        special.push(EquipmentItem::mandatory(
            "MANDATORY: Arrow board (Type C minimum, 48\"x24\") - Tennessee requirement",
        ));
    }
    if record.tma_required {
        let basis = match policy::tma_mandate(form.state) {
            Some(m) => format!("{} requirement at {}+ mph", form.state, m.threshold_mph),
            None => "required for this configuration".to_string(),
        };
        special.push(EquipmentItem::mandatory(format!(
            "MANDATORY: TMA (Truck-Mounted Attenuator), MASH/NCHRP 350 compliant - {}",
            basis
        )));
    }
    match form.control {
        ControlMethod::Flagger => special.push(EquipmentItem::plain(
            "STOP/SLOW paddles: 2 required (one per flagger)",
        )),
        ControlMethod::Afad => special.push(EquipmentItem::plain(
            "AFAD unit (Automated Flagger Assistance Device): 1 required",
        )),
        ControlMethod::SignsOnly => {}
    }

    let vest = VestClass::for_speed(form.speed);
    let vest_note = match vest {
        VestClass::Class3 => "HIGH SPEED REQUIREMENT",
        VestClass::Class2 => "minimum",
    };
    let ppe = vec![
        EquipmentItem::plain(format!("ANSI {} safety vest ({})", vest.label(), vest_note)),
        EquipmentItem::plain("ANSI Z89.1 hard hat with chin strap"),
        EquipmentItem::plain("ANSI Z87.1 safety glasses"),
        EquipmentItem::plain("Steel-toe work boots (ASTM F2413)"),
        EquipmentItem::plain("Storm whistle on breakaway lanyard (emergency use only)"),
        EquipmentItem::plain("Work gloves"),
        EquipmentItem::plain("High-visibility rain gear (if weather requires)"),
    ];

    let radios = if form.control == ControlMethod::Flagger {
        "4 minimum (all crew)"
    } else {
        "2 minimum"
    };
    let communication = vec![
        EquipmentItem::plain(format!("Two-way radios: {}", radios)),
        EquipmentItem::plain(format!("Storm whistles: {} (one per crew member)", crew.size)),
        EquipmentItem::plain("First aid kit"),
        EquipmentItem::plain("Fire extinguisher (ABC rated, 5 lb minimum)"),
        EquipmentItem::plain("Emergency contact list"),
    ];

    let mut vehicles = vec![EquipmentItem::plain("Shadow vehicle with amber warning lights")];
    if record.tma_required {
        vehicles.push(EquipmentItem::plain("TMA vehicle (unoccupied during work)"));
    }
    vehicles.push(EquipmentItem::plain("Work vehicle(s) for equipment transport"));

    EquipmentList {
        categories: vec![
            EquipmentCategory {
                title: "Traffic Control Devices",
                note: None,
                items: devices,
            },
            EquipmentCategory {
                title: "Special Equipment",
                note: None,
                items: special,
            },
            EquipmentCategory {
                title: "Personal Protective Equipment (PPE)",
                note: Some(format!("Required for ALL {} crew members", crew.size)),
                items: ppe,
            },
            EquipmentCategory {
                title: "Communication & Safety",
                note: None,
                items: communication,
            },
            EquipmentCategory {
                title: "Vehicles",
                note: None,
                items: vehicles,
            },
        ],
    }
}

fn blank(label: &str) -> String {
    format!("{}: {}", label, BLANK)
}

fn briefing(form: &FormInput) -> Briefing {
    let mut roster = vec![blank("Driver"), blank("Qualified Observer")];
    if form.control == ControlMethod::Flagger {
        roster.push(blank("Flagger A"));
        roster.push(blank("Flagger B"));
    }
    roster.push("Verify all certifications current (flagger, first aid)".to_string());

    let visibility = if form.speed > policy::HIGH_SPEED_ZONE_MPH {
        "Visibility: CRITICAL - High speed zone"
    } else {
        "Visibility: Minimum 500 ft required"
    };

    let blocks = vec![
        BriefingBlock {
            title: "1. Site Information Review",
            critical: false,
            banner: None,
            items: vec![
                blank("Location"),
                format!("Posted speed: {} mph", form.speed),
                format!("Road type: {}", form.road_type.as_str()),
                format!("State: {}", form.state.name()),
                format!("Work duration: {}", form.duration.as_str()),
                blank("Date/Time"),
            ],
            notes: Vec::new(),
        },
        BriefingBlock {
            title: "2. Crew Roster & Role Assignments",
            critical: false,
            banner: None,
            items: roster,
            notes: Vec::new(),
        },
        BriefingBlock {
            title: "3. Hazard Assessment",
            critical: false,
            banner: None,
            items: vec![
                blank("Traffic volume"),
                blank("Vehicle speeds observed"),
                blank("Weather conditions"),
                visibility.to_string(),
                blank("Road surface condition"),
                blank("Sight distance adequate"),
                blank("Shoulders wide enough"),
                blank("Overhead hazards (power lines)"),
                blank("Underground utilities marked"),
            ],
            notes: Vec::new(),
        },
        BriefingBlock {
            title: "4. Escape Route Identification (MANDATORY)",
            critical: true,
            banner: Some("ESCAPE ROUTE IS MANDATORY, NOT OPTIONAL"),
            items: vec![
                blank("Escape route identified - Approach A"),
                blank("Escape route identified - Approach B"),
                "Physically walk escape routes to verify clear".to_string(),
                "Escape routes reachable in 2-3 seconds maximum".to_string(),
                "Escape routes on level ground (not slope/embankment)".to_string(),
                "ALL crew members understand where escape routes are".to_string(),
            ],
            notes: vec![
                "ESCAPE ROUTE CANNOT BE:",
                "Another roadway or active traffic lane",
                "Steep slope or embankment",
                "Behind guardrail or barrier",
                "Body of water or drainage ditch",
                "Railroad tracks",
            ],
        },
        BriefingBlock {
            title: "5. Storm Whistle Signals",
            critical: false,
            banner: None,
            items: vec![
                "Storm whistle signal agreed: 3 short blasts = DANGER, GO TO ESCAPE ROUTE"
                    .to_string(),
                "All crew members have whistle on breakaway lanyard".to_string(),
                "Test whistles - audible at distance".to_string(),
                "Confirm: Whistle is ONLY for emergency (not for getting attention)".to_string(),
            ],
            notes: Vec::new(),
        },
        BriefingBlock {
            title: "6. Emergency Procedures",
            critical: false,
            banner: None,
            items: vec![
                blank("Nearest hospital"),
                blank("Hospital address"),
                blank("Emergency contact"),
                blank("Supervisor phone"),
                "Radio channels verified - all crew can communicate".to_string(),
                "Emergency response plan reviewed".to_string(),
            ],
            notes: Vec::new(),
        },
        BriefingBlock {
            title: "7. Stop Work Authority",
            critical: true,
            banner: Some(concat!(
                "ANY crew member can call STOP WORK at ANY time, for ANY safety concern. ",
                "No justification needed. No retaliation."
            )),
            items: vec![
                "All crew understand stop work authority".to_string(),
                "Stop work conditions reviewed".to_string(),
            ],
            notes: vec![
                "Loss of qualified observer",
                "Visibility below 500 feet",
                "PPE failure or damage",
                "Equipment malfunction",
                "Severe weather approaching",
                "Near-miss incident",
                "ANY unsafe condition",
            ],
        },
        BriefingBlock {
            title: "8. Questions & Concerns",
            critical: false,
            banner: None,
            items: vec![
                "All crew members given opportunity to ask questions".to_string(),
                "All concerns addressed before beginning work".to_string(),
                "Crew confirms understanding of plan".to_string(),
            ],
            notes: Vec::new(),
        },
    ];

    Briefing {
        duration_note: "10-15 minutes minimum, 20-30 minutes for complex sites",
        attendance_note: "ALL crew members must attend and sign documentation",
        blocks,
        sign_off_lines: 4,
    }
}

fn reference(record: &ScenarioRecord) -> ReferenceCard {
    ReferenceCard {
        errant_vehicle: vec![
            "DROP equipment immediately",
            "MOVE quickly to escape route",
            "BLOW storm whistle (3 short blasts)",
            "DO NOT attempt to stop vehicle",
            "GET TO SAFETY - equipment can be replaced",
        ],
        stop_work: vec![
            "Qualified observer absent or distracted",
            "Visibility drops below 500 feet",
            "PPE damaged or unavailable",
            "Equipment malfunction",
            "Severe weather approaching",
            "Near-miss incident occurs",
            "ANY unsafe condition observed",
        ],
        whistle_protocol: vec![
            ("Signal", "3 short blasts"),
            ("Meaning", "DANGER - GO TO ESCAPE ROUTE"),
            ("DO use for", "Errant vehicle, imminent collision"),
            ("DO NOT use for", "Getting attention, signaling, directing traffic"),
        ],
        contacts: vec!["Emergency (911)", "Supervisor", "Safety Officer", "Nearest Hospital"],
        spacing: vec![
            ("Sign A Distance", record.sign_a_distance_ft),
            ("Sign B Distance", record.sign_b_distance_ft),
            ("Sign C Distance", record.sign_c_distance_ft),
            ("Taper Length", record.taper_length_ft),
            ("Buffer Space", record.buffer_space_ft),
            ("Cone Spacing (Taper)", record.cone_spacing_taper_ft),
            ("Cone Spacing (Tangent)", record.cone_spacing_tangent_ft),
        ],
    }
}

// =============================================================================
// Print rendering
// =============================================================================

fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(title.chars().count()))
}

fn subheading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "-".repeat(title.chars().count()))
}

fn checkbox(critical: bool) -> &'static str {
    if critical {
        "[ ] (!)"
    } else {
        "[ ]"
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, self.title)?;
        let marker = if self.banner_critical { "!! " } else { "" };
        writeln!(f, "{}{}", marker, self.banner)?;
        for phase in &self.phases {
            subheading(f, &phase.title)?;
            for step in &phase.steps {
                let tag = if step.state_specific { " [state]" } else { "" };
                writeln!(f, "  {} {}{}", checkbox(step.critical), step.label, tag)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for SopSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SopSection::Header(h) => {
                heading(f, h.title)?;
                writeln!(f, "Configuration:  {}", h.configuration)?;
                writeln!(f, "Posted Speed:   {} mph", h.speed_mph)?;
                writeln!(f, "State:          {}", h.state)?;
                writeln!(f, "Duration:       {}", h.duration)?;
                writeln!(f, "Control Method: {}", h.control)?;
                writeln!(f, "Generated:      {}", h.generated)
            }
            SopSection::SafetySummary(s) => {
                heading(f, "Critical Safety Requirements")?;
                for alert in &s.alerts {
                    let marker = if alert.critical { "!! " } else { "" };
                    writeln!(f, "  {}{}", marker, alert.text)?;
                }
                subheading(f, "3 Cardinal Safety Rules (Non-Negotiable)")?;
                for (i, (title, text)) in s.cardinal_rules.iter().enumerate() {
                    writeln!(f, "  {}. {}: {}", i + 1, title, text)?;
                }
                Ok(())
            }
            SopSection::Equipment(e) => {
                heading(f, "Required Equipment & Materials")?;
                for cat in &e.categories {
                    subheading(f, cat.title)?;
                    if let Some(note) = &cat.note {
                        writeln!(f, "  {}:", note)?;
                    }
                    for item in &cat.items {
                        let marker = if item.state_specific { "!! " } else { "" };
                        writeln!(f, "  - {}{}", marker, item.text)?;
                        for d in &item.details {
                            writeln!(f, "      - {}", d)?;
                        }
                    }
                }
                Ok(())
            }
            SopSection::Briefing(b) => {
                heading(f, "Pre-Job Safety Briefing (PJSB)")?;
                writeln!(f, "Duration: {}", b.duration_note)?;
                writeln!(f, "Required: {}", b.attendance_note)?;
                for block in &b.blocks {
                    subheading(f, block.title)?;
                    if let Some(banner) = block.banner {
                        writeln!(f, "  !! {}", banner)?;
                    }
                    for item in &block.items {
                        writeln!(f, "  [ ] {}", item)?;
                    }
                    for note in &block.notes {
                        writeln!(f, "      - {}", note)?;
                    }
                }
                subheading(f, "9. PJSB Sign-Off")?;
                writeln!(
                    f,
                    "  ALL crew members must sign acknowledging attendance and understanding:"
                )?;
                for _ in 0..b.sign_off_lines {
                    writeln!(f, "  Name: {}  Signature: {}", BLANK, BLANK)?;
                }
                Ok(())
            }
            SopSection::Setup(p) | SopSection::Breakdown(p) => fmt::Display::fmt(p, f),
            SopSection::Reference(r) => {
                heading(f, "Quick Safety Reference")?;
                subheading(f, "If You See Errant Vehicle")?;
                for (i, step) in r.errant_vehicle.iter().enumerate() {
                    writeln!(f, "  {}. {}", i + 1, step)?;
                }
                subheading(f, "Stop Work Immediately If:")?;
                for item in &r.stop_work {
                    writeln!(f, "  - {}", item)?;
                }
                subheading(f, "Storm Whistle Protocol")?;
                for (k, v) in &r.whistle_protocol {
                    writeln!(f, "  {}: {}", k, v)?;
                }
                subheading(f, "Emergency Contacts")?;
                for c in &r.contacts {
                    writeln!(f, "  {}: {}", c, BLANK)?;
                }
                subheading(f, "Critical Spacing Values (This Configuration)")?;
                for (label, ft) in &r.spacing {
                    writeln!(f, "  {:<24} {} ft", format!("{}:", label), ft)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for SopDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            fmt::Display::fmt(section, f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{Phase, Placeholder, Step};
    use crate::policy::AlertKind;
    use crate::quantities::cone_quantities;
    use crate::scenario::tests::sample_record;
    use crate::scenario::{RoadType, StateCode, WorkDuration};

    fn step(label: &str, critical: bool) -> Step {
        Step {
            label: label.to_string(),
            critical,
            placeholders: Vec::new(),
        }
    }

    fn templates() -> Templates {
        Templates {
            setup: ChecklistTemplate {
                sections: vec![
                    Phase {
                        id: "phase-0-prep".to_string(),
                        title: "Phase 0: Preparation".to_string(),
                        items: vec![step("Complete PJSB", true)],
                    },
                    Phase {
                        id: FIRST_SIGN_PHASE_ID.to_string(),
                        title: "Phase 1: Sign A".to_string(),
                        items: vec![step("Drive to Sign A location", true)],
                    },
                    Phase {
                        id: "phase-3-taper".to_string(),
                        title: "Phase 3: Taper".to_string(),
                        items: vec![
                            Step {
                                label: "Refer to spacing calculator for taper length".to_string(),
                                critical: false,
                                placeholders: vec![Placeholder::TaperLength],
                            },
                            Step {
                                label: "Place taper cones".to_string(),
                                critical: false,
                                placeholders: vec![Placeholder::ConeSpacingBand],
                            },
                        ],
                    },
                ],
            },
            breakdown: ChecklistTemplate {
                sections: vec![Phase {
                    id: "phase-1-remove-cones".to_string(),
                    title: "Phase 1: Remove cones".to_string(),
                    items: vec![step("Remove cones against traffic from Sign A location", true)],
                }],
            },
        }
    }

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

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn build(record: &ScenarioRecord, form: &FormInput) -> SopDocument {
        let tpl = templates();
        let cones = cone_quantities(record, form.work_area_ft).unwrap();
        SopAssembler::new(&tpl).assemble(record, form, &cones, date())
    }

    #[test]
    fn test_section_order() {
        let rec = sample_record();
        let doc = build(&rec, &form_for(&rec));
        assert_eq!(
            doc.section_names(),
            vec![
                "header",
                "safety_summary",
                "equipment",
                "briefing",
                "setup",
                "breakdown",
                "reference"
            ]
        );
    }

    #[test]
    fn test_state_steps_follow_first_sign_phase() {
        let rec = sample_record();
        let doc = build(&rec, &form_for(&rec));
        let setup = doc.setup().unwrap();
        assert_eq!(setup.phases[0].steps.len(), 1);
        let signs = &setup.phases[1];
        assert_eq!(signs.steps.len(), 3);
        assert_eq!(
            signs.steps[0].label,
            "Drive to Sign A location (350 ft from work area)"
        );
        assert!(signs.steps[1].state_specific);
        assert!(signs.steps[1].label.contains("Speeding Fines Doubled"));
        assert!(setup.phases[2].steps.iter().all(|s| !s.state_specific));
    }

    #[test]
    fn test_breakdown_gets_no_insertions() {
        let mut rec = sample_record();
        rec.tma_required = true;
        rec.arrow_board_required = true;
        let doc = build(&rec, &form_for(&rec));
        let breakdown = doc.breakdown().unwrap();
        assert_eq!(breakdown.phases[0].steps.len(), 1);
        assert!(breakdown.phases[0].steps[0].label.contains("(350 ft from work area)"));
    }

    #[test]
    fn test_missing_placeholder_reported() {
        let rec = sample_record();
        let doc = build(&rec, &form_for(&rec));
        assert_eq!(doc.warnings.len(), 1);
        assert!(doc.warnings[0].contains("Place taper cones"));
    }

    #[test]
    fn test_duration_alert_depends_on_duration() {
        let rec = sample_record();
        let mut form = form_for(&rec);
        let has_alert = |doc: &SopDocument| {
            doc.safety_summary()
                .unwrap()
                .alerts
                .iter()
                .any(|a| a.kind == AlertKind::DurationSigns)
        };
        assert!(has_alert(&build(&rec, &form)));
        form.duration = WorkDuration::ShortTerm;
        assert!(!has_alert(&build(&rec, &form)));
    }

    #[test]
    fn test_equipment_for_multilane_tma() {
        let mut rec = sample_record();
        rec.road_type = RoadType::MultiLaneDivided;
        rec.control_method = ControlMethod::SignsOnly;
        rec.state = StateCode::Nc;
        rec.tma_required = true;
        let form = form_for(&rec);
        let doc = build(&rec, &form);
        let eq = doc.equipment().unwrap();
        let devices: Vec<&str> = eq.categories[0].items.iter().map(|i| i.text.as_str()).collect();
        assert!(devices.contains(&"Sign stands: 4-6 minimum"));
        assert!(eq.categories[1].items[0].text.contains("NC requirement at 55+ mph"));
        assert_eq!(eq.categories[4].items.len(), 3);
    }

    fn texts(items: &[EquipmentItem]) -> Vec<&str> {
        items.iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn test_reference_card_echoes_record_spacing() {
        let mut rec = sample_record();
        rec.sign_a_distance_ft = 1000;
        rec.sign_b_distance_ft = 1500;
        rec.sign_c_distance_ft = 2640;
        rec.taper_length_ft = 720;
        rec.buffer_space_ft = 570;
        rec.cone_spacing_taper_ft = 40;
        rec.cone_spacing_tangent_ft = 80;
        let doc = build(&rec, &form_for(&rec));
        let card = doc
            .sections
            .iter()
            .find_map(|s| match s {
                SopSection::Reference(card) => Some(card),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            card.spacing,
            vec![
                ("Sign A Distance", 1000),
                ("Sign B Distance", 1500),
                ("Sign C Distance", 2640),
                ("Taper Length", 720),
                ("Buffer Space", 570),
                ("Cone Spacing (Taper)", 40),
                ("Cone Spacing (Tangent)", 80),
            ]
        );
        assert!(doc.to_string().contains("2640"));
    }

    #[test]
    fn test_equipment_for_two_lane_flagger() {
        let rec = sample_record();
        let doc = build(&rec, &form_for(&rec));
        let alerts = &doc.safety_summary().unwrap().alerts;
        assert_eq!(alerts[0].kind, AlertKind::Vest);
        assert_eq!(alerts[0].text, "ANSI Class 3 vests REQUIRED (speed >=45 mph)");

        let eq = doc.equipment().unwrap();
        assert!(texts(&eq.categories[0].items).contains(&"Sign stands: 8-10 minimum"));
        assert_eq!(
            texts(&eq.categories[1].items),
            vec!["STOP/SLOW paddles: 2 required (one per flagger)"]
        );
        assert_eq!(
            eq.categories[2].items[0].text,
            "ANSI Class 3 safety vest (HIGH SPEED REQUIREMENT)"
        );
        assert_eq!(
            eq.categories[2].note.as_deref(),
            Some("Required for ALL 4 crew members")
        );
        let comms = texts(&eq.categories[3].items);
        assert!(comms.contains(&"Two-way radios: 4 minimum (all crew)"));
        assert!(comms.contains(&"Storm whistles: 4 (one per crew member)"));
    }

    #[test]
    fn test_equipment_for_low_speed_afad() {
        let mut rec = sample_record();
        rec.speed_limit = 35;
        rec.control_method = ControlMethod::Afad;
        let doc = build(&rec, &form_for(&rec));
        let alerts = &doc.safety_summary().unwrap().alerts;
        assert_eq!(alerts[0].text, "ANSI Class 2 vests minimum");

        let eq = doc.equipment().unwrap();
        assert_eq!(
            texts(&eq.categories[1].items),
            vec!["AFAD unit (Automated Flagger Assistance Device): 1 required"]
        );
        assert_eq!(eq.categories[2].items[0].text, "ANSI Class 2 safety vest (minimum)");
        let comms = texts(&eq.categories[3].items);
        assert!(comms.contains(&"Two-way radios: 2 minimum"));
        assert!(comms.contains(&"Storm whistles: 3 (one per crew member)"));
    }

    #[test]
    fn test_text_rendering_contains_key_parts() {
        let rec = sample_record();
        let text = build(&rec, &form_for(&rec)).to_string();
        assert!(text.contains(SOP_TITLE));
        assert!(text.contains("Generated:      03/14/2025"));
        assert!(text.contains("State:          Florida"));
        assert!(text.contains("Flagger A"));
        assert!(text.contains("Taper length: 100 ft"));
    }
}
