use serde::Serialize;

use crate::error::AppError;
use crate::scenario::ScenarioRecord;

/// Contingency margin on top of the cone subtotal, as a ratio (6/5 = +20%).
const CONTINGENCY_NUM: u64 = 6;
const CONTINGENCY_DEN: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConeQuantities {
    pub taper: u64,
    pub buffer: u64,
    pub work_area: u64,
    pub termination: u64,
    pub subtotal: u64,
    pub total: u64,
}

/// Cone counts for a matched scenario. Partial intervals always round up.
pub fn cone_quantities(
    record: &ScenarioRecord,
    work_area_ft: u32,
) -> Result<ConeQuantities, AppError> {
    if record.cone_spacing_taper_ft == 0 || record.cone_spacing_tangent_ft == 0 {
        return Err(AppError::DataIntegrity(format!(
            "zero cone spacing for scenario [{}]",
            record.key()
        )));
    }

    let taper_spacing = u64::from(record.cone_spacing_taper_ft);
    let tangent_spacing = u64::from(record.cone_spacing_tangent_ft);

    let taper = u64::from(record.taper_length_ft).div_ceil(taper_spacing);
    let buffer = u64::from(record.buffer_space_ft).div_ceil(tangent_spacing);
    let work_area = u64::from(work_area_ft).div_ceil(tangent_spacing);
    let termination = taper;
    let subtotal = taper + buffer + work_area + termination;
    let total = with_contingency(subtotal);

    Ok(ConeQuantities {
        taper,
        buffer,
        work_area,
        termination,
        subtotal,
        total,
    })
}

/// ceil(subtotal * 1.2) without floating point.
pub fn with_contingency(subtotal: u64) -> u64 {
    (subtotal * CONTINGENCY_NUM).div_ceil(CONTINGENCY_DEN)
}
