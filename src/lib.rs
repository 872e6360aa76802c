//! Temporary traffic control planning: scenario lookup, device quantities and
//! printable setup/breakdown procedures for short-term work zones.

pub mod checklist;
pub mod data;
pub mod error;
pub mod form;
pub mod gate;
pub mod logging;
pub mod matcher;
pub mod policy;
pub mod quantities;
pub mod results;
pub mod scenario;
pub mod session;
pub mod sop;
pub mod state;
