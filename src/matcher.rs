use crate::data::ScenarioTable;
use crate::error::AppError;
use crate::form::FormInput;
use crate::logging;
use crate::scenario::{ScenarioKey, ScenarioRecord};

/// First record in stored order whose key equals `key`. Exact match only.
pub fn find_match<'a>(
    table: &'a ScenarioTable,
    key: &ScenarioKey,
) -> Option<&'a ScenarioRecord> {
    table.records().iter().find(|r| r.key() == *key)
}

/// Validate the form, then look it up. Invalid forms never reach the table.
pub fn lookup<'a>(
    table: &'a ScenarioTable,
    form: &FormInput,
) -> Result<&'a ScenarioRecord, AppError> {
    form.validate()?;
    let key = form.key();
    match find_match(table, &key) {
        Some(record) => {
            logging::log_lookup(&key, true);
            Ok(record)
        }
        None => {
            logging::log_lookup(&key, false);
            Err(AppError::NoMatch(key))
        }
    }
}
