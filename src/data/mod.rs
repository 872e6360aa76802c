//! Static data feeds: the scenario table and the two checklist templates.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::checklist::ChecklistTemplate;
use crate::error::DataError;
use crate::logging;
use crate::scenario::ScenarioRecord;

pub mod source;

pub use source::{DataSource, Fetcher, StaticFetcher};

/// The loaded scenario table, in stored order, with unique keys.
#[derive(Debug, Clone)]
pub struct ScenarioTable {
    records: Vec<ScenarioRecord>,
    hash_sha256: String,
}

impl ScenarioTable {
    pub fn from_records(records: Vec<ScenarioRecord>) -> Result<Self, DataError> {
        let bytes = serde_json::to_vec(&records).map_err(|e| DataError::Parse {
            source: "in-memory".to_string(),
            message: e.to_string(),
        })?;
        Self::build(records, sha256_hex(&bytes))
    }

    pub fn from_json(source: &str, bytes: &[u8]) -> Result<Self, DataError> {
        let records: Vec<ScenarioRecord> =
            serde_json::from_slice(bytes).map_err(|e| DataError::Parse {
                source: source.to_string(),
                message: e.to_string(),
            })?;
        Self::build(records, sha256_hex(bytes))
    }

    fn build(records: Vec<ScenarioRecord>, hash_sha256: String) -> Result<Self, DataError> {
        let mut seen = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            if let Some(first) = seen.insert(record.key(), idx) {
                return Err(DataError::DuplicateKey {
                    key: record.key(),
                    first,
                    duplicate: idx,
                });
            }
        }
        Ok(Self {
            records,
            hash_sha256,
        })
    }

    pub fn records(&self) -> &[ScenarioRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn hash_sha256(&self) -> &str {
        &self.hash_sha256
    }
}

/// Both checklist templates, loaded as a pair.
#[derive(Debug, Clone)]
pub struct Templates {
    pub setup: ChecklistTemplate,
    pub breakdown: ChecklistTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedManifest {
    pub source: String,
    pub hash_sha256: String,
    pub bytes: u64,
    pub entries: u64,
    pub steps: Option<u64>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub async fn load_table(
    fetcher: &dyn Fetcher,
    source: &DataSource,
) -> Result<(ScenarioTable, FeedManifest), DataError> {
    let _scope = logging::ProfileScope::new("data", "load_table");
    let desc = source.describe();
    let bytes = fetcher.fetch(source).await?;
    let table = ScenarioTable::from_json(&desc, &bytes)?;
    let manifest = FeedManifest {
        source: desc,
        hash_sha256: table.hash_sha256().to_string(),
        bytes: bytes.len() as u64,
        entries: table.len() as u64,
        steps: None,
    };
    logging::log_data_loaded(&manifest);
    Ok((table, manifest))
}

async fn load_template(
    fetcher: &dyn Fetcher,
    source: &DataSource,
) -> Result<(ChecklistTemplate, FeedManifest), DataError> {
    let desc = source.describe();
    let bytes = fetcher.fetch(source).await?;
    let template = ChecklistTemplate::from_json(&desc, &bytes)?;
    let manifest = FeedManifest {
        source: desc,
        hash_sha256: sha256_hex(&bytes),
        bytes: bytes.len() as u64,
        entries: template.sections.len() as u64,
        steps: Some(template.step_count() as u64),
    };
    logging::log_data_loaded(&manifest);
    Ok((template, manifest))
}

/// Fetch both templates; either failing fails the pair.
pub async fn load_templates(
    fetcher: &dyn Fetcher,
    setup: &DataSource,
    breakdown: &DataSource,
) -> Result<(Templates, Vec<FeedManifest>), DataError> {
    let _scope = logging::ProfileScope::new("data", "load_templates");
    let (setup_res, breakdown_res) =
        tokio::join!(load_template(fetcher, setup), load_template(fetcher, breakdown));
    let (setup_tpl, setup_manifest) = setup_res?;
    let (breakdown_tpl, breakdown_manifest) = breakdown_res?;
    setup_tpl.require_anchor(&setup_manifest.source)?;
    Ok((
        Templates {
            setup: setup_tpl,
            breakdown: breakdown_tpl,
        },
        vec![setup_manifest, breakdown_manifest],
    ))
}
