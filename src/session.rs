//! One user session: the loaded feeds and the submit / generate actions.
//!
//! Submitting returns a `Calculation`; generating an SOP consumes one. No
//! result is remembered between the two calls.

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::{self, DataSource, FeedManifest, Fetcher, ScenarioTable, Templates};
use crate::error::{AppError, DataError, Feed};
use crate::form::{FormInput, RawForm};
use crate::logging;
use crate::matcher;
use crate::policy::{self, Crew};
use crate::quantities::{self, ConeQuantities};
use crate::results::{self, ResultsView};
use crate::scenario::ScenarioRecord;
use crate::sop::{SopAssembler, SopDocument};
use crate::state::{Config, DataSlot};

/// Everything a successful submit produced.
#[derive(Debug, Clone, Serialize)]
pub struct Calculation {
    pub record: ScenarioRecord,
    pub form: FormInput,
    pub cones: ConeQuantities,
    pub crew: Crew,
}

impl Calculation {
    pub fn view(&self) -> ResultsView {
        results::render(&self.record, &self.form, &self.cones)
    }
}

#[derive(Debug, Default)]
pub struct Session {
    table: DataSlot<ScenarioTable>,
    templates: DataSlot<Templates>,
    manifests: Vec<FeedManifest>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch all feeds concurrently and settle each slot with its outcome.
    pub async fn load(cfg: &Config, fetcher: &dyn Fetcher) -> Self {
        let mut session = Session::new();
        let table_fut = async {
            let src = DataSource::parse(&cfg.scenarios_source)?;
            data::load_table(fetcher, &src).await
        };
        let templates_fut = async {
            let setup = DataSource::parse(&cfg.setup_source)?;
            let breakdown = DataSource::parse(&cfg.breakdown_source)?;
            data::load_templates(fetcher, &setup, &breakdown).await
        };
        let (table_res, templates_res) = tokio::join!(table_fut, templates_fut);
        let mut manifests = Vec::new();
        let table_res = table_res.map(|(table, manifest)| {
            manifests.push(manifest);
            table
        });
        let templates_res = templates_res.map(|(templates, feed_manifests)| {
            manifests.extend(feed_manifests);
            templates
        });
        session.settle_table(table_res);
        session.settle_templates(templates_res);
        session.manifests = manifests;
        session
    }

    pub fn settle_table(&mut self, result: Result<ScenarioTable, DataError>) {
        if let Err(err) = &result {
            logging::log_load_failure(Feed::Scenarios, err);
        }
        self.table.settle(result);
    }

    pub fn settle_templates(&mut self, result: Result<Templates, DataError>) {
        if let Err(err) = &result {
            logging::log_load_failure(Feed::Templates, err);
        }
        self.templates.settle(result);
    }

    pub fn manifests(&self) -> &[FeedManifest] {
        &self.manifests
    }

    pub fn table(&self) -> Result<&ScenarioTable, AppError> {
        match &self.table {
            DataSlot::Ready(t) => Ok(t),
            DataSlot::Pending => Err(AppError::NotReady(Feed::Scenarios)),
            DataSlot::Failed(message) => Err(AppError::LoadFailed {
                feed: Feed::Scenarios,
                message: message.clone(),
            }),
        }
    }

    pub fn templates(&self) -> Result<&Templates, AppError> {
        match &self.templates {
            DataSlot::Ready(t) => Ok(t),
            DataSlot::Pending => Err(AppError::NotReady(Feed::Templates)),
            DataSlot::Failed(message) => Err(AppError::LoadFailed {
                feed: Feed::Templates,
                message: message.clone(),
            }),
        }
    }

    pub fn submit(&self, raw: &RawForm) -> Result<Calculation, AppError> {
        // Readiness is reported ahead of any field problem.
        self.table()?;
        let form = raw.parse()?;
        self.submit_input(form)
    }

    pub fn submit_input(&self, form: FormInput) -> Result<Calculation, AppError> {
        let table = self.table()?;
        let record = matcher::lookup(table, &form)?;
        let cones = quantities::cone_quantities(record, form.work_area_ft)?;
        Ok(Calculation {
            record: record.clone(),
            form,
            cones,
            crew: policy::crew_size(form.road_type, form.control),
        })
    }

    /// Compose the SOP for a calculation. Never returns a partial document.
    pub fn generate_sop(
        &self,
        calc: &Calculation,
        generated: NaiveDate,
    ) -> Result<SopDocument, AppError> {
        let templates = self.templates()?;
        let doc = SopAssembler::new(templates).assemble(
            &calc.record,
            &calc.form,
            &calc.cones,
            generated,
        );
        logging::log_sop_generated(&calc.form.key(), doc.sections.len(), doc.warnings.len());
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{ChecklistTemplate, Phase, Step, FIRST_SIGN_PHASE_ID};
    use crate::scenario::tests::sample_record;

    fn templates() -> Templates {
        let phase = |id: &str| Phase {
            id: id.to_string(),
            title: id.to_string(),
            items: vec![Step {
                label: "Check Sign A location".to_string(),
                critical: false,
                placeholders: Vec::new(),
            }],
        };
        Templates {
            setup: ChecklistTemplate {
                sections: vec![phase(FIRST_SIGN_PHASE_ID)],
            },
            breakdown: ChecklistTemplate {
                sections: vec![phase("phase-1-remove")],
            },
        }
    }

    fn raw() -> RawForm {
        RawForm {
            speed: "45".to_string(),
            road_type: "2-lane-2-way".to_string(),
            state: "FL".to_string(),
            duration: "long-term".to_string(),
            control: "flagger".to_string(),
            work_area: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 2).unwrap()
    }

    #[test]
    fn test_submit_before_load_is_not_ready() {
        let session = Session::new();
        assert_eq!(
            session.submit(&raw()).unwrap_err(),
            AppError::NotReady(Feed::Scenarios)
        );
    }

    #[test]
    fn test_submit_threads_calculation() {
        let mut session = Session::new();
        session.settle_table(ScenarioTable::from_records(vec![sample_record()]));
        let calc = session.submit(&raw()).unwrap();
        assert_eq!(calc.form.work_area_ft, 500);
        assert_eq!(calc.cones.total, 39);
        assert_eq!(calc.crew.size, 4);
        assert_eq!(calc.view().crew.size, 4);
    }

    #[test]
    fn test_sop_before_templates_is_not_ready() {
        let mut session = Session::new();
        session.settle_table(ScenarioTable::from_records(vec![sample_record()]));
        let calc = session.submit(&raw()).unwrap();
        assert_eq!(
            session.generate_sop(&calc, date()).unwrap_err(),
            AppError::NotReady(Feed::Templates)
        );
    }

    #[test]
    fn test_failed_template_load_is_terminal() {
        let mut session = Session::new();
        session.settle_table(ScenarioTable::from_records(vec![sample_record()]));
        session.settle_templates(Err(DataError::Template("boom".to_string())));
        // A late success does not revive the slot.
        session.settle_templates(Ok(templates()));
        let calc = session.submit(&raw()).unwrap();
        let err = session.generate_sop(&calc, date()).unwrap_err();
        assert!(matches!(err, AppError::LoadFailed { feed: Feed::Templates, .. }));
    }

    #[test]
    fn test_generate_after_load() {
        let mut session = Session::new();
        session.settle_table(ScenarioTable::from_records(vec![sample_record()]));
        session.settle_templates(Ok(templates()));
        let calc = session.submit(&raw()).unwrap();
        let doc = session.generate_sop(&calc, date()).unwrap();
        assert_eq!(doc.sections.len(), 7);
    }

    #[test]
    fn test_validation_precedes_no_match() {
        let mut session = Session::new();
        session.settle_table(ScenarioTable::from_records(vec![sample_record()]));
        let mut form = raw();
        form.road_type = "multi-lane-divided".to_string();
        assert!(matches!(
            session.submit(&form),
            Err(AppError::Validation(_))
        ));
    }
}
