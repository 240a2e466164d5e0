use crate::assessment::assess;
use crate::case::{Case, CaseForm, Condition, DilemmaCategory, Gender};
use crate::charts::build_charts;
use crate::chat::ChatLog;
use crate::perspectives::{PerspectivesForm, ScoresForm};
use crate::report::{assemble, Report};

pub(crate) fn scores(a: i64, b: i64, n: i64, j: i64) -> ScoresForm {
    ScoresForm {
        autonomy: Some(a),
        beneficence: Some(b),
        non_maleficence: Some(n),
        justice: Some(j),
    }
}

pub(crate) fn sample_form(case_id: &str) -> CaseForm {
    CaseForm {
        case_id: Some(case_id.to_string()),
        patient_name: Some("Lucia".into()),
        age_years: Some(34),
        gender: Some(Gender::Female),
        condition: Some(Condition::Critical),
        analyst_name: Some("Dr. Ortiz".into()),
        dilemma: Some(DilemmaCategory::TreatmentRefusal),
        case_description: Some("Requests withdrawal of ventilation.".into()),
        perspectives: PerspectivesForm {
            medical: scores(5, 4, 3, 2),
            family: scores(3, 3, 3, 3),
            committee: scores(4, 4, 4, 4),
        },
        ..Default::default()
    }
}

pub(crate) fn sample_report(case_id: &str) -> Report {
    let case = Case::from_form(&sample_form(case_id)).expect("valid sample form");
    assemble(
        &case,
        None,
        ChatLog::new(),
        build_charts(&case.perspectives),
        assess(&case.perspectives),
    )
}
