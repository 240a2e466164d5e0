//! Case model.
//!
//! A [`CaseForm`] is the raw submission: every field optional, numbers as
//! signed integers so out-of-range input can be reported rather than silently
//! wrapped. [`Case::from_form_at`] turns it into a validated [`Case`] with each
//! default spelled out.

use crate::constants::{MAX_AGE_YEARS, MAX_GESTATION_WEEKS, NOT_AVAILABLE};
use crate::error::{CaseError, CaseResult};
use crate::perspectives::{Perspectives, PerspectivesForm};
use bioethics_types::CaseId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed set of dilemma categories used to look up consent boilerplate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DilemmaCategory {
    #[default]
    EndOfLifeCare,
    InformedConsent,
    TreatmentRefusal,
    Confidentiality,
    ResourceAllocation,
    NeonatalCare,
    ReproductiveHealth,
    OrganDonation,
    ClinicalResearch,
}

impl DilemmaCategory {
    pub const ALL: [DilemmaCategory; 9] = [
        DilemmaCategory::EndOfLifeCare,
        DilemmaCategory::InformedConsent,
        DilemmaCategory::TreatmentRefusal,
        DilemmaCategory::Confidentiality,
        DilemmaCategory::ResourceAllocation,
        DilemmaCategory::NeonatalCare,
        DilemmaCategory::ReproductiveHealth,
        DilemmaCategory::OrganDonation,
        DilemmaCategory::ClinicalResearch,
    ];

    /// Stable key used in stored documents and knowledge-base files.
    pub fn key(self) -> &'static str {
        match self {
            DilemmaCategory::EndOfLifeCare => "end_of_life_care",
            DilemmaCategory::InformedConsent => "informed_consent",
            DilemmaCategory::TreatmentRefusal => "treatment_refusal",
            DilemmaCategory::Confidentiality => "confidentiality",
            DilemmaCategory::ResourceAllocation => "resource_allocation",
            DilemmaCategory::NeonatalCare => "neonatal_care",
            DilemmaCategory::ReproductiveHealth => "reproductive_health",
            DilemmaCategory::OrganDonation => "organ_donation",
            DilemmaCategory::ClinicalResearch => "clinical_research",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DilemmaCategory::EndOfLifeCare => "End-of-life care and limitation of treatment",
            DilemmaCategory::InformedConsent => "Informed consent",
            DilemmaCategory::TreatmentRefusal => "Refusal of treatment",
            DilemmaCategory::Confidentiality => "Confidentiality and disclosure",
            DilemmaCategory::ResourceAllocation => "Allocation of scarce resources",
            DilemmaCategory::NeonatalCare => "Neonatal care at the limit of viability",
            DilemmaCategory::ReproductiveHealth => "Reproductive health",
            DilemmaCategory::OrganDonation => "Organ donation and transplantation",
            DilemmaCategory::ClinicalResearch => "Clinical research",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl std::fmt::Display for DilemmaCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
    #[default]
    Unspecified,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
            Gender::Unspecified => NOT_AVAILABLE,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    #[default]
    Stable,
    Critical,
    Terminal,
    Neonate,
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Condition::Stable => "Stable",
            Condition::Critical => "Critical",
            Condition::Terminal => "Terminal",
            Condition::Neonate => "Neonate",
        })
    }
}

/// Patient identity fields of a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDetails {
    pub name: String,
    pub age_years: u8,
    pub gender: Gender,
    pub condition: Condition,
    pub gestation_weeks: u8,
}

/// Raw case submission. Every field is optional; see [`Case::from_form_at`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseForm {
    pub case_id: Option<String>,
    pub patient_name: Option<String>,
    pub age_years: Option<i64>,
    pub gender: Option<Gender>,
    pub condition: Option<Condition>,
    pub gestation_weeks: Option<i64>,
    pub analyst_name: Option<String>,
    pub dilemma: Option<DilemmaCategory>,
    pub case_description: Option<String>,
    pub sociocultural_context: Option<String>,
    pub ai_key_points: Option<String>,
    pub ai_clinical_history_analysis: Option<String>,
    pub perspectives: PerspectivesForm,
}

impl CaseForm {
    /// Returns the trimmed case id if one was supplied.
    pub fn supplied_case_id(&self) -> Option<&str> {
        self.case_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// A validated bioethical case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub case_id: CaseId,
    pub patient: PatientDetails,
    pub analyst: String,
    pub dilemma: DilemmaCategory,
    pub case_description: String,
    pub sociocultural_context: String,
    pub ai_key_points: String,
    pub ai_clinical_history_analysis: String,
    pub perspectives: Perspectives,
}

fn text_or(value: Option<&str>, default: &str) -> String {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn bounded(value: Option<i64>, field: &str, max: i64) -> CaseResult<u8> {
    let value = value.unwrap_or(0);
    if !(0..=max).contains(&value) {
        return Err(CaseError::OutOfRange {
            field: field.to_string(),
            value,
            min: 0,
            max,
        });
    }
    Ok(value as u8)
}

impl Case {
    /// Builds a case from a form, filling in defaults.
    ///
    /// A missing case id becomes `case_<unix seconds of now>`. Missing patient
    /// and analyst names become `N/A`, the condition defaults to stable and the
    /// dilemma to the first category. Numbers outside their range are rejected.
    pub fn from_form_at(form: &CaseForm, now: DateTime<Utc>) -> CaseResult<Self> {
        let case_id = match form.supplied_case_id() {
            Some(id) => CaseId::new(id)?,
            None => CaseId::new(format!("case_{}", now.timestamp()))?,
        };

        let patient = PatientDetails {
            name: text_or(form.patient_name.as_deref(), NOT_AVAILABLE),
            age_years: bounded(form.age_years, "age", MAX_AGE_YEARS)?,
            gender: form.gender.unwrap_or_default(),
            condition: form.condition.unwrap_or_default(),
            gestation_weeks: bounded(form.gestation_weeks, "gestation weeks", MAX_GESTATION_WEEKS)?,
        };

        Ok(Self {
            case_id,
            patient,
            analyst: text_or(form.analyst_name.as_deref(), NOT_AVAILABLE),
            dilemma: form.dilemma.unwrap_or_default(),
            case_description: text_or(form.case_description.as_deref(), ""),
            sociocultural_context: text_or(form.sociocultural_context.as_deref(), ""),
            ai_key_points: text_or(form.ai_key_points.as_deref(), ""),
            ai_clinical_history_analysis: text_or(form.ai_clinical_history_analysis.as_deref(), ""),
            perspectives: Perspectives::from_form(&form.perspectives)?,
        })
    }

    pub fn from_form(form: &CaseForm) -> CaseResult<Self> {
        Self::from_form_at(form, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_form_gets_explicit_defaults() {
        let case = Case::from_form_at(&CaseForm::default(), fixed_now()).unwrap();

        assert_eq!(case.case_id.as_str(), format!("case_{}", fixed_now().timestamp()));
        assert_eq!(case.patient.name, "N/A");
        assert_eq!(case.patient.age_years, 0);
        assert_eq!(case.patient.gender, Gender::Unspecified);
        assert_eq!(case.patient.condition, Condition::Stable);
        assert_eq!(case.analyst, "N/A");
        assert_eq!(case.dilemma, DilemmaCategory::EndOfLifeCare);
        assert_eq!(case.case_description, "");
        assert_eq!(case.perspectives, Perspectives::default());
    }

    #[test]
    fn text_fields_are_trimmed_and_blank_names_default() {
        let form = CaseForm {
            case_id: Some("  HC-77 ".into()),
            patient_name: Some("   ".into()),
            case_description: Some("  refuses dialysis \n".into()),
            ..Default::default()
        };
        let case = Case::from_form_at(&form, fixed_now()).unwrap();
        assert_eq!(case.case_id.as_str(), "HC-77");
        assert_eq!(case.patient.name, "N/A");
        assert_eq!(case.case_description, "refuses dialysis");
    }

    #[test]
    fn out_of_range_age_is_rejected() {
        let form = CaseForm {
            age_years: Some(121),
            ..Default::default()
        };
        let err = Case::from_form_at(&form, fixed_now()).unwrap_err();
        assert!(matches!(err, CaseError::OutOfRange { value: 121, .. }));
    }

    #[test]
    fn out_of_range_gestation_is_rejected() {
        let form = CaseForm {
            gestation_weeks: Some(43),
            ..Default::default()
        };
        assert!(Case::from_form_at(&form, fixed_now()).is_err());
    }

    #[test]
    fn form_deserializes_from_yaml() {
        let yaml = r#"
case_id: HC-1
patient_name: Ana
age_years: 0
gender: female
condition: neonate
gestation_weeks: 24
dilemma: neonatal_care
perspectives:
  medical: { autonomy: 2, beneficence: 5, non_maleficence: 4, justice: 3 }
  family: { autonomy: 5 }
"#;
        let form: CaseForm = serde_yaml::from_str(yaml).unwrap();
        let case = Case::from_form_at(&form, fixed_now()).unwrap();
        assert_eq!(case.dilemma, DilemmaCategory::NeonatalCare);
        assert_eq!(case.patient.gestation_weeks, 24);
        assert_eq!(case.perspectives.medical.values(), [2, 5, 4, 3]);
        assert_eq!(case.perspectives.family.values(), [5, 0, 0, 0]);
        assert_eq!(case.perspectives.committee.values(), [0, 0, 0, 0]);
    }

    #[test]
    fn dilemma_keys_round_trip() {
        for category in DilemmaCategory::ALL {
            assert_eq!(DilemmaCategory::from_key(category.key()), Some(category));
        }
        assert_eq!(DilemmaCategory::from_key("unknown"), None);
    }
}
