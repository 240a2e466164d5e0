//! Informed consent text.
//!
//! Fills a fixed consent/assent template from a case and the dilemma knowledge
//! base. Each list missing from the knowledge base is rendered as a single
//! "Not specified" bullet; a list configured as empty renders no bullets.

use crate::case::Case;
use crate::constants::NOT_SPECIFIED;
use crate::knowledge_base::KnowledgeBase;
use chrono::{NaiveDate, Utc};

const RULE: &str = "------------------------------------------------------------------";

fn bullets(items: Option<&[String]>) -> String {
    match items {
        Some(items) => items
            .iter()
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n"),
        None => format!("- {NOT_SPECIFIED}"),
    }
}

/// Builds the consent text dated today.
pub fn build_consent_text(case: &Case, knowledge_base: &KnowledgeBase) -> String {
    build_consent_text_at(case, knowledge_base, Utc::now().date_naive())
}

/// Builds the consent text with an explicit date.
pub fn build_consent_text_at(case: &Case, knowledge_base: &KnowledgeBase, date: NaiveDate) -> String {
    let entry = knowledge_base.get(case.dilemma);
    let risks = bullets(entry.and_then(|e| e.risks.as_deref()));
    let benefits = bullets(entry.and_then(|e| e.benefits.as_deref()));
    let alternatives = bullets(entry.and_then(|e| e.alternatives.as_deref()));
    let regulations = bullets(entry.and_then(|e| e.regulations.as_deref()));

    let dilemma = case.dilemma.label();
    let patient = &case.patient;

    format!(
        "INFORMED CONSENT / ASSENT

Date: {date}
Case ID: {case_id}

{RULE}
PATIENT DETAILS
{RULE}
Name: {name}
Age: {age} years
Gender: {gender}
Main ethical dilemma: {dilemma}

{RULE}
INFORMATION ABOUT THE DECISION
{RULE}
In the context of your clinical situation, a main ethical dilemma related to \"{dilemma}\" has been identified. The information below is provided so that you (or your representative) can make an informed decision.

1. POTENTIAL RISKS:
{risks}

2. EXPECTED BENEFITS:
{benefits}

3. AVAILABLE ALTERNATIVES:
{alternatives}

4. REGULATORY AND ETHICAL FRAMEWORK:
This deliberation is framed by the following regulations and principles:
{regulations}

{RULE}
DECLARATION AND SIGNATURE
{RULE}
I declare that I have read (or have had read to me) and understood the information above. I have had the opportunity to ask questions and all of them have been answered to my satisfaction.

I understand that my decision is voluntary and that I may withdraw it at any time without affecting the quality of my medical care.

Signature of Patient/Legal Guardian: _________________________
Name: _________________________
Date: _________________________

Signature of Health Professional: _________________________
Name: {analyst}
Date: _________________________
",
        date = date.format("%Y-%m-%d"),
        case_id = case.case_id,
        name = patient.name,
        age = patient.age_years,
        gender = patient.gender,
        analyst = case.analyst,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{CaseForm, DilemmaCategory};

    fn case_for(dilemma: DilemmaCategory) -> Case {
        let form = CaseForm {
            case_id: Some("HC-9".into()),
            patient_name: Some("Mateo".into()),
            age_years: Some(71),
            analyst_name: Some("Dr. Vega".into()),
            dilemma: Some(dilemma),
            ..Default::default()
        };
        Case::from_form(&form).unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    #[test]
    fn configured_bullets_appear_verbatim_once() {
        let kb = KnowledgeBase::builtin().unwrap();
        let case = case_for(DilemmaCategory::TreatmentRefusal);
        let text = build_consent_text_at(&case, &kb, date());

        let entry = kb.get(DilemmaCategory::TreatmentRefusal).unwrap();
        let all = [&entry.risks, &entry.benefits, &entry.alternatives, &entry.regulations];
        for list in all {
            for item in list.as_ref().unwrap() {
                let bullet = format!("- {item}");
                assert_eq!(text.matches(&bullet).count(), 1, "bullet {bullet:?}");
            }
        }
        assert!(!text.contains(NOT_SPECIFIED));
    }

    #[test]
    fn missing_entry_degrades_to_placeholders() {
        let case = case_for(DilemmaCategory::Confidentiality);
        let text = build_consent_text_at(&case, &KnowledgeBase::empty(), date());
        assert_eq!(text.matches("- Not specified").count(), 4);
    }

    #[test]
    fn missing_list_degrades_only_that_section() {
        let kb = KnowledgeBase::from_yaml("organ_donation:\n  risks: [\"Family distress\"]\n").unwrap();
        let text = build_consent_text_at(&case_for(DilemmaCategory::OrganDonation), &kb, date());
        assert!(text.contains("1. POTENTIAL RISKS:\n- Family distress\n"));
        assert_eq!(text.matches("- Not specified").count(), 3);
    }

    #[test]
    fn empty_list_renders_an_empty_section() {
        let kb = KnowledgeBase::from_yaml("organ_donation:\n  risks: []\n").unwrap();
        let text = build_consent_text_at(&case_for(DilemmaCategory::OrganDonation), &kb, date());
        assert!(text.contains("1. POTENTIAL RISKS:\n\n\n2. EXPECTED BENEFITS:"));
        assert_eq!(text.matches("- Not specified").count(), 3);
    }

    #[test]
    fn header_and_signature_blocks_are_filled() {
        let text = build_consent_text_at(
            &case_for(DilemmaCategory::EndOfLifeCare),
            &KnowledgeBase::empty(),
            date(),
        );
        assert!(text.starts_with("INFORMED CONSENT / ASSENT\n"));
        assert!(text.contains("Date: 2024-05-20\nCase ID: HC-9\n"));
        assert!(text.contains("Name: Mateo\nAge: 71 years\nGender: N/A\n"));
        assert!(text.contains("Signature of Health Professional: _________________________\nName: Dr. Vega\n"));
    }
}
