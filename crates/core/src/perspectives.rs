//! Stakeholder perspectives and their principle scores.
//!
//! Each of the three stakeholders weighs the four Beauchamp–Childress principles
//! on a 0–5 scale. All four scores are always present; unset scores are 0.

use crate::constants::{MAX_SCORE, MIN_SCORE};
use crate::error::{CaseError, CaseResult};
use serde::{Deserialize, Serialize};

/// A party whose view is weighed in the deliberation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stakeholder {
    Medical,
    Family,
    Committee,
}

impl Stakeholder {
    /// Declaration order; every ordered output follows it.
    pub const ALL: [Stakeholder; 3] = [
        Stakeholder::Medical,
        Stakeholder::Family,
        Stakeholder::Committee,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Stakeholder::Medical => "medical",
            Stakeholder::Family => "family",
            Stakeholder::Committee => "committee",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Stakeholder::Medical => "Medical Team",
            Stakeholder::Family => "Family/Patient",
            Stakeholder::Committee => "Ethics Committee",
        }
    }
}

impl std::fmt::Display for Stakeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One of the four principles of biomedical ethics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principle {
    Autonomy,
    Beneficence,
    NonMaleficence,
    Justice,
}

impl Principle {
    pub const ALL: [Principle; 4] = [
        Principle::Autonomy,
        Principle::Beneficence,
        Principle::NonMaleficence,
        Principle::Justice,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Principle::Autonomy => "Autonomy",
            Principle::Beneficence => "Beneficence",
            Principle::NonMaleficence => "Non-maleficence",
            Principle::Justice => "Justice",
        }
    }
}

impl std::fmt::Display for Principle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Raw, unvalidated scores as they arrive from a form or a stored document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoresForm {
    pub autonomy: Option<i64>,
    pub beneficence: Option<i64>,
    pub non_maleficence: Option<i64>,
    pub justice: Option<i64>,
}

/// Four principle scores, each guaranteed to lie in `0..=5`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScoresForm")]
pub struct PrincipleScores {
    autonomy: u8,
    beneficence: u8,
    non_maleficence: u8,
    justice: u8,
}

impl PrincipleScores {
    pub const ZERO: PrincipleScores = PrincipleScores {
        autonomy: 0,
        beneficence: 0,
        non_maleficence: 0,
        justice: 0,
    };

    /// Builds a score record, rejecting any value above [`MAX_SCORE`].
    pub fn new(autonomy: u8, beneficence: u8, non_maleficence: u8, justice: u8) -> CaseResult<Self> {
        let scores = Self {
            autonomy,
            beneficence,
            non_maleficence,
            justice,
        };
        for principle in Principle::ALL {
            let value = scores.get(principle);
            if value > MAX_SCORE {
                return Err(CaseError::OutOfRange {
                    field: principle.label().to_string(),
                    value: i64::from(value),
                    min: i64::from(MIN_SCORE),
                    max: i64::from(MAX_SCORE),
                });
            }
        }
        Ok(scores)
    }

    /// Validates raw form scores; a missing score defaults to 0.
    ///
    /// `context` names the stakeholder in error messages.
    pub fn from_form(form: &ScoresForm, context: &str) -> CaseResult<Self> {
        let check = |value: Option<i64>, principle: Principle| -> CaseResult<u8> {
            let value = value.unwrap_or(0);
            if !(i64::from(MIN_SCORE)..=i64::from(MAX_SCORE)).contains(&value) {
                return Err(CaseError::OutOfRange {
                    field: format!("{context} {}", principle.label()),
                    value,
                    min: i64::from(MIN_SCORE),
                    max: i64::from(MAX_SCORE),
                });
            }
            Ok(value as u8)
        };

        Ok(Self {
            autonomy: check(form.autonomy, Principle::Autonomy)?,
            beneficence: check(form.beneficence, Principle::Beneficence)?,
            non_maleficence: check(form.non_maleficence, Principle::NonMaleficence)?,
            justice: check(form.justice, Principle::Justice)?,
        })
    }

    pub fn get(&self, principle: Principle) -> u8 {
        match principle {
            Principle::Autonomy => self.autonomy,
            Principle::Beneficence => self.beneficence,
            Principle::NonMaleficence => self.non_maleficence,
            Principle::Justice => self.justice,
        }
    }

    /// Scores in principle declaration order.
    pub fn values(&self) -> [u8; 4] {
        Principle::ALL.map(|p| self.get(p))
    }

    pub fn total(&self) -> u32 {
        self.values().iter().map(|&v| u32::from(v)).sum()
    }

    /// Difference between the highest and lowest score.
    pub fn spread(&self) -> u8 {
        let values = self.values();
        let max = values.iter().copied().max().unwrap_or(0);
        let min = values.iter().copied().min().unwrap_or(0);
        max - min
    }
}

impl TryFrom<ScoresForm> for PrincipleScores {
    type Error = CaseError;

    fn try_from(form: ScoresForm) -> Result<Self, Self::Error> {
        PrincipleScores::from_form(&form, "score")
    }
}

/// Raw perspectives block of a case form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectivesForm {
    pub medical: ScoresForm,
    pub family: ScoresForm,
    pub committee: ScoresForm,
}

/// Scores of every stakeholder. All three are always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perspectives {
    #[serde(default)]
    pub medical: PrincipleScores,
    #[serde(default)]
    pub family: PrincipleScores,
    #[serde(default)]
    pub committee: PrincipleScores,
}

impl Perspectives {
    pub fn new(medical: PrincipleScores, family: PrincipleScores, committee: PrincipleScores) -> Self {
        Self {
            medical,
            family,
            committee,
        }
    }

    pub fn from_form(form: &PerspectivesForm) -> CaseResult<Self> {
        Ok(Self {
            medical: PrincipleScores::from_form(&form.medical, Stakeholder::Medical.label())?,
            family: PrincipleScores::from_form(&form.family, Stakeholder::Family.label())?,
            committee: PrincipleScores::from_form(&form.committee, Stakeholder::Committee.label())?,
        })
    }

    pub fn get(&self, stakeholder: Stakeholder) -> &PrincipleScores {
        match stakeholder {
            Stakeholder::Medical => &self.medical,
            Stakeholder::Family => &self.family,
            Stakeholder::Committee => &self.committee,
        }
    }

    /// Stakeholders and their scores in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Stakeholder, &PrincipleScores)> + '_ {
        Stakeholder::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_form_scores_default_to_zero() {
        let form = ScoresForm {
            autonomy: Some(4),
            ..Default::default()
        };
        let scores = PrincipleScores::from_form(&form, "test").unwrap();
        assert_eq!(scores.values(), [4, 0, 0, 0]);
    }

    #[test]
    fn out_of_range_form_score_is_rejected() {
        let form = ScoresForm {
            justice: Some(6),
            ..Default::default()
        };
        let err = PrincipleScores::from_form(&form, "Medical Team").unwrap_err();
        match err {
            CaseError::OutOfRange { field, value, .. } => {
                assert_eq!(field, "Medical Team Justice");
                assert_eq!(value, 6);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let negative = ScoresForm {
            autonomy: Some(-1),
            ..Default::default()
        };
        assert!(PrincipleScores::from_form(&negative, "x").is_err());
    }

    #[test]
    fn total_and_spread() {
        let scores = PrincipleScores::new(5, 5, 5, 1).unwrap();
        assert_eq!(scores.total(), 16);
        assert_eq!(scores.spread(), 4);
        assert_eq!(PrincipleScores::ZERO.spread(), 0);
    }

    #[test]
    fn iteration_follows_declaration_order() {
        let p = Perspectives::default();
        let order: Vec<_> = p.iter().map(|(s, _)| s).collect();
        assert_eq!(order, Stakeholder::ALL.to_vec());
    }

    #[test]
    fn stored_scores_are_validated_on_deserialize() {
        let ok: PrincipleScores =
            serde_json::from_str(r#"{"autonomy":1,"beneficence":2,"non_maleficence":3,"justice":4}"#)
                .unwrap();
        assert_eq!(ok.values(), [1, 2, 3, 4]);

        let partial: PrincipleScores = serde_json::from_str(r#"{"autonomy":2}"#).unwrap();
        assert_eq!(partial.values(), [2, 0, 0, 0]);

        let bad = serde_json::from_str::<PrincipleScores>(r#"{"autonomy":9}"#);
        assert!(bad.is_err());
    }
}
