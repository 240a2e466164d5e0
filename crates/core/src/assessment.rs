//! Ethical bias scoring.
//!
//! A deterministic rule engine over the three stakeholder score vectors. Every
//! rule is evaluated independently and contributes severity points; nothing
//! short-circuits. The point total maps onto a coarse [`Severity`].
//!
//! | Rule | Trigger | Points |
//! |---|---|---|
//! | [`BiasRule::PerspectiveOmitted`] | a stakeholder's four scores sum to 0 | 3 |
//! | [`BiasRule::PrincipleOmitted`] | a single score is 0 | 1 each |
//! | [`BiasRule::InternalImbalance`] | non-zero stakeholder with max − min ≥ 4 | 2 |
//! | [`BiasRule::ExternalImbalance`] | highest total − lowest total ≥ 8 | 2 |
//!
//! Stakeholders are visited in declaration order (medical, family, committee).
//! When several stakeholders share the highest or lowest total, the external
//! imbalance rule names the first of them in that order.

use crate::perspectives::{Perspectives, Principle, Stakeholder};
use serde::{Deserialize, Serialize};

/// Spread within one stakeholder at which the internal imbalance rule fires.
pub const INTERNAL_SPREAD_THRESHOLD: u8 = 4;

/// Gap between stakeholder totals at which the external imbalance rule fires.
pub const EXTERNAL_GAP_THRESHOLD: u32 = 8;

/// Point totals at or above which each severity applies.
pub const CRITICAL_POINTS: u32 = 5;
pub const MODERATE_POINTS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Moderate,
    Critical,
}

impl Severity {
    pub fn from_points(points: u32) -> Self {
        if points >= CRITICAL_POINTS {
            Severity::Critical
        } else if points >= MODERATE_POINTS {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Severity::Low => "Low",
            Severity::Moderate => "Moderate",
            Severity::Critical => "Critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasRule {
    PerspectiveOmitted,
    PrincipleOmitted,
    InternalImbalance,
    ExternalImbalance,
}

impl BiasRule {
    pub fn points(self) -> u32 {
        match self {
            BiasRule::PerspectiveOmitted => 3,
            BiasRule::PrincipleOmitted => 1,
            BiasRule::InternalImbalance => 2,
            BiasRule::ExternalImbalance => 2,
        }
    }
}

/// One fired rule with the text shown to the clinician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule: BiasRule,
    pub stakeholder: Stakeholder,
    pub warning: String,
    pub recommendation: String,
}

/// Result of scoring a case's perspectives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthicalAssessment {
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub severity: Severity,
    pub points: u32,
    pub findings: Vec<Finding>,
}

impl EthicalAssessment {
    pub fn count(&self, rule: BiasRule) -> usize {
        self.findings.iter().filter(|f| f.rule == rule).count()
    }
}

/// Scores a set of perspectives.
///
/// Never fails: an all-zero input is well formed and simply scores Critical.
pub fn assess(perspectives: &Perspectives) -> EthicalAssessment {
    let findings = find_biases(perspectives);

    let points = findings.iter().map(|f| f.rule.points()).sum();
    let warnings = findings.iter().map(|f| f.warning.clone()).collect();
    let recommendations = findings.iter().map(|f| f.recommendation.clone()).collect();

    EthicalAssessment {
        warnings,
        recommendations,
        severity: Severity::from_points(points),
        points,
        findings,
    }
}

/// Evaluates every rule and returns the fired findings in evaluation order.
pub fn find_biases(perspectives: &Perspectives) -> Vec<Finding> {
    let mut findings = Vec::new();

    for (stakeholder, scores) in perspectives.iter() {
        let total = scores.total();

        if total == 0 {
            findings.push(Finding {
                rule: BiasRule::PerspectiveOmitted,
                stakeholder,
                warning: format!(
                    "Omitted perspective: the '{stakeholder}' perspective did not assign a score to any principle."
                ),
                recommendation: format!(
                    "Check whether the weighting for '{stakeholder}' was left out by accident so the deliberation is complete."
                ),
            });
        }

        for principle in Principle::ALL {
            if scores.get(principle) == 0 {
                findings.push(principle_omitted(stakeholder, principle));
            }
        }

        if total > 0 {
            let spread = scores.spread();
            if spread >= INTERNAL_SPREAD_THRESHOLD {
                findings.push(Finding {
                    rule: BiasRule::InternalImbalance,
                    stakeholder,
                    warning: format!(
                        "High internal imbalance: within the '{stakeholder}' perspective the principles differ by {spread} points."
                    ),
                    recommendation: "Review whether the wide disparity in this perspective's weighting is sufficiently justified or calls for a more balanced deliberation.".to_string(),
                });
            }
        }
    }

    if let Some(finding) = external_imbalance(perspectives) {
        findings.push(finding);
    }

    findings
}

fn principle_omitted(stakeholder: Stakeholder, principle: Principle) -> Finding {
    Finding {
        rule: BiasRule::PrincipleOmitted,
        stakeholder,
        warning: format!(
            "Principle omitted in '{stakeholder}': the principle of '{principle}' has a value of 0."
        ),
        recommendation: format!(
            "Assess whether omitting the principle of '{principle}' from the '{stakeholder}' perspective is intentional and justified."
        ),
    }
}

fn external_imbalance(perspectives: &Perspectives) -> Option<Finding> {
    let totals: Vec<(Stakeholder, u32)> = perspectives
        .iter()
        .map(|(stakeholder, scores)| (stakeholder, scores.total()))
        .collect();

    if totals.len() < 2 {
        return None;
    }

    // First occurrence wins on ties.
    let mut max = totals[0];
    let mut min = totals[0];
    for &(stakeholder, total) in &totals[1..] {
        if total > max.1 {
            max = (stakeholder, total);
        }
        if total < min.1 {
            min = (stakeholder, total);
        }
    }

    if max.1 - min.1 < EXTERNAL_GAP_THRESHOLD {
        return None;
    }

    let (heaviest, lightest) = (max.0, min.0);
    Some(Finding {
        rule: BiasRule::ExternalImbalance,
        stakeholder: heaviest,
        warning: format!(
            "High external imbalance: the '{heaviest}' perspective carries significantly more total weight than '{lightest}'."
        ),
        recommendation: "Consider whether this dominance of one perspective over another suits the case or whether the weightings should be rebalanced for a fairer decision.".to_string(),
    })
}
