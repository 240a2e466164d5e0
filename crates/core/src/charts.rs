//! Chart specifications derived from stakeholder perspectives.
//!
//! The builders produce plain data (labels, values, colours, axis ranges) that
//! a front end renders interactively. Labels follow principle declaration order
//! and traces follow stakeholder declaration order.
//!
//! A builder that fails yields `None` for its chart and logs the error; the
//! remaining charts are still produced.

use crate::perspectives::{Perspectives, Principle, Stakeholder};
use serde::{Deserialize, Serialize};

pub const RADAR_TITLE: &str = "Weighting by Perspective";
pub const CONSENSUS_TITLE: &str = "Consensus and Dissent Analysis";
pub const COMPARATIVE_TITLE: &str = "Comparative Principle Analysis";

pub const RADAR_RANGE: [f64; 2] = [0.0, 5.0];
pub const CONSENSUS_RANGE: [f64; 2] = [0.0, 6.0];
pub const COMPARATIVE_RANGE: [f64; 2] = [0.0, 5.5];

const CONSENSUS_COLOR: &str = "#636EFA";

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("non-finite statistic for {0}")]
    NonFinite(&'static str),
}

/// Translucent fill used for a stakeholder's radar polygon.
pub fn radar_color(stakeholder: Stakeholder) -> &'static str {
    match stakeholder {
        Stakeholder::Medical => "rgba(239, 68, 68, 0.7)",
        Stakeholder::Family => "rgba(59, 130, 246, 0.7)",
        Stakeholder::Committee => "rgba(34, 197, 94, 0.7)",
    }
}

/// Solid colour used for a stakeholder's bars.
pub fn bar_color(stakeholder: Stakeholder) -> &'static str {
    match stakeholder {
        Stakeholder::Medical => "#EF4444",
        Stakeholder::Family => "#3B82F6",
        Stakeholder::Committee => "#22C55E",
    }
}

fn principle_labels() -> Vec<String> {
    Principle::ALL.iter().map(|p| p.label().to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakeholderSeries {
    pub stakeholder: Stakeholder,
    pub name: String,
    pub color: String,
    pub values: Vec<u8>,
}

impl StakeholderSeries {
    fn new(stakeholder: Stakeholder, perspectives: &Perspectives, color: &str) -> Self {
        Self {
            stakeholder,
            name: stakeholder.label().to_string(),
            color: color.to_string(),
            values: perspectives.get(stakeholder).values().to_vec(),
        }
    }
}

/// One filled polygon per stakeholder over the four principles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarChart {
    pub title: String,
    pub axes: Vec<String>,
    pub radial_range: [f64; 2],
    pub series: Vec<StakeholderSeries>,
}

/// Mean score per principle with the population standard deviation as error bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusChart {
    pub title: String,
    pub labels: Vec<String>,
    pub means: Vec<f64>,
    pub std_devs: Vec<f64>,
    pub color: String,
    pub y_range: [f64; 2],
}

/// Grouped bars: one group per principle, one bar per stakeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeChart {
    pub title: String,
    pub labels: Vec<String>,
    pub series: Vec<StakeholderSeries>,
    pub y_title: String,
    pub legend_title: String,
    pub y_range: [f64; 2],
}

/// All chart specifications attached to a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSet {
    pub radar: Option<RadarChart>,
    pub consensus: Option<ConsensusChart>,
    pub comparative: Option<ComparativeChart>,
}

pub fn radar_chart(perspectives: &Perspectives) -> Result<RadarChart, ChartError> {
    Ok(RadarChart {
        title: RADAR_TITLE.to_string(),
        axes: principle_labels(),
        radial_range: RADAR_RANGE,
        series: Stakeholder::ALL
            .iter()
            .map(|&s| StakeholderSeries::new(s, perspectives, radar_color(s)))
            .collect(),
    })
}

pub fn consensus_chart(perspectives: &Perspectives) -> Result<ConsensusChart, ChartError> {
    let mut means = Vec::with_capacity(Principle::ALL.len());
    let mut std_devs = Vec::with_capacity(Principle::ALL.len());

    for principle in Principle::ALL {
        let values: Vec<f64> = perspectives
            .iter()
            .map(|(_, scores)| f64::from(scores.get(principle)))
            .collect();
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if !mean.is_finite() || !std_dev.is_finite() {
            return Err(ChartError::NonFinite(principle.label()));
        }
        means.push(mean);
        std_devs.push(std_dev);
    }

    Ok(ConsensusChart {
        title: CONSENSUS_TITLE.to_string(),
        labels: principle_labels(),
        means,
        std_devs,
        color: CONSENSUS_COLOR.to_string(),
        y_range: CONSENSUS_RANGE,
    })
}

pub fn comparative_chart(perspectives: &Perspectives) -> Result<ComparativeChart, ChartError> {
    Ok(ComparativeChart {
        title: COMPARATIVE_TITLE.to_string(),
        labels: principle_labels(),
        series: Stakeholder::ALL
            .iter()
            .map(|&s| StakeholderSeries::new(s, perspectives, bar_color(s)))
            .collect(),
        y_title: "Assigned score".to_string(),
        legend_title: "Perspectives".to_string(),
        y_range: COMPARATIVE_RANGE,
    })
}

fn logged<T>(chart: &str, result: Result<T, ChartError>) -> Option<T> {
    match result {
        Ok(spec) => Some(spec),
        Err(e) => {
            tracing::error!("failed to build {} chart: {}", chart, e);
            None
        }
    }
}

/// Builds every chart, degrading each failure to `None`.
pub fn build_charts(perspectives: &Perspectives) -> ChartSet {
    ChartSet {
        radar: logged("radar", radar_chart(perspectives)),
        consensus: logged("consensus", consensus_chart(perspectives)),
        comparative: logged("comparative", comparative_chart(perspectives)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perspectives::PrincipleScores;

    fn sample() -> Perspectives {
        Perspectives::new(
            PrincipleScores::new(5, 4, 3, 2).unwrap(),
            PrincipleScores::new(1, 4, 3, 2).unwrap(),
            PrincipleScores::new(3, 4, 0, 2).unwrap(),
        )
    }

    #[test]
    fn failed_builder_degrades_to_none() {
        let failed = logged("consensus", Err::<ConsensusChart, _>(ChartError::NonFinite("Autonomy")));
        assert!(failed.is_none());

        let built = logged("comparative", comparative_chart(&sample()));
        assert!(built.is_some());
    }

    #[test]
    fn radar_has_one_series_per_stakeholder_in_order() {
        let radar = radar_chart(&sample()).unwrap();
        assert_eq!(radar.axes, vec!["Autonomy", "Beneficence", "Non-maleficence", "Justice"]);
        assert_eq!(radar.radial_range, [0.0, 5.0]);

        let names: Vec<_> = radar.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Medical Team", "Family/Patient", "Ethics Committee"]);
        assert_eq!(radar.series[0].values, vec![5, 4, 3, 2]);
        assert_eq!(radar.series[1].color, "rgba(59, 130, 246, 0.7)");
    }

    #[test]
    fn consensus_uses_population_standard_deviation() {
        let chart = consensus_chart(&sample()).unwrap();

        assert_eq!(chart.y_range, [0.0, 6.0]);
        // Autonomy: 5, 1, 3 -> mean 3, variance 8/3
        assert!((chart.means[0] - 3.0).abs() < 1e-9);
        assert!((chart.std_devs[0] - (8.0f64 / 3.0).sqrt()).abs() < 1e-9);
        // Beneficence: unanimous
        assert!((chart.means[1] - 4.0).abs() < 1e-9);
        assert_eq!(chart.std_devs[1], 0.0);
        // Non-maleficence: 3, 3, 0 -> mean 2
        assert!((chart.means[2] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn comparative_chart_axes() {
        let chart = comparative_chart(&sample()).unwrap();
        assert_eq!(chart.y_range, [0.0, 5.5]);
        assert_eq!(chart.series.len(), 3);
        assert_eq!(chart.series[2].color, "#22C55E");
        assert_eq!(chart.series[2].values, vec![3, 4, 0, 2]);
    }

    #[test]
    fn build_charts_fills_every_chart() {
        let charts = build_charts(&Perspectives::default());
        assert!(charts.radar.is_some());
        assert!(charts.consensus.is_some());
        assert!(charts.comparative.is_some());
    }
}
