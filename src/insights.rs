//! Per-patient risk insights: trend and summary over analyzed reports.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{OverallAssessment, ReportRecord, RiskLevel, Trend};

/// Direction of a patient's risk, earliest analyzed report against latest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
    pub trend: Trend,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub analyzed_count: usize,
    pub details: String,
}

/// Counts per risk level and the assessment derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub counts: BTreeMap<RiskLevel, usize>,
    /// Analyzed reports whose stored label is not a known level.
    pub unrecognized: usize,
    pub analyzed_count: usize,
    pub overall: OverallAssessment,
}

pub struct TrendAnalyzer;

impl TrendAnalyzer {
    /// Trend over `records` in any order. Unanalyzed records are ignored.
    ///
    /// Only the two endpoints are compared; what happens in between does not
    /// affect the result.
    pub fn analyze(records: &[ReportRecord]) -> TrendReport {
        let mut analyzed: Vec<&ReportRecord> = records.iter().filter(|r| r.is_analyzed()).collect();
        analyzed.sort_by_key(|r| (r.analyzed_at(), r.uploaded_at));

        let analyzed_count = analyzed.len();
        let (first, last) = match (analyzed.first(), analyzed.last()) {
            (Some(first), Some(last)) if analyzed_count >= 2 => (*first, *last),
            _ => {
                return TrendReport {
                    trend: Trend::InsufficientData,
                    earliest: analyzed.first().and_then(|r| r.risk_label()).map(str::to_string),
                    latest: None,
                    analyzed_count,
                    details: "Not enough analyzed reports to determine a trend.".into(),
                }
            }
        };

        let earliest = first.risk_label().unwrap_or_default().to_string();
        let latest = last.risk_label().unwrap_or_default().to_string();

        let (trend, details) = match (earliest.parse::<RiskLevel>(), latest.parse::<RiskLevel>()) {
            (Ok(from), Ok(to)) if to > from => (
                Trend::Worsening,
                format!("Risk has increased from {from} to {to}."),
            ),
            (Ok(from), Ok(to)) if to < from => (
                Trend::Improving,
                format!("Risk has decreased from {from} to {to}."),
            ),
            (Ok(from), Ok(_)) => (Trend::Stable, format!("Risk has remained {from}.")),
            _ => {
                tracing::warn!(
                    earliest = %earliest,
                    latest = %latest,
                    "Trend endpoint carries an unrecognized risk label"
                );
                (
                    Trend::Indeterminate,
                    format!("Cannot compare risk labels {earliest} and {latest}."),
                )
            }
        };

        TrendReport {
            trend,
            earliest: Some(earliest),
            latest: Some(latest),
            analyzed_count,
            details,
        }
    }
}

pub fn summarize(records: &[ReportRecord]) -> RiskSummary {
    let mut counts: BTreeMap<RiskLevel, usize> = RiskLevel::ALL.iter().map(|l| (*l, 0)).collect();
    let mut unrecognized = 0;
    let mut analyzed_count = 0;

    for analysis in records.iter().filter_map(|r| r.analysis.as_ref()) {
        analyzed_count += 1;
        match analysis.risk_level() {
            Ok(level) => *counts.entry(level).or_default() += 1,
            Err(_) => unrecognized += 1,
        }
    }

    let has = |level: RiskLevel| counts.get(&level).is_some_and(|n| *n > 0);
    let overall = if has(RiskLevel::Critical) {
        OverallAssessment::UrgentAttention
    } else if has(RiskLevel::High) {
        OverallAssessment::AttentionAdvised
    } else if has(RiskLevel::Moderate) {
        OverallAssessment::MonitoringRecommended
    } else {
        OverallAssessment::Stable
    };

    RiskSummary {
        counts,
        unrecognized,
        analyzed_count,
        overall,
    }
}
