//! Vital extraction from report text.
//!
//! A small table of named rules: each rule targets one vital, carries a regex,
//! and a parse function over its captures. The first rule that matches wins
//! for a vital; rules are tried in table order. A vital with no rule at all is
//! reported as `NoRule` rather than guessed, so the feature builder can decide
//! (and record) how to fill it.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::models::{VitalMap, VitalName, VitalValue};

/// One named extraction rule.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub name: &'static str,
    pub vital: VitalName,
    pattern: Regex,
    parse: fn(&Captures) -> Option<f64>,
}

impl ExtractionRule {
    pub fn new(
        name: &'static str,
        vital: VitalName,
        pattern: &str,
        parse: fn(&Captures) -> Option<f64>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            vital,
            pattern: Regex::new(pattern)?,
            parse,
        })
    }

    /// First match in `text`, parsed. `None` when no occurrence parses.
    fn apply(&self, text: &str) -> Option<f64> {
        self.pattern
            .captures_iter(text)
            .find_map(|caps| (self.parse)(&caps))
    }
}

/// Integer in the first capture group.
pub fn first_group_integer(caps: &Captures) -> Option<f64> {
    caps.get(1)?.as_str().parse::<u32>().ok().map(f64::from)
}

/// Rules shipped with the service.
///
/// Pulse rate, cholesterol and ECG score have no rule: the report formats we
/// receive carry no pattern we can bind to them reliably.
static STANDARD_RULES: LazyLock<Vec<ExtractionRule>> = LazyLock::new(|| {
    vec![
        // "<integer> mg/dL": first occurrence is read as blood sugar
        ExtractionRule::new(
            "blood_sugar_mg_dl",
            VitalName::BloodSugar,
            r"(\d+)\s*mg/dL",
            first_group_integer,
        )
        .expect("built-in extraction pattern must compile"),
        // "<systolic>/<diastolic>": only systolic is kept
        ExtractionRule::new(
            "blood_pressure_systolic",
            VitalName::BloodPressure,
            r"\b(\d{2,3})/(\d{2,3})\b",
            first_group_integer,
        )
        .expect("built-in extraction pattern must compile"),
    ]
});

/// Turns free-form report text into a complete `VitalMap`. Never fails.
#[derive(Debug, Clone)]
pub struct VitalExtractor {
    rules: Vec<ExtractionRule>,
}

impl VitalExtractor {
    pub fn new() -> Self {
        Self {
            rules: STANDARD_RULES.clone(),
        }
    }

    /// Append a rule. Earlier rules for the same vital take precedence.
    pub fn with_rule(mut self, rule: ExtractionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Vitals that no rule can produce.
    pub fn unruled_vitals(&self) -> Vec<VitalName> {
        VitalName::ALL
            .iter()
            .copied()
            .filter(|v| !self.has_rule(*v))
            .collect()
    }

    fn has_rule(&self, vital: VitalName) -> bool {
        self.rules.iter().any(|r| r.vital == vital)
    }

    /// Map with nothing extracted: `NotFound` for ruled vitals, `NoRule` otherwise.
    pub fn empty_map(&self) -> VitalMap {
        let mut map = VitalMap::not_found();
        for vital in self.unruled_vitals() {
            map.set(vital, VitalValue::NoRule);
        }
        map
    }

    pub fn extract(&self, text: &str) -> VitalMap {
        let mut map = self.empty_map();
        for rule in &self.rules {
            if map.value(rule.vital).is_some() {
                continue;
            }
            if let Some(value) = rule.apply(text) {
                tracing::debug!(
                    rule = rule.name,
                    vital = rule.vital.as_str(),
                    value,
                    unit = rule.vital.unit(),
                    "Vital extracted"
                );
                map.set(rule.vital, VitalValue::Measured(value));
            }
        }
        map
    }
}

impl Default for VitalExtractor {
    fn default() -> Self {
        Self::new()
    }
}
