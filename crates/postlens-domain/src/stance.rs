//! Stance module - current layout, legacy layout, and the upgrade between them
//!
//! Older extractions stored `stance` as a flat list of
//! `{target, position, evidence, confidence, reason|opinion, intent}`.
//! The current contract splits that into `targets` and `reasoning`.
//! Readers of persisted results go through [`upgrade_extraction`].

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Current stance layout
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Stance {
    pub targets: Vec<StanceTarget>,
    pub reasoning: Vec<StanceReasoning>,
}

/// Who or what the author takes a position on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StanceTarget {
    pub target: String,
    pub position: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

/// The opinion and intent behind a position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StanceReasoning {
    pub target: String,
    pub opinion: String,
    pub intent: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

/// One element of the legacy flat stance list
///
/// Fields are read leniently: nulls fall back to defaults, scalars are
/// coerced to the expected type, so any JSON object parses as an entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyStanceEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub target: String,
    #[serde(default = "default_position", deserialize_with = "lenient_position")]
    pub position: String,
    #[serde(default, deserialize_with = "lenient_evidence")]
    pub evidence: Vec<String>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub opinion: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub intent: String,
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn lenient_position<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(default_position))
}

fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let confidence = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(confidence.filter(|c: &f64| c.is_finite()).unwrap_or(0.0))
}

fn lenient_evidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(scalar_text).collect(),
        other => scalar_text(other).into_iter().collect(),
    })
}

/// A legacy list element; anything that is not an object is dropped on upgrade
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LegacyItem {
    Entry(LegacyStanceEntry),
    Other(Value),
}

/// Either stance layout as found in a persisted extraction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StanceShape {
    Current(Stance),
    Legacy(Vec<LegacyItem>),
}

fn default_position() -> String {
    "neutral".to_string()
}

impl LegacyStanceEntry {
    /// `opinion` when present and non-empty, otherwise `reason`
    pub fn opinion_text(&self) -> String {
        match (&self.opinion, &self.reason) {
            (Some(opinion), _) if !opinion.is_empty() => opinion.clone(),
            (_, Some(reason)) => reason.clone(),
            (Some(opinion), None) => opinion.clone(),
            (None, None) => String::new(),
        }
    }
}

impl StanceShape {
    /// Convert to the current layout; the current layout passes through unchanged
    pub fn upgrade(self) -> Stance {
        match self {
            StanceShape::Current(stance) => stance,
            StanceShape::Legacy(items) => {
                let mut stance = Stance::default();
                for item in items {
                    let LegacyItem::Entry(entry) = item else {
                        continue;
                    };
                    stance.reasoning.push(StanceReasoning {
                        target: entry.target.clone(),
                        opinion: entry.opinion_text(),
                        intent: entry.intent.clone(),
                        evidence: entry.evidence.clone(),
                        confidence: entry.confidence,
                    });
                    stance.targets.push(StanceTarget {
                        target: entry.target,
                        position: entry.position,
                        evidence: entry.evidence,
                        confidence: entry.confidence,
                    });
                }
                stance
            }
        }
    }

    /// Whether this is the legacy list layout
    pub fn is_legacy(&self) -> bool {
        matches!(self, StanceShape::Legacy(_))
    }
}

/// Rewrite a legacy list-form `stance` inside `extraction` to the current layout
///
/// Returns `true` when an upgrade happened. Degraded `{"_raw": ...}` records,
/// current-layout stances and unrecognised values are left untouched.
pub fn upgrade_extraction(extraction: &mut Value) -> bool {
    let Some(obj) = extraction.as_object_mut() else {
        return false;
    };
    let Some(stance) = obj.get("stance").filter(|s| s.is_array()) else {
        return false;
    };
    let Ok(shape) = serde_json::from_value::<StanceShape>(stance.clone()) else {
        return false;
    };
    if !shape.is_legacy() {
        return false;
    }
    match serde_json::to_value(shape.upgrade()) {
        Ok(upgraded) => {
            obj.insert("stance".to_string(), upgraded);
            true
        }
        Err(_) => false,
    }
}
