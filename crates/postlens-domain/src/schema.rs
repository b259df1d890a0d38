//! Schema contract - the structured-output shape of one extraction
//!
//! The same types serve as the decoding constraint handed to the inference
//! engine (via [`schema_contract`]) and as the default shape offered for
//! correction downstream (via [`Extraction::empty`]).

use crate::stance::Stance;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// Top-level extraction result for a single post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Extraction {
    pub post_id: String,
    pub style: Style,
    pub safety_rewrite: SafetyRewrite,
    pub stance: Stance,
    pub topic: Topic,
    pub knowledge_facts: Vec<KnowledgeFact>,
}

/// Writing-style cues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Style {
    pub catchphrases: Vec<String>,
    pub signature_patterns: Vec<String>,
    pub tone: Vec<Tone>,
    pub emotion: Emotion,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

/// Closed set of speaking tones (not sentiment polarity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Formal,
    Casual,
    Celebratory,
    Persuasive,
    Objective,
    Humorous,
    Sarcastic,
    Empathetic,
    Authoritative,
    Promotional,
    Instructional,
    Narrative,
    Urgent,
    Reflective,
}

/// Eight basic emotions plus `none`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Joy,
    Trust,
    Fear,
    Surprise,
    Sadness,
    Disgust,
    Anger,
    Anticipation,
    #[default]
    None,
}

/// Expressions that can be swapped for safer wording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SafetyRewrite {
    pub terms: Vec<SafetyTerm>,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SafetyTerm {
    pub term: String,
    pub replacement: String,
}

/// Why the post was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Topic {
    pub trigger: String,
    pub one_sentence_summary: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

/// Durable entity or trait worth remembering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct KnowledgeFact {
    pub fact: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
}

impl Tone {
    /// All tones in schema order
    pub const ALL: [Tone; 14] = [
        Tone::Formal,
        Tone::Casual,
        Tone::Celebratory,
        Tone::Persuasive,
        Tone::Objective,
        Tone::Humorous,
        Tone::Sarcastic,
        Tone::Empathetic,
        Tone::Authoritative,
        Tone::Promotional,
        Tone::Instructional,
        Tone::Narrative,
        Tone::Urgent,
        Tone::Reflective,
    ];
}

impl Extraction {
    /// The all-empty, zero-confidence shape for `post_id`
    pub fn empty(post_id: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            style: Style {
                catchphrases: Vec::new(),
                signature_patterns: Vec::new(),
                tone: Vec::new(),
                emotion: Emotion::None,
                evidence: Vec::new(),
                confidence: 0.0,
            },
            safety_rewrite: SafetyRewrite {
                terms: Vec::new(),
                evidence: Vec::new(),
                confidence: 0.0,
            },
            stance: Stance::default(),
            topic: Topic {
                trigger: String::new(),
                one_sentence_summary: String::new(),
                evidence: Vec::new(),
                confidence: 0.0,
            },
            knowledge_facts: Vec::new(),
        }
    }
}

/// JSON schema of [`Extraction`] in strict structured-output form
///
/// Every object lists all of its properties as required and sets
/// `additionalProperties: false`; references are inlined so the engine
/// receives one self-contained document.
pub fn schema_contract() -> &'static Value {
    static SCHEMA: OnceLock<Value> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let schema = schema_for!(Extraction);
        let mut value = serde_json::to_value(schema).unwrap_or_default();

        fix_object_schemas(&mut value);
        inline_refs(&mut value);
        strip_number_formats(&mut value);

        if let Value::Object(map) = &mut value {
            map.remove("definitions");
            map.remove("$schema");
            map.remove("title");
        }
        value
    })
}

fn fix_object_schemas(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("object".to_string())) {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                if let Some(Value::Object(props)) = map.get("properties") {
                    let all_keys: Vec<Value> =
                        props.keys().map(|k| Value::String(k.clone())).collect();
                    map.insert("required".to_string(), Value::Array(all_keys));
                }
            }
            for (_, v) in map.iter_mut() {
                fix_object_schemas(v);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                fix_object_schemas(item);
            }
        }
        _ => {}
    }
}

fn inline_refs(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.get("definitions").cloned(),
        _ => None,
    };
    if let Some(defs) = definitions {
        inline_refs_recursive(value, &defs);
    }
}

fn inline_refs_recursive(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(ref_path)) = map.get("$ref").cloned() {
                let name = ref_path.trim_start_matches("#/definitions/");
                if let Some(def) = definitions.get(name) {
                    let mut resolved = def.clone();
                    inline_refs_recursive(&mut resolved, definitions);
                    *value = resolved;
                    return;
                }
            }
            for (_, v) in map.iter_mut() {
                inline_refs_recursive(v, definitions);
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                inline_refs_recursive(item, definitions);
            }
        }
        _ => {}
    }
}

// "format": "double" is noise for grammar-constrained decoders
fn strip_number_formats(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type") == Some(&Value::String("number".to_string())) {
                map.remove("format");
            }
            for (_, v) in map.iter_mut() {
                strip_number_formats(v);
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(strip_number_formats),
        _ => {}
    }
}
