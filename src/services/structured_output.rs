// src/services/structured_output.rs
//
// Typed outputs for schema-constrained model calls, plus the JSON schemas
// that constrain them. The schemas are what the model sees; the structs are
// what the rest of the crate consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One entry of a generated timeline. Dates are `YYYY-MM-DD` strings, or the
/// literal "Date unknown" when the model cannot pin an exact date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelineEvent {
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineOutput {
    pub events: Vec<TimelineEvent>,
}

/// Score and improvement notes produced by one evaluation pass of the
/// refinement loop. Lives only inside a single iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvaluationOutput {
    pub score: f32,
    #[serde(default)]
    pub improvements: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowupOutput {
    pub questions: Vec<String>,
}

pub fn timeline_output_schema() -> JsonValue {
    serde_json::json!({
        "type": "object",
        "properties": {
            "events": {
                "type": "array",
                "minItems": 6,
                "maxItems": 20,
                "items": {
                    "type": "object",
                    "properties": {
                        "start_date": {
                            "type": "string",
                            "description": "Start date in YYYY-MM-DD format, or 'Date unknown'"
                        },
                        "end_date": {
                            "type": ["string", "null"],
                            "description": "End date in YYYY-MM-DD format if the event spans a range, null otherwise"
                        },
                        "title": {
                            "type": "string",
                            "description": "Short label for the event"
                        },
                        "content": {
                            "type": "string",
                            "description": "What happened, at most two sentences"
                        }
                    },
                    "required": ["start_date", "title", "content"]
                },
                "description": "Timeline events in chronological order, earliest first"
            }
        },
        "required": ["events"]
    })
}

pub fn timeline_evaluation_schema() -> JsonValue {
    serde_json::json!({
        "type": "object",
        "properties": {
            "score": {
                "type": "number",
                "minimum": 0.0,
                "maximum": 1.0,
                "description": "Weighted quality score for the timeline"
            },
            "improvements": {
                "type": "string",
                "description": "Concrete improvements to make, empty if the timeline is already optimal"
            }
        },
        "required": ["score", "improvements"]
    })
}

pub fn followup_schema() -> JsonValue {
    serde_json::json!({
        "type": "object",
        "properties": {
            "questions": {
                "type": "array",
                "minItems": 5,
                "maxItems": 5,
                "items": {
                    "type": "string",
                    // Strictly under 75 characters.
                    "maxLength": 74,
                    "description": "A follow-up question the user might ask next"
                },
                "description": "Exactly five follow-up questions"
            }
        },
        "required": ["questions"]
    })
}
