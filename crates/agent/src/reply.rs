//! Parsing of the model's reply into an [`OracleReply`].
//!
//! Models drift: some wrap the object in a markdown fence, some add prose
//! around it, some rename keys between prompt revisions. Parsing never fails;
//! unusable text yields [`OracleReply::fallback`].

use std::sync::OnceLock;

use intake_core::form::record::extraction_from_json;
use intake_core::DataRecord;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

pub const FALLBACK_MESSAGE: &str = "I'm sorry, could you repeat that?";

const EXTRACTION_KEYS: [&str; 3] = ["extracted_data", "updated_data", "newly_extracted_data"];
const COMPLETION_KEYS: [&str; 2] = ["is_complete", "completed"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OracleReply {
    pub ai_message: String,
    pub extracted: DataRecord,
    /// What the model claims; advisory only.
    pub claimed_complete: bool,
    pub fell_back: bool,
}

impl OracleReply {
    pub fn fallback() -> Self {
        Self {
            ai_message: FALLBACK_MESSAGE.to_string(),
            extracted: DataRecord::new(),
            claimed_complete: false,
            fell_back: true,
        }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let extracted = EXTRACTION_KEYS
            .iter()
            .find_map(|key| object.get(*key))
            .map(extraction_from_json)
            .unwrap_or_default();

        let claimed_complete =
            COMPLETION_KEYS.iter().find_map(|key| object.get(*key)).is_some_and(truthy);

        let ai_message = object
            .get("ai_message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .unwrap_or(FALLBACK_MESSAGE)
            .to_string();

        Self { ai_message, extracted, claimed_complete, fell_back: false }
    }
}

pub fn parse_reply(raw: &str) -> OracleReply {
    match locate_object(raw) {
        Some(object) => OracleReply::from_object(&object),
        None => {
            warn!(
                event_name = "agent.reply.fallback",
                raw_chars = raw.len(),
                "model reply held no JSON object; using fallback"
            );
            OracleReply::fallback()
        }
    }
}

/// Whole text, then a fenced block, then the outermost brace span.
fn locate_object(raw: &str) -> Option<Map<String, Value>> {
    as_object(raw.trim())
        .or_else(|| fenced_block(raw).and_then(as_object))
        .or_else(|| brace_span(raw).and_then(as_object))
}

fn as_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

fn fenced_block(text: &str) -> Option<&str> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    let pattern = PATTERN
        .get_or_init(|| Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").ok())
        .as_ref()?;
    pattern.captures(text)?.get(1).map(|capture| capture.as_str())
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}
