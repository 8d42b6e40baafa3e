//! Parse LLM output into an attribute map

use crate::error::ExtractorError;
use magpie_domain::Attributes;
use serde_json::Value;

/// Parse an LLM response into a JSON object.
///
/// Backends are told to return bare JSON but still wrap it in markdown code
/// fences often enough that stripping them first is mandatory.
pub fn parse_llm_response(response: &str) -> Result<Attributes, ExtractorError> {
    let json_str = strip_code_fences(response);

    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| ExtractorError::JsonParse(e.to_string()))?;

    match json {
        Value::Object(map) => Ok(map),
        _ => Err(ExtractorError::InvalidFormat(
            "Expected JSON object".to_string(),
        )),
    }
}

/// Remove markdown code-fence markup, leaving the JSON payload.
fn strip_code_fences(response: &str) -> String {
    response
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}
