//! Projections of the untyped vendor response.
//!
//! The response stays a raw JSON mapping; each view reaches into it
//! independently and reports a missing key as its own [`ViewError`]
//! without affecting sibling views.

use serde_json::Value;
use voxrelay_core::{TranscriptionOptions, ViewError};

const TRANSCRIPT_PTR: &str = "/results/channels/0/alternatives/0/transcript";
const PARAGRAPHS_PTR: &str = "/results/channels/0/alternatives/0/paragraphs/transcript";
const SUMMARY_PTR: &str = "/results/channels/0/alternatives/0/summaries/0/summary";
const DETECTED_LANGUAGE_PTR: &str = "/results/channels/0/detected_language";

/// Detected language code, when the vendor reported one.
pub fn detected_language(response: &Value) -> Option<String> {
    response
        .pointer(DETECTED_LANGUAGE_PTR)
        .and_then(Value::as_str)
        .map(String::from)
}

/// The full response, pretty-printed.
pub fn raw_view(response: &Value) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string())
}

/// Transcript text: paragraph-formatted when the configuration asked for
/// paragraphs or smart formatting, plain otherwise.
pub fn transcript_view(
    response: &Value,
    options: &TranscriptionOptions,
) -> Result<String, ViewError> {
    if options.paragraphs || options.smart_format {
        field_str(response, PARAGRAPHS_PTR)
    } else {
        field_str(response, TRANSCRIPT_PTR)
    }
}

/// Summary of the first channel's first alternative.
pub fn summary_view(response: &Value) -> Result<String, ViewError> {
    field_str(response, SUMMARY_PTR)
}

fn field_str(response: &Value, pointer: &str) -> Result<String, ViewError> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ViewError::MissingField(pointer.trim_start_matches('/').replace('/', ".")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxrelay_core::{OptionToggles, TranscriptionMode};

    fn response_with_everything() -> Value {
        serde_json::json!({
            "results": {
                "channels": [{
                    "detected_language": "en",
                    "alternatives": [{
                        "transcript": "life moves pretty fast",
                        "paragraphs": {
                            "transcript": "Life moves pretty fast.\n\nIf you don't stop and look around..."
                        },
                        "summaries": [{ "summary": "A reflection on moving fast." }]
                    }]
                }]
            }
        })
    }

    fn options(smart_format: bool, paragraphs: bool) -> TranscriptionOptions {
        OptionToggles {
            smart_format: Some(smart_format),
            paragraphs: Some(paragraphs),
            ..Default::default()
        }
        .assemble(TranscriptionMode::Prerecorded)
    }

    #[test]
    fn test_plain_transcript_when_no_formatting_requested() {
        let text = transcript_view(&response_with_everything(), &options(false, false)).unwrap();
        assert_eq!(text, "life moves pretty fast");
    }

    #[test]
    fn test_paragraph_transcript_when_paragraphs_requested() {
        let text = transcript_view(&response_with_everything(), &options(false, true)).unwrap();
        assert!(text.starts_with("Life moves pretty fast."));
    }

    #[test]
    fn test_paragraph_transcript_when_smart_format_requested() {
        let text = transcript_view(&response_with_everything(), &options(true, false)).unwrap();
        assert!(text.contains("\n\n"));
    }

    #[test]
    fn test_missing_transcript_reports_field() {
        let response = serde_json::json!({ "results": { "channels": [] } });
        let err = transcript_view(&response, &options(false, false)).unwrap_err();
        assert!(err.to_string().contains("transcript"));
    }

    #[test]
    fn test_summary_view() {
        let summary = summary_view(&response_with_everything()).unwrap();
        assert_eq!(summary, "A reflection on moving fast.");
    }

    #[test]
    fn test_missing_summaries_is_field_local() {
        let mut response = response_with_everything();
        response["results"]["channels"][0]["alternatives"][0]
            .as_object_mut()
            .unwrap()
            .remove("summaries");

        // Summary fails on its own; the sibling views still project.
        assert!(summary_view(&response).is_err());
        assert!(transcript_view(&response, &options(true, true)).is_ok());
        assert!(!raw_view(&response).is_empty());
    }

    #[test]
    fn test_detected_language_present_and_absent() {
        assert_eq!(
            detected_language(&response_with_everything()).as_deref(),
            Some("en")
        );
        let bare = serde_json::json!({ "results": { "channels": [{}] } });
        assert_eq!(detected_language(&bare), None);
    }

    #[test]
    fn test_raw_view_pretty_prints() {
        let raw = raw_view(&response_with_everything());
        assert!(raw.contains('\n'));
        assert!(raw.contains("\"transcript\""));
    }
}
