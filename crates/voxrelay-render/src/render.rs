use crate::surface::Surface;
use crate::view;
use serde_json::Value;
use voxrelay_core::{language_name, ConnectionEvent, LanguageSetting, TranscriptionOptions};

pub const RESPONSE_HEADING: &str = "Response";
pub const TRANSCRIPT_HEADING: &str = "Transcript";
pub const SUMMARY_HEADING: &str = "Summary";
pub const DETECTED_LANGUAGE_HEADING: &str = "Detected language";

/// Render a prerecorded response into its display sections. Every
/// section is guarded on its own: a missing key in one becomes an inline
/// error there and never suppresses the others.
pub fn render_prerecorded(
    response: &Value,
    options: &TranscriptionOptions,
    out: &mut dyn Surface,
) {
    if options.language == LanguageSetting::Detect {
        if let Some(code) = view::detected_language(response) {
            out.heading(DETECTED_LANGUAGE_HEADING);
            match language_name(&code) {
                Some(name) => out.body(&format!("{code} ({name})")),
                None => out.body(&code),
            }
        }
    }

    out.heading(RESPONSE_HEADING);
    out.body(&view::raw_view(response));

    out.heading(TRANSCRIPT_HEADING);
    match view::transcript_view(response, options) {
        Ok(transcript) => out.body(&transcript),
        Err(e) => out.error(&e.to_string()),
    }

    if options.summarize {
        out.heading(SUMMARY_HEADING);
        match view::summary_view(response) {
            Ok(summary) => out.body(&summary),
            Err(e) => out.error(&e.to_string()),
        }
    }
}

/// Render one streaming event. Interim transcripts are marked; empty
/// transcript fragments are dropped.
pub fn render_stream_event(event: &ConnectionEvent, out: &mut dyn Surface) {
    match event {
        ConnectionEvent::Opened => {
            out.body("streaming started, press Ctrl-C to stop");
        }
        ConnectionEvent::Transcript(t) => {
            if t.transcript.is_empty() {
                return;
            }
            if t.is_final {
                out.body(&t.transcript);
            } else {
                out.body(&format!("… {}", t.transcript));
            }
        }
        ConnectionEvent::Closed(code) => match code {
            Some(code) => out.body(&format!("stream closed ({code})")),
            None => out.body("stream closed"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{MemorySurface, SurfaceEntry};
    use voxrelay_core::{OptionToggles, TranscriptEvent, TranscriptionMode};

    fn full_response() -> Value {
        serde_json::json!({
            "results": {
                "channels": [{
                    "detected_language": "fr",
                    "alternatives": [{
                        "transcript": "plain text",
                        "paragraphs": { "transcript": "Paragraph text." },
                        "summaries": [{ "summary": "Short summary." }]
                    }]
                }]
            }
        })
    }

    fn summarizing_options() -> TranscriptionOptions {
        OptionToggles {
            summarize: Some(true),
            ..Default::default()
        }
        .assemble(TranscriptionMode::Prerecorded)
    }

    #[test]
    fn test_render_all_sections() {
        let mut surface = MemorySurface::new();
        render_prerecorded(&full_response(), &summarizing_options(), &mut surface);

        assert_eq!(
            surface.section(DETECTED_LANGUAGE_HEADING),
            vec![&SurfaceEntry::Body("fr (French)".to_string())]
        );
        assert!(!surface.section(RESPONSE_HEADING).is_empty());
        assert_eq!(
            surface.section(TRANSCRIPT_HEADING),
            vec![&SurfaceEntry::Body("Paragraph text.".to_string())]
        );
        assert_eq!(
            surface.section(SUMMARY_HEADING),
            vec![&SurfaceEntry::Body("Short summary.".to_string())]
        );
        assert!(surface.errors().is_empty());
    }

    #[test]
    fn test_missing_summaries_errors_summary_section_only() {
        let mut response = full_response();
        response["results"]["channels"][0]["alternatives"][0]
            .as_object_mut()
            .unwrap()
            .remove("summaries");

        let mut surface = MemorySurface::new();
        render_prerecorded(&response, &summarizing_options(), &mut surface);

        // The summary section holds the one inline error...
        let summary = surface.section(SUMMARY_HEADING);
        assert_eq!(summary.len(), 1);
        assert!(matches!(summary[0], SurfaceEntry::Error(_)));

        // ...while transcript and raw response render normally.
        assert_eq!(
            surface.section(TRANSCRIPT_HEADING),
            vec![&SurfaceEntry::Body("Paragraph text.".to_string())]
        );
        assert!(matches!(
            surface.section(RESPONSE_HEADING)[0],
            SurfaceEntry::Body(_)
        ));
        assert_eq!(surface.errors().len(), 1);
    }

    #[test]
    fn test_summary_section_absent_when_not_requested() {
        let options = OptionToggles {
            summarize: Some(false),
            ..Default::default()
        }
        .assemble(TranscriptionMode::Prerecorded);

        let mut surface = MemorySurface::new();
        render_prerecorded(&full_response(), &options, &mut surface);
        assert!(surface.section(SUMMARY_HEADING).is_empty());
    }

    #[test]
    fn test_detected_language_skipped_for_fixed_language() {
        let options = OptionToggles {
            language: Some(LanguageSetting::Fixed("en".to_string())),
            ..Default::default()
        }
        .assemble(TranscriptionMode::Prerecorded);

        let mut surface = MemorySurface::new();
        render_prerecorded(&full_response(), &options, &mut surface);
        assert!(surface.section(DETECTED_LANGUAGE_HEADING).is_empty());
    }

    #[test]
    fn test_stream_events_render_in_order() {
        let events = vec![
            ConnectionEvent::Opened,
            ConnectionEvent::Transcript(TranscriptEvent {
                transcript: "life".to_string(),
                is_final: false,
                start: 0.0,
                duration: 0.5,
            }),
            ConnectionEvent::Transcript(TranscriptEvent {
                transcript: String::new(),
                is_final: false,
                start: 0.5,
                duration: 0.5,
            }),
            ConnectionEvent::Transcript(TranscriptEvent {
                transcript: "life moves".to_string(),
                is_final: true,
                start: 0.0,
                duration: 1.0,
            }),
            ConnectionEvent::Closed(Some(1000)),
        ];

        let mut surface = MemorySurface::new();
        for event in &events {
            render_stream_event(event, &mut surface);
        }

        assert_eq!(
            surface.bodies(),
            vec![
                "streaming started, press Ctrl-C to stop",
                "… life",
                "life moves",
                "stream closed (1000)",
            ]
        );
    }
}
