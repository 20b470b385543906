pub mod render;
pub mod surface;
pub mod view;

pub use render::{
    render_prerecorded, render_stream_event, DETECTED_LANGUAGE_HEADING, RESPONSE_HEADING,
    SUMMARY_HEADING, TRANSCRIPT_HEADING,
};
pub use surface::{MemorySurface, Surface, SurfaceEntry, TerminalSurface};
pub use view::{detected_language, raw_view, summary_view, transcript_view};
