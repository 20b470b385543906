pub mod extract;
pub mod resolve;

pub use extract::{MediaExtractor, YtDlpExtractor};
pub use resolve::{guess_mimetype, resolve};
