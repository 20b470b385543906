pub mod byte_stream;
pub mod cache;
pub mod connection;
pub mod prerecorded;
pub mod streaming;

pub use byte_stream::{AudioByteStream, HttpByteStream};
pub use cache::RequestKey;
pub use connection::{StreamingConnection, WsConnection, WsConnectionConfig};
pub use prerecorded::{
    HttpBackend, HttpBackendConfig, PrerecordedBackend, PrerecordedOutcome, PrerecordedRelay,
};
pub use streaming::{CancelFlag, StreamingRelay};
