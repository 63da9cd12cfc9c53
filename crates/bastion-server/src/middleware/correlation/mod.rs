//! Request correlation and logging.

pub mod context;
pub mod layer;
pub mod redaction;

pub use context::{ClientInfo, CorrelationId};
pub use layer::{CorrelationLayer, CorrelationMiddleware};
pub use redaction::{redact_headers, redact_json};
