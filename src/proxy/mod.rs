//! Forwarding to the backend services.

pub mod forward;
pub mod headers;
pub mod registry;
pub mod upload;

pub use forward::ReverseProxy;
pub use headers::{is_hop_by_hop, relay_headers, HOP_BY_HOP_HEADERS};
pub use registry::ServiceRegistry;
pub use upload::{UploadForwarder, UploadedFile, UPLOAD_PATH};
