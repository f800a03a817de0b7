pub mod api;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod memory;

pub use api::FaceOps;
pub use endpoint::RemoteEndpoint;
pub use error::FaceClientError;
pub use http::HttpFaceClient;
pub use memory::InMemoryFaceClient;
