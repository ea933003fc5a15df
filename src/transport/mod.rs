pub mod error;
pub mod http;

use async_trait::async_trait;
use serde_json::Value;

pub use error::TransportError;
pub use http::HttpTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One request in, one parsed JSON response (or failure) out.
///
/// Implementations own timeouts and retries; the prompt store layers
/// none of its own on top.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `method` against `path` (rooted at the API base), with an
    /// optional JSON body. Responses without a body come back as `Value::Null`.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, TransportError>;
}
