use std::io::Read;
use std::time::Duration;

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::Http;

use crate::Result;

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    /// Overrides the transport's deadline for this exchange.
    pub timeout: Option<Duration>,
}

impl Request {
    pub fn get(url: String) -> Self {
        Request {
            method: Method::Get,
            url,
            body: None,
            timeout: None,
        }
    }

    pub fn post(url: String, body: Option<Vec<u8>>) -> Self {
        Request {
            method: Method::Post,
            url,
            body,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub content_type: Option<String>,
}

impl ResponseMeta {
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A complete one-shot reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub body: Vec<u8>,
    pub meta: ResponseMeta,
}

pub type BodyStream = Box<dyn Read + Send>;

/// Blocking http exchange with the camera.
///
/// Implementations hand back replies for every http status; status handling
/// is left to the caller.
pub trait Transport: Send + Sync {
    fn send(&self, req: &Request) -> Result<Reply>;

    fn open_stream(&self, req: &Request) -> Result<(ResponseMeta, BodyStream)>;
}
