//! Transports start HTTP-style operations and hand back an [`Operation`].
//!
//! The request variants only see the operation surface (done flag, progress,
//! upload progress, error text, payload); how bytes move is up to the
//! transport. [`CurlTransport`] talks to real servers, [`ManualTransport`]
//! lets the caller complete each operation by hand.

mod http;
mod form;
mod manual;

use std::borrow::Cow;

use crate::operation::Operation;

pub use http::{CurlOptions, CurlTransport};
pub use form::{Form, FormPart};
pub use manual::{ManualTransport, Method, PendingOperation};

/// Starts network operations. Implementations must return immediately; the
/// transfer itself proceeds in the background and reports through the
/// returned operation.
pub trait Transport: Send + Sync {
    /// Start a GET of `url`.
    fn get(&self, url: &str) -> Operation<Response>;

    /// Start a POST of `form` to `url`.
    fn post(&self, url: &str, form: &Form) -> Operation<Response>;
}

/// A completed HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    /// Requested URL.
    pub url: String,
    /// HTTP status code (0 if the transport has none).
    pub status: u32,
    /// Raw header lines of the final response, without line terminators.
    pub headers: Vec<String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// First header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (k, v) = line.split_once(':')?;
            k.trim().eq_ignore_ascii_case(name).then(|| v.trim())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let response = Response {
            url: "http://localhost/".into(),
            status: 200,
            headers: vec![
                "HTTP/1.1 200 OK".into(),
                "Content-Type: text/plain".into(),
            ],
            body: b"hi".to_vec(),
        };
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.header("etag"), None);
        assert_eq!(response.text(), "hi");
    }
}
