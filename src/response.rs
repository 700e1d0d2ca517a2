//! Outgoing HTTP response type.
//!
//! Controllers build a [`Response`] and return it; the server turns it into
//! wire bytes. That is the entire job description.

use crate::status::Status;

/// An outgoing HTTP response.
///
/// # Shortcuts
///
/// ```rust
/// use plinth::{Response, Status};
///
/// Response::html("<h1>users</h1>");
/// Response::text("404 - Page not found");
/// Response::redirect("/users");
/// Response::status(Status::NoContent);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use plinth::{Response, Status};
///
/// Response::builder()
///     .status(Status::Created)
///     .header("location", "/users/42")
///     .html("<p>created</p>");
/// ```
pub struct Response {
    body: Vec<u8>,
    headers: Vec<(String, String)>,
    status: u16,
}

impl Response {
    /// `200 OK` with `text/html; charset=utf-8`.
    pub fn html(body: impl Into<String>) -> Self {
        Self::with_content_type("text/html; charset=utf-8", body.into().into_bytes())
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content_type("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Response with no body.
    pub fn status(code: Status) -> Self {
        Self {
            body: Vec::new(),
            headers: Vec::new(),
            status: code.into(),
        }
    }

    /// `301 Moved Permanently` to `location`.
    ///
    /// Use [`redirect_with`](Self::redirect_with) for a `302`/`303`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::redirect_with(location, Status::MovedPermanently)
    }

    /// Redirect to `location` with an explicit status code.
    pub fn redirect_with(location: impl Into<String>, code: Status) -> Self {
        Self {
            body: Vec::new(),
            headers: vec![("location".to_owned(), location.into())],
            status: code.into(),
        }
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder {
            headers: Vec::new(),
            status: Status::Ok.into(),
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as text, for assertions and logs.
    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("")
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn with_content_type(content_type: &str, body: Vec<u8>) -> Self {
        Self {
            body,
            headers: vec![("content-type".to_owned(), content_type.to_owned())],
            status: Status::Ok.into(),
        }
    }

    /// Convert into the hyper-facing wire type.
    pub(crate) fn into_wire(self) -> http::Response<http_body_util::Full<bytes::Bytes>> {
        let mut builder = http::Response::builder().status(self.status);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        builder
            .body(http_body_util::Full::new(bytes::Bytes::from(self.body)))
            // Falls back to an empty 500 if a header value is not wire-legal.
            .unwrap_or_else(|_| {
                http::Response::builder()
                    .status(500)
                    .body(http_body_util::Full::new(bytes::Bytes::new()))
                    .expect("empty response is always valid")
            })
    }
}

/// Fluent builder for [`Response`]. Obtain via [`Response::builder()`].
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: u16,
}

impl ResponseBuilder {
    pub fn status(mut self, code: Status) -> Self {
        self.status = code.into();
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Terminate with an HTML body.
    pub fn html(self, body: impl Into<String>) -> Response {
        self.finish("text/html; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with a plain-text body.
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish("text/plain; charset=utf-8", body.into().into_bytes())
    }

    /// Terminate with no body.
    pub fn no_body(self) -> Response {
        Response {
            body: Vec::new(),
            headers: self.headers,
            status: self.status,
        }
    }

    fn finish(self, content_type: &str, body: Vec<u8>) -> Response {
        let mut headers = vec![("content-type".to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response {
            body,
            headers,
            status: self.status,
        }
    }
}
