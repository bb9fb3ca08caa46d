//! Decoded values paired with the metadata of the response they came from.

use reqwest::StatusCode;

use crate::http::find_header;

/// Status and headers of a received response.
///
/// `expected` is the status the operation considers a success (200 for
/// reads, updates and deletes, 201 for creates). A 2xx status that differs
/// from it still decodes; check [`ResponseMeta::is_expected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    pub status: u16,
    pub expected: u16,
    pub headers: Vec<(String, String)>,
}

impl ResponseMeta {
    pub fn new(status: u16, expected: u16, headers: Vec<(String, String)>) -> Self {
        Self {
            status,
            expected,
            headers,
        }
    }

    /// Canonical reason phrase for the status, if it has one.
    pub fn status_text(&self) -> Option<&'static str> {
        StatusCode::from_u16(self.status)
            .ok()
            .and_then(|status| status.canonical_reason())
    }

    /// Status code and reason, e.g. `201 Created`.
    pub fn status_line(&self) -> String {
        match self.status_text() {
            Some(text) => format!("{} {text}", self.status),
            None => self.status.to_string(),
        }
    }

    pub fn is_expected(&self) -> bool {
        self.status == self.expected
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Total number of items in the collection (`X-WP-Total`).
    pub fn total(&self) -> Option<u64> {
        self.header("x-wp-total")?.trim().parse().ok()
    }

    /// Total number of pages at the requested page size (`X-WP-TotalPages`).
    pub fn total_pages(&self) -> Option<u64> {
        self.header("x-wp-totalpages")?.trim().parse().ok()
    }
}

/// A decoded value together with the response metadata.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: T,
    pub meta: ResponseMeta,
}

impl<T> ApiResponse<T> {
    pub fn status(&self) -> u16 {
        self.meta.status
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, ResponseMeta) {
        (self.value, self.meta)
    }
}
