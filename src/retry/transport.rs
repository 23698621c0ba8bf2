//! Adapter between `reqwest` and the retry predicates.
//!
//! Transport failures become [`Error`] values so that [`retry_on_http_status`]
//! (or any custom predicate) can classify them.
//!
//! [`retry_on_http_status`]: super::classify::retry_on_http_status

use super::classify::retryable_status;
use crate::error::{Error, Result};

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else {
            Error::Http(err)
        }
    }
}

/// Turn a response with a retryable status into [`Error::HttpStatus`].
///
/// Other responses, including non-retryable error statuses, pass through
/// for the caller to handle.
pub fn error_for_retryable_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if retryable_status(status) {
        return Err(Error::HttpStatus(status));
    }
    Ok(response)
}
