pub mod cloudflare;

use reqwest::StatusCode;

/// Outcome of a management API call that reached the server.
///
/// Any status other than 200 is a `Failure` carrying the raw body, never an error.
#[derive(Debug)]
pub enum ApiResult<T> {
    Success(T),
    Failure { status: StatusCode, body: String },
}

#[cfg(test)]
impl<T> ApiResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success(_))
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            ApiResult::Success(payload) => Some(payload),
            ApiResult::Failure { .. } => None,
        }
    }
}
