use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a request, as reported on its beacon.
///
/// Successful HTTP responses carry no status; only error codes and the
/// synthesized terminal outcomes are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Http(u16),
    Timeout,
    Abort,
    NetworkError,
    /// Issuing the request threw before it could be sent.
    OpenFailure,
}

impl RequestStatus {
    pub const TIMEOUT_CODE: i32 = -1001;
    pub const ABORT_CODE: i32 = -999;
    pub const NETWORK_ERROR_CODE: i32 = -998;
    pub const OPEN_FAILURE_CODE: i32 = -997;

    /// Numeric code placed on the beacon.
    pub fn code(self) -> i32 {
        match self {
            RequestStatus::Http(code) => i32::from(code),
            RequestStatus::Timeout => Self::TIMEOUT_CODE,
            RequestStatus::Abort => Self::ABORT_CODE,
            RequestStatus::NetworkError => Self::NETWORK_ERROR_CODE,
            RequestStatus::OpenFailure => Self::OPEN_FAILURE_CODE,
        }
    }

    /// Maps an HTTP status to a recorded outcome; successes map to `None`.
    pub fn from_http(code: u16) -> Option<Self> {
        if (200..400).contains(&code) {
            None
        } else {
            Some(RequestStatus::Http(code))
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Http(code) => write!(f, "http status {code}"),
            RequestStatus::Timeout => write!(f, "timeout"),
            RequestStatus::Abort => write!(f, "aborted"),
            RequestStatus::NetworkError => write!(f, "network error"),
            RequestStatus::OpenFailure => write!(f, "open failed"),
        }
    }
}
