/// Failure taxonomy reported to operation callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    /// No error, used as the success sentinel
    #[default]
    None,
    /// The failure could not be classified
    Unknown,
    /// The operation requires a connected session
    NotConnected,
    /// `connect` was called on a session that is already connected
    AlreadyConnected,
    /// The relay refused the session because the space is full
    SpaceUserLimitExceeded,
}

/// Outcome of an asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Success,
    Failed,
    InProgress,
}

/// Passed exactly once to every asynchronous operation's callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResult {
    pub result_code: ResultCode,
    /// HTTP-style status code, `0` when not applicable
    pub http_status: u16,
    pub failure_reason: ErrorCode,
}

impl OperationResult {
    pub fn success() -> Self {
        Self {
            result_code: ResultCode::Success,
            http_status: 0,
            failure_reason: ErrorCode::None,
        }
    }

    pub fn failed(reason: ErrorCode) -> Self {
        Self {
            result_code: ResultCode::Failed,
            http_status: 0,
            failure_reason: reason,
        }
    }

    pub fn in_progress() -> Self {
        Self {
            result_code: ResultCode::InProgress,
            http_status: 0,
            failure_reason: ErrorCode::None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result_code == ResultCode::Success
    }
}

impl From<ErrorCode> for OperationResult {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::None => OperationResult::success(),
            other => OperationResult::failed(other),
        }
    }
}

const ERROR_CODE_MARKER: &str = "error code:";

/// Classifies a relay error message by the token following `error code:`.
///
/// Only `Scopes_ConcurrentUsersQuota` is currently recognized; anything else,
/// including a message with no marker, is `ErrorCode::Unknown`.
pub fn parse_error_code(message: &str) -> ErrorCode {
    let Some(marker) = message.find(ERROR_CODE_MARKER) else {
        return ErrorCode::Unknown;
    };

    let token = message[marker + ERROR_CODE_MARKER.len()..]
        .trim_start()
        .split(',')
        .next()
        .unwrap_or_default()
        .trim_end();

    match token {
        "Scopes_ConcurrentUsersQuota" => ErrorCode::SpaceUserLimitExceeded,
        _ => ErrorCode::Unknown,
    }
}
