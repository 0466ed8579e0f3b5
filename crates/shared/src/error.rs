use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Internal,
}

/// Error envelope returned by the HTTP surface: `{ok: false, code, message, error?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub ok: bool,
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            code,
            message: message.into(),
            error: None,
        }
    }

    /// Internal failure whose detail is only echoed when `expose_detail` is set.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: ErrorCode::Internal,
            message: "Internal Server Error".into(),
            error: Some(detail.into()),
        }
    }

    pub fn redacted(mut self, expose_detail: bool) -> Self {
        if !expose_detail {
            self.error = None;
        }
        self
    }
}
