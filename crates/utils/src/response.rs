use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Error payload carried by failed responses. `code` is stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, TS)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_omits_error() {
        let json = serde_json::to_value(ApiResponse::success(vec![1, 2])).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "data": [1, 2] }));
    }

    #[test]
    fn error_carries_code_and_message() {
        let json = serde_json::to_value(ApiResponse::<()>::error(
            "TASK_LOCKED",
            "must first complete «Design»",
        ))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": { "code": "TASK_LOCKED", "message": "must first complete «Design»" }
            })
        );
    }
}
