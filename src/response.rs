use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct Meta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl Meta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        Self {
            page,
            per_page,
            total,
        }
    }
}

/// Envelope shared by every success and error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T, meta: Option<Meta>) -> Self {
        Self {
            success: true,
            message: message.into(),
            result: Some(data),
            meta,
        }
    }
}

impl ApiResponse<serde_json::Value> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            result: None,
            meta: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            result: None,
            meta: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_serializes_without_result_or_meta() {
        let body = serde_json::to_value(ApiResponse::failure("not found")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "message": "not found" })
        );
    }

    #[test]
    fn success_carries_result_and_meta() {
        let body =
            serde_json::to_value(ApiResponse::success("Products", vec![1, 2], Some(Meta::new(1, 20, 2))))
                .unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["result"], serde_json::json!([1, 2]));
        assert_eq!(body["meta"]["total"], 2);
    }
}
