use serde::{Deserialize, Serialize};

// -- Requests --

/// Body for `POST /api/users`. Fields are optional so missing values
/// surface as a 400 validation error instead of a deserialization failure.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
}

/// Body for `POST /api/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
}

/// Body for `POST /api/users/{id}/posts`.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub uri: Option<String>,
}

// -- Response envelope --

/// Success payload: `{"data": {"message": ..., "items"?: [...], "nextLink"?: ...}}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: Data<T>,
}

#[derive(Debug, Serialize)]
pub struct Data<T: Serialize> {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<T>>,
    #[serde(rename = "nextLink", skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: Data {
                message: message.into(),
                items: None,
                next_link: None,
            },
        }
    }

    pub fn items(message: impl Into<String>, items: Vec<T>) -> Self {
        Self {
            data: Data {
                message: message.into(),
                items: Some(items),
                next_link: None,
            },
        }
    }

    pub fn with_next_link(mut self, link: impl Into<String>) -> Self {
        self.data.next_link = Some(link.into());
        self
    }
}

/// Failure payload: `{"error": {"code": ..., "message": ..., "errors"?: [...]}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_omits_absent_fields() {
        let json = serde_json::to_value(Envelope::<()>::message("Deleted")).unwrap();
        assert_eq!(json, serde_json::json!({"data": {"message": "Deleted"}}));
    }

    #[test]
    fn envelope_renders_items_and_next_link() {
        let json = serde_json::to_value(
            Envelope::items("OK", vec![1, 2]).with_next_link("api/feed?before_post=2"),
        )
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "data": {
                    "message": "OK",
                    "items": [1, 2],
                    "nextLink": "api/feed?before_post=2",
                }
            })
        );
    }
}
