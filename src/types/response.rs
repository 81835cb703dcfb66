use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// Label carried by every successful body.
pub const SUCCESS: &str = "success";

/// Standard success envelope: `{status: "success", token?, message?, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: SUCCESS,
            token: None,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::success(data)
        }
    }

    /// Auth reply: the session token sits next to `data`.
    pub fn with_token(token: impl Into<String>, data: T) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::success(data)
        }
    }
}

impl ApiResponse<()> {
    /// Bare `{status: "success"}`.
    pub fn ok() -> Self {
        Self {
            status: SUCCESS,
            token: None,
            message: None,
            data: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

/// Wraps a reply with `201 Created`.
pub struct Created<T: Serialize>(pub ApiResponse<T>);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// Paging counters of a list reply.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

/// List envelope: `{status, results, [total, page, limit, totalPages], data}`.
#[derive(Debug, Serialize)]
pub struct Listing<T: Serialize> {
    pub status: &'static str,
    pub results: usize,
    #[serde(flatten)]
    pub meta: Option<PageMeta>,
    pub data: T,
}

impl<T: Serialize> Listing<T> {
    pub fn new(results: usize, data: T) -> Self {
        Self {
            status: SUCCESS,
            results,
            meta: None,
            data,
        }
    }

    pub fn paginated(results: usize, meta: PageMeta, data: T) -> Self {
        Self {
            meta: Some(meta),
            ..Self::new(results, data)
        }
    }
}

impl<T: Serialize> IntoResponse for Listing<T> {
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}
