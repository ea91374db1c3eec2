// SPDX-License-Identifier: GPL-3.0-or-later
pub mod albums;
pub mod artists;
pub mod library;
pub mod reconcile;

use std::str::FromStr;

use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub(crate) fn parse_id<T: FromStr>(raw: &str, kind: &str) -> Result<T, ApiError> {
    raw.parse::<T>()
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("invalid {kind} id: {raw}")))
}

pub(crate) fn internal_error(err: impl std::fmt::Display) -> ApiError {
    tracing::error!(target: "api", error = %err, "request failed");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}
