use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

use crate::models::ask::SolveQuery;
use crate::services::VisionService;
use crate::utils::error::ApiError;

const EXPECTED_CONTENT_TYPE: &str = "image/jpg";

pub async fn solve_handler(
    State(vision_service): State<Arc<VisionService>>,
    headers: HeaderMap,
    Query(query): Query<SolveQuery>,
    body: Bytes,
) -> Result<String, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    info!("Solve request: content-type={:?}, {} bytes", content_type, body.len());

    if content_type != Some(EXPECTED_CONTENT_TYPE) {
        return Err(ApiError::BadRequest(format!(
            "bad content-type: {}",
            content_type.unwrap_or("missing")
        )));
    }

    vision_service.solve(body, query.n.as_deref()).await
}
