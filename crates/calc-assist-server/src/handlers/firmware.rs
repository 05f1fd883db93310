use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::sync::Arc;
use tracing::info;

use crate::models::ask::UploadQuery;
use crate::services::FirmwareStore;
use crate::utils::error::ApiError;

pub async fn version_handler(
    State(firmware): State<Arc<FirmwareStore>>,
) -> Result<String, ApiError> {
    let version = firmware.version().await?;
    info!("Firmware version requested: {}", version);
    Ok(version)
}

pub async fn download_handler(
    State(firmware): State<Arc<FirmwareStore>>,
) -> Result<Response, ApiError> {
    let binary = firmware
        .binary()
        .await?
        .ok_or_else(|| ApiError::NotFound("No firmware available".to_string()))?;

    info!("Firmware download requested ({} bytes)", binary.len());
    let disposition = format!("attachment; filename={}", firmware.binary_file_name());

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        binary,
    )
        .into_response())
}

pub async fn upload_handler(
    State(firmware): State<Arc<FirmwareStore>>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    let version = query
        .version
        .filter(|version| !version.is_empty())
        .ok_or_else(|| ApiError::BadRequest("version required".to_string()))?;

    firmware.store(&version, &body).await?;
    Ok("OK")
}
