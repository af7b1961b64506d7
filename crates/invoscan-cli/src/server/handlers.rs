use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Json,
};

use invoscan_core::{InvoiceRecord, Upload};

use super::AppState;
use super::error::AppError;
use super::models::HealthResponse;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Multipart field holding the PDF.
const FILE_FIELD: &str = "file";

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Parse one uploaded invoice PDF into a record.
pub async fn parse_invoice(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<InvoiceRecord>, AppError> {
    authorize(&state, &headers)?;

    let upload = read_upload(&mut multipart).await?;
    tracing::info!(
        "Received invoice upload: {} ({} bytes)",
        upload.file_name(),
        upload.len()
    );

    let engines = state.engines.clone();
    let record = tokio::task::spawn_blocking(move || engines.pipeline()?.parse(upload)).await??;

    Ok(Json(record))
}

pub(crate) fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(keys) = &state.keys else {
        return Ok(());
    };

    match headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
        Some(key) if keys.exists(key) => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Upload(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
        let bytes = field.bytes().await.map_err(|e| AppError::Upload(e.to_string()))?;
        return Ok(Upload::new(&file_name, bytes.to_vec()));
    }

    Err(AppError::Upload(format!("missing multipart field '{}'", FILE_FIELD)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderValue;
    use invoscan_core::{ScanConfig, StaticKeyStore};

    use super::*;
    use crate::engines::Engines;

    fn state(keys: Option<StaticKeyStore>) -> AppState {
        AppState {
            engines: Arc::new(Engines::new(ScanConfig::default()).unwrap()),
            keys: keys.map(|k| Arc::new(k) as Arc<dyn invoscan_core::ApiKeyStore>),
        }
    }

    fn with_key(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).unwrap());
        headers
    }

    #[test]
    fn test_open_service_accepts_anyone() {
        assert!(authorize(&state(None), &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_key_checks() {
        let state = state(Some(StaticKeyStore::new(["k-1", "k-2"])));

        assert!(authorize(&state, &with_key("k-2")).is_ok());
        assert!(matches!(authorize(&state, &with_key("nope")), Err(AppError::Unauthorized)));
        assert!(matches!(authorize(&state, &HeaderMap::new()), Err(AppError::Unauthorized)));
    }
}
