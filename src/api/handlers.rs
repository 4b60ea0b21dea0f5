use crate::error::SplitError;
use crate::models::{GuestMentionMap, Order, TotalsReport};
use crate::service::{Reconciliation, SplitService};
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 请求体: 账单照片路径
#[derive(Debug, Deserialize)]
pub struct RecognizeRequest {
    pub image_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    pub audio_path: PathBuf,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// 请求体: 账单 + 每位客人的提及
#[derive(Debug, Deserialize)]
pub struct ReconcileRequest {
    pub order: Order,
    pub guest_mentions: Vec<GuestMentionMap>,
}

/// 响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Debug, Serialize)]
pub struct RecognizedBill {
    pub order: Order,
    pub totals: TotalsReport,
}

#[derive(Debug, Serialize)]
pub struct Transcript {
    pub text: String,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

fn status_for(err: &SplitError) -> StatusCode {
    match err {
        SplitError::Io { .. } => StatusCode::BAD_REQUEST,
        SplitError::Decode { .. } | SplitError::Schema(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SplitError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SplitError::Transport(_) | SplitError::Auth(_) => StatusCode::BAD_GATEWAY,
        SplitError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SplitError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
    }
}

/// 请求里的路径只能落在上传目录内 (相对路径按上传目录解析，符号链接展开后再比较)
pub async fn resolve_upload(upload_dir: &Path, requested: &Path) -> crate::Result<PathBuf> {
    let base = tokio::fs::canonicalize(upload_dir)
        .await
        .map_err(|e| SplitError::io(upload_dir, e))?;
    let resolved = tokio::fs::canonicalize(base.join(requested))
        .await
        .map_err(|e| SplitError::io(requested, e))?;
    if !resolved.starts_with(&base) {
        return Err(SplitError::io(requested, "path is outside the upload directory"));
    }
    Ok(resolved)
}

fn respond<T: Serialize>(result: crate::Result<T>, message: impl FnOnce(&T) -> String) -> Response {
    match result {
        Ok(data) => {
            let response = ApiResponse {
                success: true,
                message: message(&data),
                data: Some(data),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => {
            tracing::error!("Request failed: {}", e);
            let response: ApiResponse<T> = ApiResponse {
                success: false,
                message: format!("Error: {}", e),
                data: None,
            };
            (status_for(&e), Json(response)).into_response()
        }
    }
}

/// 账单照片识别
pub async fn recognize_bill(
    State(service): State<Arc<SplitService>>,
    Json(req): Json<RecognizeRequest>,
) -> Response {
    let upload_dir = &service.config().server.upload_dir;
    let result = match resolve_upload(upload_dir, &req.image_path).await {
        Ok(path) => service.recognize_bill(&path).await.map(|order| {
            let totals = service.check_totals(&order);
            RecognizedBill { order, totals }
        }),
        Err(e) => Err(e),
    };
    respond(result, |bill| format!("Recognized {} items", bill.order.items.len()))
}

/// 客人描述抽取
pub async fn extract_mentions(
    State(service): State<Arc<SplitService>>,
    Json(req): Json<ExtractRequest>,
) -> Response {
    let result = service.extract_guest_mentions(&req.description).await;
    respond(result, |mentions| format!("Extracted {} mentions", mentions.len()))
}

/// 语音描述转写
pub async fn transcribe(
    State(service): State<Arc<SplitService>>,
    Json(req): Json<TranscribeRequest>,
) -> Response {
    let upload_dir = &service.config().server.upload_dir;
    let result = match resolve_upload(upload_dir, &req.audio_path).await {
        Ok(path) => service
            .transcribe_description(&path, req.prompt.as_deref())
            .await
            .map(|text| Transcript { text }),
        Err(e) => Err(e),
    };
    respond(result, |_| "Transcribed".to_string())
}

/// 对账 + 分账
pub async fn reconcile(
    State(service): State<Arc<SplitService>>,
    Json(req): Json<ReconcileRequest>,
) -> Response {
    let result = service.reconcile(&req.order, &req.guest_mentions).await;
    respond(result, |r: &Reconciliation| {
        format!(
            "Reconciled {} items for {} guests, {} discrepancies",
            r.alignment.records().len(),
            r.split.shares.len(),
            r.discrepancies.len()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn errors_map_to_distinct_statuses() {
        assert_eq!(status_for(&SplitError::io("/x", "missing")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&SplitError::schema("bad")), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&SplitError::Timeout { attempts: 4, timeout: Duration::from_secs(1) }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(status_for(&SplitError::Auth("401".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&SplitError::Unsupported("no transcriber".into())),
            StatusCode::NOT_IMPLEMENTED
        );
    }

    #[tokio::test]
    async fn uploads_resolve_inside_the_directory_only() {
        let root = tempfile::tempdir().unwrap();
        let uploads = root.path().join("uploads");
        std::fs::create_dir(&uploads).unwrap();
        std::fs::write(uploads.join("bill.png"), b"png").unwrap();
        std::fs::write(root.path().join("secret.txt"), b"key").unwrap();

        let resolved = resolve_upload(&uploads, Path::new("bill.png")).await.unwrap();
        assert_eq!(resolved, uploads.canonicalize().unwrap().join("bill.png"));

        for escape in [
            PathBuf::from("../secret.txt"),
            root.path().join("secret.txt"),
        ] {
            let err = resolve_upload(&uploads, &escape).await.unwrap_err();
            assert!(matches!(err, SplitError::Io { ref reason, .. } if reason.contains("outside")), "{:?}", escape);
        }

        let missing = resolve_upload(&uploads, Path::new("nope.png")).await.unwrap_err();
        assert!(matches!(missing, SplitError::Io { .. }));
    }
}
