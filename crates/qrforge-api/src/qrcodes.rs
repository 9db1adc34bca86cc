use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, NaiveDate, Utc};
use lettre::message::Mailbox;
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use qrforge_db::models::QrCodeRow;
use qrforge_db::queries::QrCodeFilter;
use qrforge_types::api::{
    Claims, GenerateRequest, GenerateResponse, ListResponse, MessageResponse, Pagination,
    QrCodeView, ShareRequest,
};
use qrforge_types::models::QrType;

use crate::AppState;
use crate::error::ApiError;
use crate::{render, timefmt};

/// Upper bound on a single page, whatever the client asks for.
const MAX_PAGE_SIZE: u32 = 100;

const DEFAULT_TITLE: &str = "Untitled QR Code";

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(rename = "endDate")]
    pub end_date: Option<String>,
    #[serde(rename = "type")]
    pub qr_type: Option<QrType>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// POST /api/qrcodes — render the text, write the artifact, then persist the
/// record. An artifact-write failure aborts the whole operation so no record
/// ever points at a missing file.
pub async fn generate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GenerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = req.text.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::Validation("Text or URL is required".into()));
    }

    let png = render::encode_png(&text).map_err(|e| ApiError::Validation(e.to_string()))?;
    let data_url = render::data_url(&png);

    let file_name = format!("qr-{}.png", Uuid::new_v4());
    tokio::fs::create_dir_all(&state.uploads_dir)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("creating uploads dir: {}", e)))?;
    let file_path = state.uploads_dir.join(&file_name);
    tokio::fs::write(&file_path, &png).await.map_err(|e| {
        ApiError::Internal(anyhow::anyhow!(
            "writing artifact {}: {}",
            file_path.display(),
            e
        ))
    })?;

    let title = match req.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => DEFAULT_TITLE.to_string(),
    };
    let row = QrCodeRow {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.to_string(),
        text,
        title,
        qr_type: req.qr_type.unwrap_or_default().as_str().to_string(),
        image_url: format!("/uploads/{}", file_name),
        created_at: timefmt::now_utc_string(),
    };

    // Run blocking DB insert off the async runtime
    let db = state.clone();
    let insert_row = row.clone();
    tokio::task::spawn_blocking(move || db.db.insert_qrcode(&insert_row))
        .await
        .map_err(|e| ApiError::Internal(e.into()))??;

    let image_url = row.image_url.clone();
    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            message: "QR Code generated successfully".into(),
            qr_code: view_from_row(row),
            image_url,
            data_url,
        }),
    ))
}

/// GET /api/qrcodes — the caller's records, newest first, with optional
/// date-range and type filters and offset pagination.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if query.page == 0 || query.limit == 0 {
        return Err(ApiError::Validation(
            "page and limit must be positive integers".into(),
        ));
    }
    let page = query.page;
    let limit = query.limit.min(MAX_PAGE_SIZE);

    let filter = QrCodeFilter {
        start: query
            .start_date
            .as_deref()
            .map(|raw| parse_date_bound(raw, false))
            .transpose()?,
        end: query
            .end_date
            .as_deref()
            .map(|raw| parse_date_bound(raw, true))
            .transpose()?,
        qr_type: query.qr_type.map(|t| t.as_str().to_string()),
    };

    let offset = u64::from(page - 1) * u64::from(limit);

    let db = state.clone();
    let uid = claims.sub.to_string();
    let (total, rows) = tokio::task::spawn_blocking(move || {
        let total = db.db.count_qrcodes(&uid, &filter)?;
        let rows = db.db.list_qrcodes(&uid, &filter, limit, offset)?;
        Ok::<_, anyhow::Error>((total, rows))
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    Ok(Json(ListResponse {
        qr_codes: rows.into_iter().map(view_from_row).collect(),
        pagination: Pagination {
            total,
            page,
            limit,
            pages: total_pages(total, limit),
        },
    }))
}

/// DELETE /api/qrcodes/{id} — remove the record, then best-effort remove the
/// artifact. A missing record, or one owned by someone else, is a plain 404.
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let uid = claims.sub.to_string();
    let removed = tokio::task::spawn_blocking(move || {
        match db.db.get_qrcode_for_user(&id, &uid)? {
            Some(record) => {
                db.db.delete_qrcode(&id, &uid)?;
                Ok::<_, anyhow::Error>(Some(record))
            }
            None => Ok(None),
        }
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    let record = removed.ok_or_else(|| ApiError::NotFound("QR Code not found".into()))?;

    // Artifact removal is best-effort: the record is already gone, and a
    // stray file must never turn a successful delete into an error.
    let file_name = record.image_url.rsplit('/').next().unwrap_or_default();
    if !file_name.is_empty() {
        let path = state.uploads_dir.join(file_name);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove artifact {}: {}", path.display(), e);
            }
        }
    }

    Ok(Json(MessageResponse {
        message: "QR Code deleted successfully".into(),
    }))
}

/// POST /api/qrcodes/share — email a record's QR image to a third party. The
/// PNG is re-rendered from the stored text, never re-read from disk.
pub async fn share(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ShareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = req.id.trim().to_string();
    let email = req.email.trim().to_string();
    if id.is_empty() || email.is_empty() {
        return Err(ApiError::Validation(
            "QR Code ID and recipient email are required".into(),
        ));
    }
    let to: Mailbox = email
        .parse()
        .map_err(|_| ApiError::Validation(format!("Invalid recipient email: {}", email)))?;

    let db = state.clone();
    let uid = claims.sub.to_string();
    let (record, sender) = tokio::task::spawn_blocking(move || {
        let record = db.db.get_qrcode_for_user(&id, &uid)?;
        let sender = db.db.get_user_by_id(&uid)?;
        Ok::<_, anyhow::Error>((record, sender))
    })
    .await
    .map_err(|e| ApiError::Internal(e.into()))??;

    let record = record.ok_or_else(|| ApiError::NotFound("QR Code not found".into()))?;
    let sender = sender.ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    let png = render::encode_png(&record.text).map_err(ApiError::Internal)?;

    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::Delivery("email transport is not configured".into()))?;

    let note = req.message.as_deref().unwrap_or("Check out this QR Code!");
    mailer
        .send_qr(to, &sender.name, note, &record.text, &record.id, png)
        .await
        .map_err(|e| ApiError::Delivery(e.to_string()))?;

    Ok(Json(MessageResponse {
        message: "QR Code shared successfully via email".into(),
    }))
}

fn total_pages(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit))
}

/// Normalize a filter bound to the stored timestamp format. Accepts a full
/// RFC 3339 timestamp or a bare date; a bare end date covers its whole day so
/// the documented inclusive range holds.
fn parse_date_bound(raw: &str, end_of_day: bool) -> Result<String, ApiError> {
    let raw = raw.trim();
    if let Ok(dt) = raw.parse::<DateTime<Utc>>() {
        return Ok(timefmt::format_utc(dt));
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        return Ok(if end_of_day {
            format!("{}T23:59:59.999Z", date)
        } else {
            format!("{}T00:00:00.000Z", date)
        });
    }
    Err(ApiError::Validation(format!("Invalid date: {}", raw)))
}

fn view_from_row(row: QrCodeRow) -> QrCodeView {
    QrCodeView {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt QR record id '{}': {}", row.id, e);
            Uuid::default()
        }),
        user_id: row.user_id.parse().unwrap_or_else(|e| {
            warn!("Corrupt user_id '{}' on record '{}': {}", row.user_id, row.id, e);
            Uuid::default()
        }),
        qr_type: QrType::parse(&row.qr_type).unwrap_or_else(|| {
            warn!("Unknown stored QR type '{}' on record '{}'", row.qr_type, row.id);
            QrType::default()
        }),
        created_at: timefmt::parse_stored(&row.created_at),
        text: row.text,
        title: row.title,
        image_url: row.image_url,
    }
}
