//! Helpers shared by handler tests.

use std::sync::Arc;

use axum::response::Response;
use uuid::Uuid;

use qrforge_db::Database;
use qrforge_types::api::Claims;

use crate::{AppState, AppStateInner};

/// Fresh state: in-memory database, throwaway uploads directory, no mailer.
pub fn test_state() -> AppState {
    let uploads_dir = tempfile::tempdir().expect("tempdir").keep();
    Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        jwt_secret: "test-secret".to_string(),
        uploads_dir,
        mailer: None,
    })
}

pub fn claims_for(user_id: Uuid) -> Claims {
    Claims {
        sub: user_id,
        exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
    }
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}
