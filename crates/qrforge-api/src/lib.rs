pub mod auth;
pub mod error;
pub mod mailer;
pub mod middleware;
pub mod qrcodes;
pub mod render;
pub mod timefmt;

#[cfg(test)]
pub(crate) mod test_util;

use std::path::PathBuf;
use std::sync::Arc;

use qrforge_db::Database;

use crate::mailer::Mailer;

pub type AppState = Arc<AppStateInner>;

/// Shared state for all route handlers. The uploads directory and JWT secret
/// are explicit here rather than read from the environment at call sites.
pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub uploads_dir: PathBuf,
    pub mailer: Option<Mailer>,
}
