/// Database row types — these map directly to SQLite rows.
/// Distinct from the qrforge-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct QrCodeRow {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub title: String,
    pub qr_type: String,
    pub image_url: String,
    pub created_at: String,
}
