/// Database row types — these map directly to SQLite rows.
/// Distinct from the scales-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct WeightRow {
    pub id: String,
    pub user_id: String,
    pub date: String,
    pub weight: i64,
    pub created_at: String,
}

pub struct FileRow {
    pub id: String,
    pub weight_id: String,
    pub name: String,
    pub position: i64,
}

/// A file to link while creating a weight record; the binary payload is
/// already on disk by the time this reaches the DB layer.
pub struct NewFile {
    pub id: String,
    pub name: String,
}
