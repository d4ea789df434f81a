use async_graphql::{ID, InputObject, SimpleObject};
use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared between token minting (auth) and verification
/// (record service). Canonical definition lives here in scales-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Auth --

/// Public view of a user; never carries the password hash.
#[derive(Debug, Clone, Serialize, SimpleObject)]
#[graphql(name = "User")]
pub struct UserView {
    pub id: ID,
    pub username: String,
}

impl UserView {
    /// The forced-logout marker returned by `exitMutation`; clients
    /// overwrite their session state with it.
    pub fn sentinel() -> Self {
        Self {
            id: ID::from("0"),
            username: "0".into(),
        }
    }
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct AuthPayload {
    pub success: bool,
    pub token: Option<String>,
    pub user: Option<UserView>,
}

impl AuthPayload {
    pub fn denied() -> Self {
        Self {
            success: false,
            token: None,
            user: None,
        }
    }
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct Exit {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, InputObject)]
pub struct UserInput {
    pub username: Option<String>,
    pub id: Option<ID>,
}

// -- Records --

#[derive(Debug, Clone, Serialize, SimpleObject)]
#[graphql(name = "File")]
pub struct FileEntry {
    pub id: ID,
    /// Stored filename; clients build `/uploads/{file}` URLs from it.
    pub file: String,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
#[graphql(name = "Weight")]
pub struct WeightEntry {
    pub id: ID,
    pub date: String,
    pub weight: i64,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, InputObject)]
pub struct WeightInput {
    pub date: Option<String>,
    pub weight: Option<String>,
}

/// Base64-encoded upload attached to an add mutation.
#[derive(Debug, InputObject)]
#[graphql(name = "FileU")]
pub struct FileUpload {
    pub payload: String,
    pub name: String,
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct Resp {
    pub success: bool,
}

impl Resp {
    pub fn ok() -> Self {
        Self { success: true }
    }

    pub fn failed() -> Self {
        Self { success: false }
    }
}
