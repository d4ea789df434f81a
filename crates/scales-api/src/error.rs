use thiserror::Error;

/// Failure taxonomy for the service layer. CRUD resolvers flatten most of
/// these into `{success: false}`; only authorization failures and store
/// errors during auth surface as GraphQL errors.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or invalid field: {0}")]
    Validation(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Missing, malformed, and expired tokens all collapse here; callers
    /// cannot tell them apart.
    #[error("unauthorized")]
    Unauthorized,

    #[error("username already taken")]
    Conflict,

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}
