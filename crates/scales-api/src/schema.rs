use async_graphql::{Context, EmptySubscription, Error, Object, Result, Schema};
use tracing::{error, warn};

use scales_types::api::{AuthPayload, Exit, FileUpload, Resp, UserInput, WeightEntry, WeightInput};

use crate::auth::{self, AppState};
use crate::error::ApiError;
use crate::records;

pub type ScalesSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> ScalesSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(state)
        .finish()
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn get_weights(
        &self,
        ctx: &Context<'_>,
        user_id: String,
        token: String,
    ) -> Result<Vec<WeightEntry>> {
        let state = ctx.data::<AppState>()?;
        records::list_weights(state, &user_id, &token).map_err(reject)
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn login_mutation(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> Result<AuthPayload> {
        let state = ctx.data::<AppState>()?;
        match auth::login(state, &username, &password) {
            Ok(session) => Ok(AuthPayload {
                success: true,
                token: Some(session.token),
                user: Some(session.user),
            }),
            Err(e @ ApiError::Store(_)) => Err(reject(e)),
            Err(e) => {
                warn!("Login denied: {}", e);
                Ok(AuthPayload::denied())
            }
        }
    }

    async fn register_mutation(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> Result<Resp> {
        let state = ctx.data::<AppState>()?;
        match auth::register(state, &username, &password) {
            Ok(()) => Ok(Resp::ok()),
            Err(e @ ApiError::Store(_)) => Err(reject(e)),
            Err(e) => {
                warn!("Registration rejected: {}", e);
                Ok(Resp::failed())
            }
        }
    }

    async fn exit_mutation(
        &self,
        ctx: &Context<'_>,
        user: UserInput,
        token: String,
    ) -> Result<Exit> {
        // the user argument is client session state; the token alone decides
        let _ = user;
        let state = ctx.data::<AppState>()?;
        match auth::logout(state, &token) {
            Ok(session) => Ok(Exit {
                token: session.token,
                user: session.user,
            }),
            Err(ApiError::Unauthorized) => Err(Error::new("Invalid token")),
            Err(e) => Err(reject(e)),
        }
    }

    async fn add_mutation(
        &self,
        ctx: &Context<'_>,
        user_id: String,
        token: String,
        data: WeightInput,
        files: Option<Vec<FileUpload>>,
    ) -> Result<Resp> {
        let state = ctx.data::<AppState>()?;
        flag(
            records::add_weight(state, &user_id, &token, data, files.unwrap_or_default()).await,
        )
    }

    async fn delete_mutation(
        &self,
        ctx: &Context<'_>,
        user_id: String,
        token: String,
        id: String,
    ) -> Result<Resp> {
        let state = ctx.data::<AppState>()?;
        flag(records::delete_weight(state, &user_id, &token, &id).await)
    }

    async fn fdel_mutation(
        &self,
        ctx: &Context<'_>,
        user_id: String,
        token: String,
        id: String,
    ) -> Result<Resp> {
        let state = ctx.data::<AppState>()?;
        flag(records::delete_file(state, &user_id, &token, &id).await)
    }

    async fn edit_mutation(
        &self,
        ctx: &Context<'_>,
        user_id: String,
        token: String,
        id: String,
        date: Option<String>,
        weight: Option<String>,
    ) -> Result<Resp> {
        let state = ctx.data::<AppState>()?;
        flag(records::edit_weight(state, &user_id, &token, &id, date, weight))
    }
}

/// CRUD convention: expected failures become `{success: false}`; only
/// authorization failures surface as GraphQL errors.
fn flag(result: std::result::Result<(), ApiError>) -> Result<Resp> {
    match result {
        Ok(()) => Ok(Resp::ok()),
        Err(ApiError::Unauthorized) => Err(Error::new("unauthorized")),
        Err(e) => {
            warn!("Mutation failed: {}", e);
            Ok(Resp::failed())
        }
    }
}

/// Error detail stays server-side; callers only see a generic message.
fn reject(err: ApiError) -> Error {
    match err {
        ApiError::Unauthorized => Error::new("unauthorized"),
        other => {
            error!("Internal error: {}", other);
            Error::new("internal error")
        }
    }
}
