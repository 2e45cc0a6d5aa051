//! User registration handlers. Identity is established elsewhere; this
//! only records the caller-supplied uid.

use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::{classify_db_error, get_db_conn, ApiError, ApiResult},
    models::{NewUser, User},
    schema::users,
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "user_42")]
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserCreatedResponse {
    #[schema(example = "User created")]
    pub message: String,
    pub user: User,
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserCreatedResponse),
        (status = 400, description = "Missing uid", body = ApiError),
        (status = 409, description = "User already exists", body = ApiError)
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserCreatedResponse>)> {
    let uid = payload
        .uid
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("uid is required", "MISSING_UID"))?;

    let mut conn = get_db_conn(&state.db_pool)?;

    let user: User = diesel::insert_into(users::table)
        .values(&NewUser { uid: uid.clone() })
        .returning(User::as_returning())
        .get_result(&mut conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ApiError::conflict("User already exists", "USER_EXISTS")
            }
            other => classify_db_error(other),
        })?;

    info!(uid = %user.uid, "User created");

    Ok((
        StatusCode::CREATED,
        Json(UserCreatedResponse {
            message: "User created".to_string(),
            user,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let rows = users::table
        .order(users::created_at.asc())
        .select(User::as_select())
        .load(&mut conn)
        .map_err(classify_db_error)?;

    Ok(Json(rows))
}
