//! Notification handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::{classify_db_error, get_db_conn, ApiError, ApiResult},
    models::Notification,
    notify::NotificationService,
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAnnouncementRequest {
    #[schema(example = "The north courts close early on Friday")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnnouncementResponse {
    #[schema(example = "General announcement created")]
    pub message: String,
    pub notification_id: i32,
}

#[utoipa::path(
    get,
    path = "/notifications/{uid}",
    tag = "Notifications",
    params(("uid" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Personal and broadcast notifications, newest first", body = [Notification]),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn list_notifications_for_user(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> ApiResult<Json<Vec<Notification>>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let rows = NotificationService::list_for_user(&mut conn, &uid).map_err(classify_db_error)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/notifications",
    tag = "Notifications",
    request_body = CreateAnnouncementRequest,
    responses(
        (status = 201, description = "Announcement created", body = AnnouncementResponse),
        (status = 400, description = "Message is required", body = ApiError)
    )
)]
pub async fn create_general_announcement(
    State(state): State<AppState>,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> ApiResult<(StatusCode, Json<AnnouncementResponse>)> {
    let message = payload
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Message is required", "MISSING_MESSAGE"))?;

    let mut conn = get_db_conn(&state.db_pool)?;

    let notification =
        NotificationService::general(&mut conn, &message).map_err(classify_db_error)?;

    info!(
        notification_id = notification.notification_id,
        "General announcement created"
    );

    Ok((
        StatusCode::CREATED,
        Json(AnnouncementResponse {
            message: "General announcement created".to_string(),
            notification_id: notification.notification_id,
        }),
    ))
}
