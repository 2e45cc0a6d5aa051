//! Event handlers: CRUD plus the capacity-checked join/leave engine and
//! the administrative participation workflow.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    error::{classify_db_error, get_db_conn, ApiError, ApiResult, EngineError},
    models::{Event, EventChanges, NewEvent, NewEventParticipant},
    notify::NotificationService,
    schema::{event_participants, events, users},
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEventRequest {
    #[schema(example = "Friday five-a-side")]
    pub title: Option<String>,
    #[serde(alias = "desc")]
    pub description: Option<String>,
    #[schema(example = "2025-12-12")]
    pub date: Option<String>,
    #[serde(alias = "fac_id")]
    pub facility_id: Option<i32>,
    #[schema(example = 10)]
    pub max_p: Option<i32>,
    pub curr_p: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    #[schema(example = "Event created successfully")]
    pub message: String,
    pub event: Event,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub facility_id: Option<i32>,
    pub max_p: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinEventRequest {
    #[schema(example = "user_42")]
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinEventResponse {
    #[schema(example = "Joined event")]
    pub message: String,
    pub event_id: i32,
    pub title: String,
    /// Participant count after the join.
    pub participants: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LeaveEventResponse {
    #[schema(example = "Left event")]
    pub message: String,
    pub event_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ParticipationRequest {
    #[schema(example = "approve")]
    pub action: Option<String>,
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParticipationResponse {
    #[schema(example = "Event participation approved and notification sent")]
    pub message: String,
}

#[derive(Debug, Queryable, Serialize, Deserialize, ToSchema)]
pub struct ParticipantRecord {
    pub uid: String,
    pub user_created_at: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
    pub joined_at: NaiveDateTime,
}

fn has_capacity(curr_p: i32, max_p: i32) -> bool {
    curr_p < max_p
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ParticipationAction {
    Approve,
    Reject,
}

impl ParticipationAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[utoipa::path(
    post,
    path = "/events",
    tag = "Events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventResponse),
        (status = 400, description = "Missing or malformed fields", body = ApiError)
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<CreateEventRequest>,
) -> ApiResult<(StatusCode, Json<EventResponse>)> {
    let (title, date_raw, facility_id, max_p) = match (
        payload.title.filter(|t| !t.is_empty()),
        payload.date,
        payload.facility_id,
        payload.max_p,
    ) {
        (Some(t), Some(d), Some(f), Some(m)) => (t, d, f, m),
        _ => return Err(ApiError::bad_request("Missing required fields", "MISSING_FIELDS")),
    };

    let date = parse_date(&date_raw)
        .ok_or_else(|| ApiError::bad_request("Invalid date, expected YYYY-MM-DD", "INVALID_DATE"))?;

    if max_p < 0 {
        return Err(ApiError::bad_request("max_p must be >= 0", "INVALID_CAPACITY"));
    }

    let curr_p = payload.curr_p.unwrap_or(0);
    if curr_p < 0 || curr_p > max_p {
        return Err(ApiError::bad_request(
            "curr_p must be between 0 and max_p",
            "INVALID_CAPACITY",
        ));
    }

    let mut conn = get_db_conn(&state.db_pool)?;

    let event: Event = diesel::insert_into(events::table)
        .values(&NewEvent {
            title,
            description: payload.description,
            date,
            facility_id,
            max_p,
            curr_p,
        })
        .returning(Event::as_returning())
        .get_result(&mut conn)
        .map_err(classify_db_error)?;

    info!(event_id = event.event_id, facility_id, "Event created");

    Ok((
        StatusCode::CREATED,
        Json(EventResponse {
            message: "Event created successfully".to_string(),
            event,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/events",
    tag = "Events",
    responses((status = 200, description = "All events", body = [Event]))
)]
pub async fn list_events(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let rows = events::table
        .order(events::event_id.asc())
        .select(Event::as_select())
        .load(&mut conn)
        .map_err(classify_db_error)?;

    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/events/{id}",
    tag = "Events",
    params(("id" = i32, Path, description = "Event id")),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 404, description = "Event not found", body = ApiError)
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Event>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    events::table
        .find(id)
        .select(Event::as_select())
        .first(&mut conn)
        .optional()
        .map_err(classify_db_error)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Event not found", "EVENT_NOT_FOUND"))
}

#[utoipa::path(
    patch,
    path = "/events/{id}",
    tag = "Events",
    params(("id" = i32, Path, description = "Event id")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = EventResponse),
        (status = 400, description = "No updatable fields provided", body = ApiError),
        (status = 404, description = "Event not found", body = ApiError)
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEventRequest>,
) -> ApiResult<Json<EventResponse>> {
    let date = payload
        .date
        .as_deref()
        .map(|raw| {
            parse_date(raw)
                .ok_or_else(|| ApiError::bad_request("Invalid date, expected YYYY-MM-DD", "INVALID_DATE"))
        })
        .transpose()?;

    if let Some(max_p) = payload.max_p {
        if max_p < 0 {
            return Err(ApiError::bad_request("max_p must be >= 0", "INVALID_CAPACITY"));
        }
    }

    let changes = EventChanges {
        title: payload.title,
        description: payload.description,
        date,
        facility_id: payload.facility_id,
        max_p: payload.max_p,
    };

    if changes.is_empty() {
        return Err(ApiError::bad_request(
            "No fields provided to update",
            "NO_FIELDS",
        ));
    }

    let mut conn = get_db_conn(&state.db_pool)?;

    let event = diesel::update(events::table.find(id))
        .set(&changes)
        .returning(Event::as_returning())
        .get_result::<Event>(&mut conn)
        .optional()
        .map_err(classify_db_error)?
        .ok_or_else(|| ApiError::not_found("Event not found", "EVENT_NOT_FOUND"))?;

    info!(event_id = id, "Event updated");

    Ok(Json(EventResponse {
        message: "Event updated successfully".to_string(),
        event,
    }))
}

#[utoipa::path(
    delete,
    path = "/events/{id}",
    tag = "Events",
    params(("id" = i32, Path, description = "Event id")),
    responses(
        (status = 200, description = "Deleted event", body = EventResponse),
        (status = 404, description = "Event not found", body = ApiError)
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<EventResponse>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let event = diesel::delete(events::table.find(id))
        .returning(Event::as_returning())
        .get_result::<Event>(&mut conn)
        .optional()
        .map_err(classify_db_error)?
        .ok_or_else(|| ApiError::not_found("Event not found", "EVENT_NOT_FOUND"))?;

    info!(event_id = id, "Event deleted");

    Ok(Json(EventResponse {
        message: "Event deleted successfully".to_string(),
        event,
    }))
}

#[utoipa::path(
    post,
    path = "/events/{id}/join",
    tag = "Events",
    params(("id" = i32, Path, description = "Event id")),
    request_body = JoinEventRequest,
    responses(
        (status = 201, description = "Joined", body = JoinEventResponse),
        (status = 400, description = "Missing uid", body = ApiError),
        (status = 404, description = "Event not found", body = ApiError),
        (status = 409, description = "Event full or already joined", body = ApiError)
    )
)]
pub async fn join_event(
    State(state): State<AppState>,
    Path(event_id): Path<i32>,
    Json(payload): Json<JoinEventRequest>,
) -> ApiResult<(StatusCode, Json<JoinEventResponse>)> {
    let uid = payload
        .uid
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("uid is required", "MISSING_UID"))?;

    let mut conn = get_db_conn(&state.db_pool)?;

    let (title, participants) = conn.transaction::<_, EngineError, _>(|conn| {
        // Lock the event row so the capacity check and the increment are
        // serialized across concurrent joins.
        let event: Event = events::table
            .find(event_id)
            .select(Event::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::not_found("Event not found", "EVENT_NOT_FOUND"))?;

        if !has_capacity(event.curr_p, event.max_p) {
            return Err(EngineError::capacity("Event full", "EVENT_FULL"));
        }

        let already_joined: bool = diesel::select(diesel::dsl::exists(
            event_participants::table.find((event_id, uid.clone())),
        ))
        .get_result(conn)?;

        if already_joined {
            return Err(EngineError::conflict(
                "Already joined this event",
                "ALREADY_JOINED",
            ));
        }

        diesel::insert_into(event_participants::table)
            .values(&NewEventParticipant {
                event_id,
                uid: uid.clone(),
            })
            .execute(conn)?;

        diesel::update(events::table.find(event_id))
            .set(events::curr_p.eq(events::curr_p + 1))
            .execute(conn)?;

        NotificationService::personal(
            conn,
            &uid,
            &format!("You joined: {}", event.title),
            Some(event_id),
        )?;

        Ok((event.title, event.curr_p + 1))
    })?;

    info!(event_id, uid = %uid, participants, "User joined event");

    Ok((
        StatusCode::CREATED,
        Json(JoinEventResponse {
            message: "Joined event".to_string(),
            event_id,
            title,
            participants,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/events/{id}/leave",
    tag = "Events",
    params(("id" = i32, Path, description = "Event id")),
    request_body = JoinEventRequest,
    responses(
        (status = 200, description = "Left event", body = LeaveEventResponse),
        (status = 400, description = "Missing uid", body = ApiError),
        (status = 404, description = "Event or registration not found", body = ApiError)
    )
)]
pub async fn leave_event(
    State(state): State<AppState>,
    Path(event_id): Path<i32>,
    Json(payload): Json<JoinEventRequest>,
) -> ApiResult<Json<LeaveEventResponse>> {
    let uid = payload
        .uid
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("uid is required", "MISSING_UID"))?;

    let mut conn = get_db_conn(&state.db_pool)?;

    conn.transaction::<_, EngineError, _>(|conn| {
        events::table
            .find(event_id)
            .select(events::event_id)
            .for_update()
            .first::<i32>(conn)
            .optional()?
            .ok_or_else(|| EngineError::not_found("Event not found", "EVENT_NOT_FOUND"))?;

        let removed = diesel::delete(event_participants::table.find((event_id, uid.clone())))
            .execute(conn)?;

        if removed == 0 {
            return Err(EngineError::not_found(
                "You are not registered for this event",
                "NOT_REGISTERED",
            ));
        }

        diesel::update(events::table.find(event_id))
            .set(events::curr_p.eq(events::curr_p - 1))
            .execute(conn)?;

        Ok(())
    })?;

    info!(event_id, uid = %uid, "User left event");

    Ok(Json(LeaveEventResponse {
        message: "Left event".to_string(),
        event_id,
    }))
}

#[utoipa::path(
    get,
    path = "/events/{id}/participants",
    tag = "Events",
    params(("id" = i32, Path, description = "Event id")),
    responses((status = 200, description = "Event roster", body = [ParticipantRecord]))
)]
pub async fn get_event_participants(
    State(state): State<AppState>,
    Path(event_id): Path<i32>,
) -> ApiResult<Json<Vec<ParticipantRecord>>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let rows: Vec<ParticipantRecord> = event_participants::table
        .inner_join(users::table)
        .filter(event_participants::event_id.eq(event_id))
        .order(event_participants::joined_at.asc())
        .select((
            event_participants::uid,
            users::created_at,
            users::last_login,
            event_participants::joined_at,
        ))
        .load(&mut conn)
        .map_err(classify_db_error)?;

    Ok(Json(rows))
}

#[utoipa::path(
    post,
    path = "/events/{id}/participation",
    tag = "Events",
    params(("id" = i32, Path, description = "Event id")),
    request_body = ParticipationRequest,
    responses(
        (status = 200, description = "Participation decided", body = ParticipationResponse),
        (status = 400, description = "Invalid action or missing uid", body = ApiError),
        (status = 404, description = "Event not found", body = ApiError),
        (status = 409, description = "Event full", body = ApiError)
    )
)]
pub async fn handle_event_participation(
    State(state): State<AppState>,
    Path(event_id): Path<i32>,
    Json(payload): Json<ParticipationRequest>,
) -> ApiResult<Json<ParticipationResponse>> {
    let uid = payload
        .uid
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("uid is required", "MISSING_UID"))?;

    let action = payload
        .action
        .as_deref()
        .and_then(ParticipationAction::parse)
        .ok_or_else(|| {
            ApiError::bad_request(
                "Invalid action. Use \"approve\" or \"reject\".",
                "INVALID_ACTION",
            )
        })?;

    let mut conn = get_db_conn(&state.db_pool)?;

    conn.transaction::<_, EngineError, _>(|conn| {
        let event: Event = events::table
            .find(event_id)
            .select(Event::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::not_found("Event not found", "EVENT_NOT_FOUND"))?;

        match action {
            ParticipationAction::Approve => {
                if !has_capacity(event.curr_p, event.max_p) {
                    return Err(EngineError::capacity("Event full", "EVENT_FULL"));
                }

                diesel::insert_into(event_participants::table)
                    .values(&NewEventParticipant {
                        event_id,
                        uid: uid.clone(),
                    })
                    .execute(conn)?;

                diesel::update(events::table.find(event_id))
                    .set(events::curr_p.eq(events::curr_p + 1))
                    .execute(conn)?;

                NotificationService::personal(
                    conn,
                    &uid,
                    &format!("You have been approved for the event: {}", event.title),
                    Some(event_id),
                )?;
            }
            ParticipationAction::Reject => {
                NotificationService::personal(
                    conn,
                    &uid,
                    &format!("Your participation in the event {} was rejected.", event.title),
                    Some(event_id),
                )?;
            }
        }

        Ok(())
    })?;

    info!(event_id, uid = %uid, action = ?action, "Participation decided");

    let message = match action {
        ParticipationAction::Approve => "Event participation approved and notification sent",
        ParticipationAction::Reject => "Event participation rejected and notification sent",
    };

    Ok(Json(ParticipationResponse {
        message: message.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_capacity() {
        assert!(has_capacity(0, 1));
        assert!(has_capacity(9, 10));
        assert!(!has_capacity(10, 10));
        assert!(!has_capacity(11, 10));
        assert!(!has_capacity(0, 0));
    }

    #[test]
    fn test_participation_action_parse() {
        assert_eq!(
            ParticipationAction::parse("approve"),
            Some(ParticipationAction::Approve)
        );
        assert_eq!(
            ParticipationAction::parse("reject"),
            Some(ParticipationAction::Reject)
        );
        assert_eq!(ParticipationAction::parse("Approve"), None);
        assert_eq!(ParticipationAction::parse(""), None);
        assert_eq!(ParticipationAction::parse("delete"), None);
    }

    #[test]
    fn test_parse_date() {
        assert!(parse_date("2025-12-12").is_some());
        assert!(parse_date("2025-13-01").is_none());
        assert!(parse_date("12/12/2025").is_none());
    }
}
