//! Booking handlers: conflict-checked creation, updates, and the
//! approve/reject workflow.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{
    config::BookingConfig,
    error::{classify_db_error, get_db_conn, ApiError, ApiResult, EngineError},
    models::{Booking, BookingChanges, NewBooking},
    notify::NotificationService,
    pagination::{PaginatedResponse, PaginationParams},
    schema::{bookings, facilities},
    AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    #[schema(example = 5)]
    pub facility_id: Option<i32>,
    #[schema(example = "2025-06-01T10:00:00")]
    pub start_time: Option<String>,
    #[schema(example = "2025-06-01T11:00:00")]
    pub end_time: Option<String>,
    #[schema(example = "user_42")]
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingCreatedResponse {
    #[schema(example = "Booking successfully created")]
    pub message: String,
    pub booking_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingDeletedResponse {
    #[schema(example = "Booking deleted")]
    pub message: String,
    pub booking_id: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBookingRequest {
    pub facility_id: Option<i32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub approved: Option<bool>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "Booking approved and notification sent")]
    pub message: String,
}

/// A persisted booking that can block a new request. Rejected bookings are
/// filtered out before rows reach this type.
#[derive(Debug, Queryable)]
struct BlockingWindow {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
    approved: Option<bool>,
}

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start, b_end)`.
fn overlaps(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Decides whether an existing pending/approved booking blocks a new
/// request. A pending booking blocks the entire facility when the policy
/// flag is set, regardless of time overlap.
fn blocks(
    existing: &BlockingWindow,
    new_start: NaiveDateTime,
    new_end: NaiveDateTime,
    policy: BookingConfig,
) -> bool {
    if existing.approved == Some(false) {
        return false;
    }
    if policy.pending_blocks_facility && existing.approved.is_none() {
        return true;
    }
    overlaps(existing.start_time, existing.end_time, new_start, new_end)
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DDTHH:MM:SS` / space-separated
/// timestamp, as sent by the booking clients.
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
}

/// Slot time as shown to users: shifted +2h to compensate for the client
/// timezone, formatted `HH:MM`.
fn display_slot_time(start: NaiveDateTime) -> String {
    (start + Duration::hours(2)).format("%H:%M").to_string()
}

#[utoipa::path(
    get,
    path = "/bookings",
    tag = "Bookings",
    params(PaginationParams),
    responses(
        (status = 200, description = "All bookings", body = PaginatedResponse<Booking>),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<Json<PaginatedResponse<Booking>>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let total: i64 = bookings::table
        .count()
        .get_result(&mut conn)
        .map_err(classify_db_error)?;

    let rows = bookings::table
        .order(bookings::booking_id.asc())
        .limit(params.per_page())
        .offset(params.offset())
        .select(Booking::as_select())
        .load(&mut conn)
        .map_err(classify_db_error)?;

    Ok(Json(PaginatedResponse::from_params(rows, &params, total)))
}

#[utoipa::path(
    get,
    path = "/bookings/unapproved",
    tag = "Bookings",
    responses(
        (status = 200, description = "Bookings awaiting a decision", body = [Booking]),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn list_unapproved_bookings(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Booking>>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let rows = bookings::table
        .filter(bookings::approved.is_null())
        .order(bookings::created_at.asc())
        .select(Booking::as_select())
        .load(&mut conn)
        .map_err(classify_db_error)?;

    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/bookings/{id}",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking found", body = Booking),
        (status = 404, description = "Booking not found", body = ApiError)
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Booking>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    bookings::table
        .find(id)
        .select(Booking::as_select())
        .first(&mut conn)
        .optional()
        .map_err(classify_db_error)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Booking not found", "BOOKING_NOT_FOUND"))
}

#[utoipa::path(
    post,
    path = "/bookings",
    tag = "Bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = BookingCreatedResponse),
        (status = 400, description = "Missing or malformed fields", body = ApiError),
        (status = 409, description = "Time slot conflict", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<BookingCreatedResponse>)> {
    let (facility_id, start_raw, end_raw, uid) = match (
        payload.facility_id,
        payload.start_time,
        payload.end_time,
        payload.uid.filter(|u| !u.is_empty()),
    ) {
        (Some(f), Some(s), Some(e), Some(u)) => (f, s, e, u),
        _ => return Err(ApiError::bad_request("Missing required fields", "MISSING_FIELDS")),
    };

    let start_time = parse_timestamp(&start_raw)
        .ok_or_else(|| ApiError::bad_request("Invalid start_time", "INVALID_TIMESTAMP"))?;
    let end_time = parse_timestamp(&end_raw)
        .ok_or_else(|| ApiError::bad_request("Invalid end_time", "INVALID_TIMESTAMP"))?;

    if start_time >= end_time {
        return Err(ApiError::bad_request(
            "start_time must be before end_time",
            "INVALID_TIME_RANGE",
        ));
    }

    let policy = state.booking;
    let mut conn = get_db_conn(&state.db_pool)?;

    let booking_id = conn.transaction::<_, EngineError, _>(|conn| {
        // Lock the facility row so concurrent requests for the same
        // facility serialize their conflict checks.
        facilities::table
            .find(facility_id)
            .select(facilities::facility_id)
            .for_update()
            .first::<i32>(conn)
            .optional()?;

        let candidates: Vec<BlockingWindow> = bookings::table
            .filter(bookings::facility_id.eq(facility_id))
            .filter(bookings::approved.is_null().or(bookings::approved.eq(true)))
            .select((bookings::start_time, bookings::end_time, bookings::approved))
            .load(conn)?;

        if candidates
            .iter()
            .any(|c| blocks(c, start_time, end_time, policy))
        {
            return Err(EngineError::conflict(
                "Time slot conflicts with existing booking",
                "BOOKING_CONFLICT",
            ));
        }

        let id = diesel::insert_into(bookings::table)
            .values(&NewBooking {
                facility_id,
                start_time,
                end_time,
                uid: uid.clone(),
            })
            .returning(bookings::booking_id)
            .get_result::<i32>(conn)?;

        Ok(id)
    })?;

    info!(booking_id, facility_id, uid = %uid, "Booking created");

    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            message: "Booking successfully created".to_string(),
            booking_id,
        }),
    ))
}

#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking deleted", body = BookingDeletedResponse),
        (status = 404, description = "Booking not found", body = ApiError)
    )
)]
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<BookingDeletedResponse>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    let deleted = diesel::delete(bookings::table.find(id))
        .execute(&mut conn)
        .map_err(classify_db_error)?;

    if deleted == 0 {
        return Err(ApiError::not_found("Booking not found", "BOOKING_NOT_FOUND"));
    }

    info!(booking_id = id, "Booking deleted");

    Ok(Json(BookingDeletedResponse {
        message: "Booking deleted".to_string(),
        booking_id: id,
    }))
}

#[utoipa::path(
    patch,
    path = "/bookings/{id}",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    request_body = UpdateBookingRequest,
    responses(
        (status = 200, description = "Merged booking record", body = Booking),
        (status = 400, description = "No updatable fields provided", body = ApiError),
        (status = 404, description = "Booking not found", body = ApiError)
    )
)]
pub async fn update_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBookingRequest>,
) -> ApiResult<Json<Booking>> {
    let start_time = payload
        .start_time
        .as_deref()
        .map(|raw| {
            parse_timestamp(raw)
                .ok_or_else(|| ApiError::bad_request("Invalid start_time", "INVALID_TIMESTAMP"))
        })
        .transpose()?;
    let end_time = payload
        .end_time
        .as_deref()
        .map(|raw| {
            parse_timestamp(raw)
                .ok_or_else(|| ApiError::bad_request("Invalid end_time", "INVALID_TIMESTAMP"))
        })
        .transpose()?;

    let changes = BookingChanges {
        facility_id: payload.facility_id,
        start_time,
        end_time,
        approved: payload.approved,
        status: payload.status,
    };

    if changes.is_empty() {
        return Err(ApiError::bad_request(
            "No fields provided to update",
            "NO_FIELDS",
        ));
    }

    let mut conn = get_db_conn(&state.db_pool)?;

    let updated = diesel::update(bookings::table.find(id))
        .set(&changes)
        .returning(Booking::as_returning())
        .get_result::<Booking>(&mut conn)
        .optional()
        .map_err(classify_db_error)?
        .ok_or_else(|| ApiError::not_found("Booking not found", "BOOKING_NOT_FOUND"))?;

    info!(booking_id = id, "Booking updated");

    Ok(Json(updated))
}

#[derive(Debug, Clone, Copy)]
enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn approved(self) -> bool {
        matches!(self, Decision::Approve)
    }

    fn status(self) -> &'static str {
        match self {
            Decision::Approve => "approved",
            Decision::Reject => "rejected",
        }
    }

    fn notification(self, facility_name: &str, time_str: &str) -> String {
        match self {
            Decision::Approve => format!(
                "Your booking at {} is confirmed for {}",
                facility_name, time_str
            ),
            Decision::Reject => format!(
                "Your booking at {} for {} was rejected.",
                facility_name, time_str
            ),
        }
    }

    fn ack(self) -> &'static str {
        match self {
            Decision::Approve => "Booking approved and notification sent",
            Decision::Reject => "Booking rejected and notification sent",
        }
    }
}

/// Status update and notification insert commit or roll back together.
fn decide_booking(state: &AppState, id: i32, decision: Decision) -> ApiResult<Json<StatusResponse>> {
    let mut conn = get_db_conn(&state.db_pool)?;

    conn.transaction::<_, EngineError, _>(|conn| {
        let booking: Booking = bookings::table
            .find(id)
            .select(Booking::as_select())
            .for_update()
            .first(conn)
            .optional()?
            .ok_or_else(|| EngineError::not_found("Booking not found", "BOOKING_NOT_FOUND"))?;

        let facility_name = facilities::table
            .find(booking.facility_id)
            .select(facilities::name)
            .first::<String>(conn)
            .optional()?
            .unwrap_or_else(|| "Unknown Facility".to_string());

        let time_str = display_slot_time(booking.start_time);

        diesel::update(bookings::table.find(id))
            .set((
                bookings::approved.eq(decision.approved()),
                bookings::status.eq(decision.status()),
            ))
            .execute(conn)?;

        NotificationService::personal(
            conn,
            &booking.uid,
            &decision.notification(&facility_name, &time_str),
            None,
        )?;

        Ok(())
    })?;

    info!(booking_id = id, decision = decision.status(), "Booking decided");

    Ok(Json(StatusResponse {
        message: decision.ack().to_string(),
    }))
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/approve",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking approved", body = StatusResponse),
        (status = 404, description = "Booking not found", body = ApiError)
    )
)]
pub async fn approve_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<StatusResponse>> {
    decide_booking(&state, id, Decision::Approve)
}

#[utoipa::path(
    put,
    path = "/bookings/{id}/reject",
    tag = "Bookings",
    params(("id" = i32, Path, description = "Booking id")),
    responses(
        (status = 200, description = "Booking rejected", body = StatusResponse),
        (status = 404, description = "Booking not found", body = ApiError)
    )
)]
pub async fn reject_booking(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<StatusResponse>> {
    decide_booking(&state, id, Decision::Reject)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
    }

    fn window(start: &str, end: &str, approved: Option<bool>) -> BlockingWindow {
        BlockingWindow {
            start_time: ts(start),
            end_time: ts(end),
            approved,
        }
    }

    const POLICY: BookingConfig = BookingConfig {
        pending_blocks_facility: true,
    };

    const OVERLAP_ONLY: BookingConfig = BookingConfig {
        pending_blocks_facility: false,
    };

    #[test]
    fn test_overlap_half_open() {
        let a = (ts("2025-06-01T10:00:00"), ts("2025-06-01T11:00:00"));
        // Overlapping interior.
        assert!(overlaps(a.0, a.1, ts("2025-06-01T10:30:00"), ts("2025-06-01T11:30:00")));
        // Touching endpoints do not overlap.
        assert!(!overlaps(a.0, a.1, ts("2025-06-01T11:00:00"), ts("2025-06-01T12:00:00")));
        assert!(!overlaps(a.0, a.1, ts("2025-06-01T09:00:00"), ts("2025-06-01T10:00:00")));
        // Containment overlaps.
        assert!(overlaps(a.0, a.1, ts("2025-06-01T09:00:00"), ts("2025-06-01T12:00:00")));
    }

    #[test]
    fn test_pending_blocks_whole_facility() {
        let pending = window("2025-06-01T10:00:00", "2025-06-01T11:00:00", None);
        // Non-overlapping request still blocked while a pending booking exists.
        assert!(blocks(&pending, ts("2025-06-01T12:00:00"), ts("2025-06-01T13:00:00"), POLICY));
        // With the flag off, only the overlap matters.
        assert!(!blocks(
            &pending,
            ts("2025-06-01T12:00:00"),
            ts("2025-06-01T13:00:00"),
            OVERLAP_ONLY
        ));
        assert!(blocks(
            &pending,
            ts("2025-06-01T10:30:00"),
            ts("2025-06-01T11:30:00"),
            OVERLAP_ONLY
        ));
    }

    #[test]
    fn test_approved_blocks_only_on_overlap() {
        let approved = window("2025-06-01T10:00:00", "2025-06-01T11:00:00", Some(true));
        assert!(blocks(&approved, ts("2025-06-01T10:30:00"), ts("2025-06-01T11:30:00"), POLICY));
        assert!(!blocks(&approved, ts("2025-06-01T12:00:00"), ts("2025-06-01T13:00:00"), POLICY));
    }

    #[test]
    fn test_rejected_never_blocks() {
        let rejected = window("2025-06-01T10:00:00", "2025-06-01T11:00:00", Some(false));
        assert!(!blocks(&rejected, ts("2025-06-01T10:00:00"), ts("2025-06-01T11:00:00"), POLICY));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-06-01T10:00:00").is_some());
        assert!(parse_timestamp("2025-06-01 10:00:00").is_some());
        assert_eq!(
            parse_timestamp("2025-06-01T10:00:00Z"),
            Some(ts("2025-06-01T10:00:00"))
        );
        assert_eq!(
            parse_timestamp("2025-06-01T12:00:00+02:00"),
            Some(ts("2025-06-01T10:00:00"))
        );
        assert!(parse_timestamp("not-a-timestamp").is_none());
        assert!(parse_timestamp("2025-13-01T10:00:00").is_none());
    }

    #[test]
    fn test_display_slot_time_shifts_two_hours() {
        assert_eq!(display_slot_time(ts("2025-06-01T10:00:00")), "12:00");
        assert_eq!(display_slot_time(ts("2025-06-01T09:30:00")), "11:30");
        // Wraps past midnight.
        assert_eq!(display_slot_time(ts("2025-06-01T23:15:00")), "01:15");
    }

    #[test]
    fn test_decision_messages() {
        assert_eq!(
            Decision::Approve.notification("North Court", "12:00"),
            "Your booking at North Court is confirmed for 12:00"
        );
        assert_eq!(
            Decision::Reject.notification("North Court", "12:00"),
            "Your booking at North Court for 12:00 was rejected."
        );
        assert_eq!(Decision::Approve.status(), "approved");
        assert_eq!(Decision::Reject.status(), "rejected");
    }
}
