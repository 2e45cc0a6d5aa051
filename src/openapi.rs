//! OpenAPI documentation configuration.
//!
//! Generates the OpenAPI specification with `utoipa` and serves it via
//! Swagger UI at `/swagger-ui`.

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::error::ApiError;
use crate::handlers::bookings::{
    BookingCreatedResponse, BookingDeletedResponse, CreateBookingRequest, StatusResponse,
    UpdateBookingRequest,
};
use crate::handlers::events::{
    CreateEventRequest, EventResponse, JoinEventRequest, JoinEventResponse, LeaveEventResponse,
    ParticipantRecord, ParticipationRequest, ParticipationResponse, UpdateEventRequest,
};
use crate::handlers::health::{ComponentStatus, HealthResponse, ReadinessResponse};
use crate::handlers::notifications::{AnnouncementResponse, CreateAnnouncementRequest};
use crate::handlers::users::{CreateUserRequest, UserCreatedResponse};
use crate::models::{Booking, Event, Facility, Notification, User};
use crate::pagination::{PaginatedResponse, PaginationMeta};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Courtside API",
        description = "Facility booking backend with capacity-limited events.\n\n\
        ## Bookings\n\
        Bookings reserve a time slot on a facility and start out pending.\n\
        A pending or approved booking blocks conflicting requests; an\n\
        administrator approves or rejects pending bookings, which notifies\n\
        the owner.\n\n\
        ## Events\n\
        Events carry a participant capacity. Joining and leaving maintain\n\
        the roster and the participant count atomically.\n\n\
        ## Notifications\n\
        Users see their personal notifications plus general broadcasts,\n\
        including the daily per-facility weather summary.",
        contact(name = "Courtside API Support")
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Bookings", description = "Facility bookings and the approval workflow"),
        (name = "Events", description = "Events, rosters and participation"),
        (name = "Notifications", description = "Personal and broadcast notifications"),
        (name = "Users", description = "User registration")
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::ready_check,

        crate::handlers::bookings::list_bookings,
        crate::handlers::bookings::list_unapproved_bookings,
        crate::handlers::bookings::get_booking,
        crate::handlers::bookings::create_booking,
        crate::handlers::bookings::delete_booking,
        crate::handlers::bookings::update_booking,
        crate::handlers::bookings::approve_booking,
        crate::handlers::bookings::reject_booking,

        crate::handlers::events::create_event,
        crate::handlers::events::list_events,
        crate::handlers::events::get_event,
        crate::handlers::events::update_event,
        crate::handlers::events::delete_event,
        crate::handlers::events::join_event,
        crate::handlers::events::leave_event,
        crate::handlers::events::get_event_participants,
        crate::handlers::events::handle_event_participation,

        crate::handlers::notifications::list_notifications_for_user,
        crate::handlers::notifications::create_general_announcement,

        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
    ),
    components(schemas(
        ApiError,
        Booking,
        Event,
        Facility,
        Notification,
        User,
        CreateBookingRequest,
        UpdateBookingRequest,
        BookingCreatedResponse,
        BookingDeletedResponse,
        StatusResponse,
        CreateEventRequest,
        UpdateEventRequest,
        EventResponse,
        JoinEventRequest,
        JoinEventResponse,
        LeaveEventResponse,
        ParticipantRecord,
        ParticipationRequest,
        ParticipationResponse,
        CreateAnnouncementRequest,
        AnnouncementResponse,
        CreateUserRequest,
        UserCreatedResponse,
        HealthResponse,
        ReadinessResponse,
        ComponentStatus,
        PaginationMeta,
        PaginatedResponse<Booking>,
    ))
)]
pub struct ApiDoc;

pub fn swagger_router() -> Router {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
