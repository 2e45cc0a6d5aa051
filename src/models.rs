use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Queryable, Selectable, Serialize, Deserialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::bookings)]
pub struct Booking {
    pub booking_id: i32,
    pub facility_id: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[schema(example = "user_42")]
    pub uid: String,
    /// Tri-state: `None` = pending, `Some(true)` = approved, `Some(false)` = rejected.
    pub approved: Option<bool>,
    #[schema(example = "pending")]
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct NewBooking {
    pub facility_id: i32,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub uid: String,
}

/// Allow-listed updatable booking columns. Anything the caller sends
/// outside this set is ignored rather than forwarded to the database.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = crate::schema::bookings)]
pub struct BookingChanges {
    pub facility_id: Option<i32>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub approved: Option<bool>,
    pub status: Option<String>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        self.facility_id.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.approved.is_none()
            && self.status.is_none()
    }
}

#[derive(Debug, Queryable, Selectable, Serialize, Deserialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::events)]
pub struct Event {
    pub event_id: i32,
    #[schema(example = "Friday five-a-side")]
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub facility_id: i32,
    pub max_p: i32,
    pub curr_p: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::events)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub facility_id: i32,
    pub max_p: i32,
    pub curr_p: i32,
}

/// Allow-listed updatable event columns.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = crate::schema::events)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
    pub facility_id: Option<i32>,
    pub max_p: Option<i32>,
}

impl EventChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.date.is_none()
            && self.facility_id.is_none()
            && self.max_p.is_none()
    }
}

#[derive(Debug, Queryable, Selectable, Serialize, Deserialize, Clone)]
#[diesel(table_name = crate::schema::event_participants)]
pub struct EventParticipant {
    pub event_id: i32,
    pub uid: String,
    pub joined_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::event_participants)]
pub struct NewEventParticipant {
    pub event_id: i32,
    pub uid: String,
}

#[derive(Debug, Queryable, Selectable, Serialize, Deserialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::facilities)]
pub struct Facility {
    pub facility_id: i32,
    #[schema(example = "North Court")]
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Queryable, Selectable, Serialize, Deserialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::notifications)]
pub struct Notification {
    pub notification_id: i32,
    /// `None` marks a general broadcast visible to every user.
    pub uid: Option<String>,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub event_id: Option<i32>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::notifications)]
pub struct NewNotification {
    pub uid: Option<String>,
    pub message: String,
    pub event_id: Option<i32>,
}

#[derive(Debug, Queryable, Selectable, Serialize, Deserialize, Clone, ToSchema)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    #[schema(example = "user_42")]
    pub uid: String,
    pub created_at: NaiveDateTime,
    pub last_login: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub uid: String,
}
