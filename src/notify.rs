//! Notification emitter.
//!
//! Inserts derived notification rows as a side effect of the booking and
//! event engines. Emitters take a `&mut PgConnection` so callers can run
//! them inside the same transaction as the state change they describe.

use diesel::prelude::*;
use tracing::{debug, instrument};

use crate::models::{NewNotification, Notification};
use crate::schema::notifications;

#[derive(Debug, Clone)]
pub struct NotificationService;

impl NotificationService {
    /// Records a message addressed to a single user.
    #[instrument(skip(conn, message), fields(uid = %uid))]
    pub fn personal(
        conn: &mut PgConnection,
        uid: &str,
        message: &str,
        event_id: Option<i32>,
    ) -> Result<Notification, diesel::result::Error> {
        let row = NewNotification {
            uid: Some(uid.to_string()),
            message: message.to_string(),
            event_id,
        };

        let result: Notification = diesel::insert_into(notifications::table)
            .values(&row)
            .returning(Notification::as_returning())
            .get_result(conn)?;

        debug!(notification_id = result.notification_id, "Personal notification recorded");
        Ok(result)
    }

    /// Records a broadcast message with no addressee (`uid` is null).
    #[instrument(skip(conn, message))]
    pub fn general(
        conn: &mut PgConnection,
        message: &str,
    ) -> Result<Notification, diesel::result::Error> {
        let row = NewNotification {
            uid: None,
            message: message.to_string(),
            event_id: None,
        };

        let result: Notification = diesel::insert_into(notifications::table)
            .values(&row)
            .returning(Notification::as_returning())
            .get_result(conn)?;

        debug!(notification_id = result.notification_id, "General notification recorded");
        Ok(result)
    }

    /// Returns the union of a user's personal notifications and all
    /// broadcasts, most recent first.
    pub fn list_for_user(
        conn: &mut PgConnection,
        uid: &str,
    ) -> Result<Vec<Notification>, diesel::result::Error> {
        notifications::table
            .filter(notifications::uid.eq(uid).or(notifications::uid.is_null()))
            .order((
                notifications::created_at.desc(),
                notifications::notification_id.desc(),
            ))
            .select(Notification::as_select())
            .load(conn)
    }
}
