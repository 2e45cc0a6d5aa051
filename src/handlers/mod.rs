//! HTTP request handlers.

pub mod bookings;
pub mod events;
pub mod health;
pub mod notifications;
pub mod users;
