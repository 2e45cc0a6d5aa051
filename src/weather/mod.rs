//! Weather integration: an external provider client and the scheduled job
//! that turns per-facility weather into daily general notifications.

pub mod client;
pub mod job;

pub use client::{OpenWeatherClient, WeatherError, WeatherProvider, WeatherReport};
pub use job::WeatherNotifier;
