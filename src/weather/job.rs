//! Scheduled weather notifier.
//!
//! Periodically fetches current weather per facility and maintains at most
//! one general weather notification per facility per day, overwriting the
//! existing row in place on later runs.

use std::time::Duration;

use chrono::Utc;
use diesel::prelude::*;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info, instrument, warn};

use crate::notify::NotificationService;
use crate::schema::{facilities, notifications};
use crate::DbPool;

use super::client::{WeatherProvider, WeatherReport};

#[derive(Debug, Error)]
pub enum WeatherJobError {
    #[error("database error: {0}")]
    Database(String),
    #[error("worker task failed: {0}")]
    Task(String),
}

pub struct WeatherNotifier<W> {
    db_pool: DbPool,
    provider: W,
    refresh_interval: Duration,
}

pub fn daily_summary(facility_name: &str, report: &WeatherReport) -> String {
    format!(
        "Today's weather at {}: {}, {}°C",
        facility_name,
        report.description,
        report.temperature_celsius.round() as i64
    )
}

/// The stable prefix used to find today's notification for a facility so
/// later runs overwrite it instead of stacking duplicates.
pub fn summary_prefix(facility_name: &str) -> String {
    format!("Today's weather at {}:", facility_name)
}

impl<W: WeatherProvider> WeatherNotifier<W> {
    pub fn new(db_pool: DbPool, provider: W, refresh_interval: Duration) -> Self {
        Self {
            db_pool,
            provider,
            refresh_interval,
        }
    }

    pub fn spawn(self) -> watch::Sender<bool> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });

        shutdown_tx
    }

    #[instrument(skip(self, shutdown_rx), name = "weather_notifier")]
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            refresh_interval_secs = self.refresh_interval.as_secs(),
            "Weather notifier started"
        );

        let mut timer = interval(self.refresh_interval);

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match self.refresh_all().await {
                        Ok(count) => debug!(facilities = count, "Weather notifications refreshed"),
                        Err(e) => error!(error = %e, "Weather refresh cycle failed"),
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Weather notifier received shutdown signal");
                        break;
                    }
                }
            }
        }

        info!("Weather notifier stopped");
    }

    /// Refreshes the daily notification for every facility with known
    /// coordinates. A failed fetch for one facility is logged and skipped;
    /// it never aborts the cycle for the others.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) -> Result<usize, WeatherJobError> {
        let targets = {
            let pool = self.db_pool.clone();
            tokio::task::spawn_blocking(move || {
                let mut conn = pool
                    .get()
                    .map_err(|e| WeatherJobError::Database(e.to_string()))?;

                facilities::table
                    .filter(facilities::latitude.is_not_null())
                    .filter(facilities::longitude.is_not_null())
                    .select((
                        facilities::facility_id,
                        facilities::name,
                        facilities::latitude.assume_not_null(),
                        facilities::longitude.assume_not_null(),
                    ))
                    .load::<(i32, String, f64, f64)>(&mut conn)
                    .map_err(|e| WeatherJobError::Database(e.to_string()))
            })
            .await
            .map_err(|e| WeatherJobError::Task(e.to_string()))??
        };

        let mut refreshed = 0;

        for (facility_id, name, lat, lon) in targets {
            let report = match self.provider.current_weather(lat, lon).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(facility_id, facility = %name, error = %e, "Weather fetch failed");
                    continue;
                }
            };

            let summary = daily_summary(&name, &report);
            let prefix = summary_prefix(&name);
            let pool = self.db_pool.clone();

            let result = tokio::task::spawn_blocking(move || {
                let mut conn = pool
                    .get()
                    .map_err(|e| WeatherJobError::Database(e.to_string()))?;

                upsert_daily_notification(&mut conn, &prefix, &summary)
                    .map_err(|e| WeatherJobError::Database(e.to_string()))
            })
            .await
            .map_err(|e| WeatherJobError::Task(e.to_string()))?;

            match result {
                Ok(()) => refreshed += 1,
                Err(e) => warn!(facility_id, facility = %name, error = %e, "Weather upsert failed"),
            }
        }

        Ok(refreshed)
    }
}

/// Inserts today's weather notification for a facility, or overwrites it
/// if one already exists. The row is locked while it is checked so
/// overlapping job runs cannot each insert a copy.
fn upsert_daily_notification(
    conn: &mut PgConnection,
    prefix: &str,
    summary: &str,
) -> Result<(), diesel::result::Error> {
    let today_start = Utc::now().date_naive().and_time(chrono::NaiveTime::MIN);
    let pattern = format!("{}%", prefix);

    conn.transaction(|conn| {
        let existing: Option<i32> = notifications::table
            .filter(notifications::uid.is_null())
            .filter(notifications::created_at.ge(today_start))
            .filter(notifications::message.like(&pattern))
            .select(notifications::notification_id)
            .order(notifications::notification_id.desc())
            .for_update()
            .first(conn)
            .optional()?;

        match existing {
            Some(id) => {
                diesel::update(notifications::table.find(id))
                    .set((
                        notifications::message.eq(summary),
                        notifications::created_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?;
            }
            None => {
                NotificationService::general(conn, summary)?;
            }
        }

        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_summary_rounds_temperature() {
        let report = WeatherReport {
            description: "light rain".to_string(),
            temperature_celsius: 17.6,
        };
        assert_eq!(
            daily_summary("North Court", &report),
            "Today's weather at North Court: light rain, 18°C"
        );

        let report = WeatherReport {
            description: "clear sky".to_string(),
            temperature_celsius: -3.4,
        };
        assert_eq!(
            daily_summary("South Field", &report),
            "Today's weather at South Field: clear sky, -3°C"
        );
    }

    #[test]
    fn test_summary_prefix_matches_summary() {
        let report = WeatherReport {
            description: "mist".to_string(),
            temperature_celsius: 9.0,
        };
        let summary = daily_summary("North Court", &report);
        assert!(summary.starts_with(&summary_prefix("North Court")));
        assert!(!summary.starts_with(&summary_prefix("South Field")));
    }
}
