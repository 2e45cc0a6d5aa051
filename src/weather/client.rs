//! Client for the external current-weather data source.

use std::future::Future;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed weather response: {0}")]
    MalformedResponse(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub description: String,
    pub temperature_celsius: f64,
}

/// Supplies current weather for a coordinate pair. Implemented by the
/// OpenWeather client in production and by stubs in tests.
pub trait WeatherProvider: Send + Sync + 'static {
    fn current_weather(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<WeatherReport, WeatherError>> + Send;
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct OpenWeatherResponse {
    weather: Vec<WeatherCondition>,
    main: MainReadings,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

impl WeatherProvider for OpenWeatherClient {
    fn current_weather(
        &self,
        lat: f64,
        lon: f64,
    ) -> impl Future<Output = Result<WeatherReport, WeatherError>> + Send {
        let request = self
            .client
            .get(&self.base_url)
            .query(&[("lat", lat.to_string()), ("lon", lon.to_string())])
            .query(&[("appid", self.api_key.as_str()), ("units", "metric")]);

        async move {
            let response: OpenWeatherResponse = request
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let condition = response
                .weather
                .into_iter()
                .next()
                .ok_or(WeatherError::MalformedResponse("empty weather array"))?;

            Ok(WeatherReport {
                description: condition.description,
                temperature_celsius: response.main.temp,
            })
        }
    }
}
