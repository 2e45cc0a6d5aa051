use std::time::Duration;

use courtside::{
    create_db_pool, create_router, init_tracing,
    weather::{OpenWeatherClient, WeatherNotifier},
    AppState, Config,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    init_tracing(&config);

    info!(
        service = "courtside",
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        "Starting server"
    );

    let issues = config.validate_for_production();
    if !issues.is_empty() {
        for issue in &issues {
            warn!(issue = %issue, "Configuration warning");
        }
    }

    info!(
        database_url = %config.database.url.split('@').next_back().unwrap_or("***"),
        max_connections = config.database.max_connections,
        "Connecting to database"
    );

    let db_pool = create_db_pool(&config);

    info!("Database connection pool created");

    let api_key = config
        .weather
        .api_key
        .clone()
        .filter(|_| config.weather.enabled);
    let weather_shutdown = if let Some(api_key) = api_key {
        let notifier = WeatherNotifier::new(
            db_pool.clone(),
            OpenWeatherClient::new(api_key),
            Duration::from_secs(config.weather.refresh_interval_secs),
        );
        Some(notifier.spawn())
    } else {
        info!("Weather notifier disabled");
        None
    };

    let state = AppState::new(db_pool, &config);
    let app = create_router(state, &config);

    let http_addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, address = %http_addr, "Failed to bind HTTP server");
            std::process::exit(1);
        });

    info!(
        http_address = %http_addr,
        docs_url = %format!("http://{}/swagger-ui", http_addr),
        "HTTP server ready"
    );

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Shutdown signal received");
    };

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await;

    if let Err(e) = result {
        error!(error = %e, "HTTP server error");
    }

    if let Some(shutdown) = weather_shutdown {
        info!("Shutting down weather notifier...");
        let _ = shutdown.send(true);
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    info!("Server shutdown complete");
}
