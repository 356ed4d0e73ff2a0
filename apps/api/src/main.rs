use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;
mod seed;

use appointment_cell::SchedulingState;
use patient_cell::ReferenceDataState;
use shared_config::{AppConfig, StoreBackend};
use shared_database::{AppointmentStore, MemoryStore, RestStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting clinic scheduler");

    let config = AppConfig::from_env();

    let store: Arc<dyn AppointmentStore> = match config.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory appointment store");
            Arc::new(MemoryStore::new())
        }
        StoreBackend::Rest => {
            info!("Using REST appointment store at {}", config.store_url);
            Arc::new(RestStore::new(&config).context("failed to build REST store client")?)
        }
    };

    let scheduling = Arc::new(SchedulingState::new(Arc::clone(&store), &config));
    let reference = Arc::new(ReferenceDataState::new(store, &config));

    if config.populate_db {
        let report = seed::populate(&config, &scheduling, &reference)
            .await
            .context("failed to populate sample data")?;
        info!(
            "Sample data loaded: {} patients, {} appointment types, {} of {} appointments booked",
            report.patients, report.appointment_types, report.booked, report.attempted
        );
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router::create_router(scheduling, reference)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address))?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
