use axum::{Extension, http::Method, routing::get};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use payments::modules::payments::adapters::outbound::payment_processor::PaymentProcessor;
use payments::modules::payments::adapters::outbound::payment_processor_in_memory::InMemoryPaymentProcessor;
use payments::modules::payments::adapters::outbound::payment_store_in_memory::InMemoryPaymentStore;
use payments::modules::payments::adapters::outbound::stripe::StripePaymentProcessor;
use payments::modules::payments::use_cases::create_payment::inbound::broker::APPOINTMENT_SLOT_RESERVED;
use payments::shared::infrastructure::event_bus::EventPublisher;
use payments::shared::infrastructure::event_bus::in_memory::InMemoryEventBus;
use payments::shared::infrastructure::event_bus::pulsar::PulsarEventBus;
use payments::shell::config::AppConfig;
use payments::shell::graphql::{self, graphiql};
use payments::shell::http::router;
use payments::shell::state::AppState;
use payments::shell::workers::Workers;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env()?;

    let store = Arc::new(InMemoryPaymentStore::new());

    let processor: Arc<dyn PaymentProcessor> = match &config.stripe {
        Some(stripe) => Arc::new(StripePaymentProcessor::new(
            stripe.api_base.clone(),
            stripe.secret_key.clone(),
        )?),
        None => {
            warn!("STRIPE_SECRET_KEY not set, every charge will be approved in memory");
            Arc::new(InMemoryPaymentProcessor::approving())
        }
    };

    let (publisher, appointments): (Arc<dyn EventPublisher>, Option<mpsc::Receiver<Vec<u8>>>) =
        match &config.pulsar {
            Some(pulsar) => (
                Arc::new(PulsarEventBus::new(
                    pulsar.producer.clone(),
                    pulsar.url.clone(),
                    pulsar.tenant.clone(),
                    pulsar.namespace.clone(),
                )?),
                None,
            ),
            None => {
                warn!("PAYMENTS_PULSAR_URL not set, using the in-memory event bus");
                let bus = InMemoryEventBus::new();
                let subscription = bus.subscribe(APPOINTMENT_SLOT_RESERVED).await;
                (Arc::new(bus), Some(subscription))
            }
        };

    let state = AppState::new(store, processor, config.relay.max_retries);

    let workers = Workers::spawn(
        state.outbox.clone(),
        publisher,
        config.relay.clone(),
        state.payments.clone(),
        appointments,
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = router(state.clone())
        .route("/gql", get(graphiql).post(graphql::graphql))
        .layer(Extension(graphql::schema(state)))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!("GraphQL endpoint: http://{}/gql", config.http_addr);
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, stopping workers");
    workers.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
