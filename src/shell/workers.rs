use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::modules::payments::use_cases::create_payment::inbound::broker::{
    ConsumerRetry, run_consumer,
};
use crate::shared::infrastructure::event_bus::EventPublisher;
use crate::shared::infrastructure::intent_outbox::OutboxStore;
use crate::shared::infrastructure::intent_outbox::relay::{OutboxRelay, RelayConfig};
use crate::shell::state::Payments;

/// Background tasks that live as long as the HTTP server.
pub struct Workers {
    shutdown: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Workers {
    /// Starts the outbox relay and, when a subscription is given, the
    /// appointment consumer feeding CreatePayment.
    pub fn spawn(
        outbox: Arc<dyn OutboxStore>,
        publisher: Arc<dyn EventPublisher>,
        relay_config: RelayConfig,
        payments: Arc<Payments>,
        appointments: Option<mpsc::Receiver<Vec<u8>>>,
    ) -> Self {
        let (shutdown, signal) = watch::channel(false);
        let mut handles = Vec::new();

        let relay = OutboxRelay::new(outbox, publisher, relay_config);
        handles.push(("outbox relay", tokio::spawn(relay.run(signal.clone()))));

        if let Some(messages) = appointments {
            handles.push((
                "appointment consumer",
                tokio::spawn(run_consumer(
                    payments,
                    messages,
                    ConsumerRetry::default(),
                    signal,
                )),
            ));
        }

        Self { shutdown, handles }
    }

    /// Signals every worker and waits for them to finish.
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            info!("workers already stopped");
        }
        for (name, handle) in self.handles {
            match handle.await {
                Ok(()) => info!(worker = name, "worker stopped"),
                Err(e) => error!(worker = name, error = %e, "worker panicked"),
            }
        }
    }
}
