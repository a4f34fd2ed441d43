//! Transport boundary between the mutation engine and the authoritative store.
//!
//! Latency and timeouts live here, not in the engine.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use treasure_core::{GraphError, GraphResult};
use treasure_game::GameStore;

use crate::config::EngineConfig;
use crate::mutation::{MutationRequest, MutationResponse};

/// Carries a mutation to the server side and brings the result back.
///
/// A failed delivery must leave the store untouched.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn deliver(&self, request: &MutationRequest) -> GraphResult<MutationResponse>;
}

/// Runs mutations against a store in the same process, after an optional delay.
#[derive(Debug)]
pub struct InProcessTransport<S> {
    store: S,
    delay: Duration,
    timeout: Option<Duration>,
}

impl<S> InProcessTransport<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            delay: Duration::ZERO,
            timeout: None,
        }
    }

    pub fn from_config(store: S, config: &EngineConfig) -> Self {
        Self {
            store,
            delay: config.dispatch_delay,
            timeout: config.dispatch_timeout,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl<S> Transport for InProcessTransport<S>
where
    S: GameStore + 'static,
{
    async fn deliver(&self, request: &MutationRequest) -> GraphResult<MutationResponse> {
        // The store is only touched after the delay, so a timeout never
        // leaves a half-applied mutation behind.
        let work = async {
            if !self.delay.is_zero() {
                debug!(
                    kind = %request.kind(),
                    delay_ms = self.delay.as_millis() as u64,
                    "delaying dispatch"
                );
                tokio::time::sleep(self.delay).await;
            }
            request.perform(&self.store)
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, work)
                .await
                .map_err(|_| GraphError::Timeout(limit))?,
            None => work.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use treasure_core::HidingSpotId;
    use treasure_game::{GameSetup, InMemoryGameStore};

    fn store() -> Arc<InMemoryGameStore> {
        Arc::new(
            InMemoryGameStore::new(&GameSetup::default().with_turns(9).with_treasure_at(0))
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn delivers_immediately_without_delay() {
        let store = store();
        let transport = InProcessTransport::new(store.clone());

        transport
            .deliver(&MutationRequest::check_spot(HidingSpotId::new(3)))
            .await
            .unwrap();
        assert_eq!(store.game().turns_remaining(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_out_the_configured_delay() {
        let store = store();
        let transport =
            InProcessTransport::new(store.clone()).with_delay(Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        transport
            .deliver(&MutationRequest::check_spot(HidingSpotId::new(3)))
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires_before_the_store_is_touched() {
        let store = store();
        let transport = InProcessTransport::new(store.clone())
            .with_delay(Duration::from_secs(2))
            .with_timeout(Duration::from_millis(500));

        let err = transport
            .deliver(&MutationRequest::check_spot(HidingSpotId::new(3)))
            .await
            .unwrap_err();
        assert_eq!(err, GraphError::Timeout(Duration::from_millis(500)));
        assert_eq!(store.game().turns_remaining(), 9);
        assert!(!store.hiding_spot(HidingSpotId::new(3)).unwrap().has_been_checked());
    }

    #[tokio::test]
    async fn missing_spot_surfaces_not_found() {
        let transport = InProcessTransport::new(store());
        let err = transport
            .deliver(&MutationRequest::check_spot(HidingSpotId::new(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::NotFound(_)));
    }
}
