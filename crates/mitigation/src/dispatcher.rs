//! Mitigation dispatcher

use crate::player::AudioPlayer;
use crate::MitigationError;
use classifier::ClassifierClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// A completed cheer-up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MitigationOutcome {
    pub joke: String,
    pub played: Option<Duration>,
}

/// Runs joke → speech → playback. Callers hold the in-flight guard; the
/// dispatcher itself does not serialize invocations.
#[derive(Clone)]
pub struct MitigationDispatcher {
    client: ClassifierClient,
    player: Arc<dyn AudioPlayer>,
}

impl MitigationDispatcher {
    pub fn new(client: ClassifierClient, player: Arc<dyn AudioPlayer>) -> Self {
        Self { client, player }
    }

    pub async fn run(&self) -> Result<MitigationOutcome, MitigationError> {
        let joke = self
            .client
            .generate_joke()
            .await
            .map_err(MitigationError::Joke)?;
        debug!("Generated joke: {}", joke);

        let clip = self
            .client
            .synthesize_speech(&joke)
            .await
            .map_err(MitigationError::Speech)?;

        self.player.play(&clip).await?;
        info!("Mitigation played");

        Ok(MitigationOutcome {
            joke,
            played: clip.duration(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use classifier::mock::speech_data_uri;
    use classifier::{AudioClip, ClassifierError, Flow, MockBackend};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPlayer {
        plays: AtomicUsize,
    }

    #[async_trait]
    impl AudioPlayer for CountingPlayer {
        async fn play(&self, _clip: &AudioClip) -> Result<(), MitigationError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn setup() -> (Arc<MockBackend>, Arc<CountingPlayer>, MitigationDispatcher) {
        let backend = Arc::new(MockBackend::new());
        let player = Arc::new(CountingPlayer::default());
        let dispatcher = MitigationDispatcher::new(ClassifierClient::new(backend.clone()), player.clone());
        (backend, player, dispatcher)
    }

    #[tokio::test]
    async fn test_joke_is_spoken_and_played() {
        let (backend, player, dispatcher) = setup();
        backend.respond(Flow::Joke, json!({ "joke": "Why did the car nap? It was two tired." }));
        backend.respond(
            Flow::Speech,
            json!({ "audioDataUri": speech_data_uri(Duration::from_secs(2)) }),
        );

        let outcome = dispatcher.run().await.unwrap();
        assert_eq!(outcome.joke, "Why did the car nap? It was two tired.");
        assert_eq!(outcome.played, Some(Duration::from_secs(2)));
        assert_eq!(player.plays.load(Ordering::SeqCst), 1);

        let spoken = backend.requests(Flow::Speech);
        assert_eq!(spoken[0]["text"], "Why did the car nap? It was two tired.");
    }

    #[tokio::test]
    async fn test_joke_failure_aborts() {
        let (backend, player, dispatcher) = setup();
        backend.fail(Flow::Joke, ClassifierError::Classification("HTTP 503".into()));

        let err = dispatcher.run().await.unwrap_err();
        assert!(matches!(err, MitigationError::Joke(_)));
        assert_eq!(backend.calls(Flow::Speech), 0);
        assert_eq!(player.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_speech_failure_aborts() {
        let (backend, player, dispatcher) = setup();
        backend.respond(Flow::Joke, json!({ "joke": "Knock knock" }));
        backend.respond(Flow::Speech, json!({ "audioDataUri": "" }));

        let err = dispatcher.run().await.unwrap_err();
        assert!(matches!(err, MitigationError::Speech(ClassifierError::Synthesis(_))));
        assert_eq!(player.plays.load(Ordering::SeqCst), 0);
    }
}
