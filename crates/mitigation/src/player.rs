//! Audio playback seam

use crate::MitigationError;
use async_trait::async_trait;
use classifier::AudioClip;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Plays a clip to completion
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play(&self, clip: &AudioClip) -> Result<(), MitigationError>;
}

/// Player that holds the clip as "now playing" for its duration.
///
/// The dashboard polls [`PacedPlayer::now_playing`] and renders the audio;
/// the service only keeps time.
pub struct PacedPlayer {
    /// Used when the clip length cannot be read from its header
    fallback: Duration,
    now_playing: Mutex<Option<String>>,
}

impl PacedPlayer {
    pub const DEFAULT_FALLBACK: Duration = Duration::from_secs(3);

    pub fn new() -> Self {
        Self::with_fallback(Self::DEFAULT_FALLBACK)
    }

    pub fn with_fallback(fallback: Duration) -> Self {
        Self {
            fallback,
            now_playing: Mutex::new(None),
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.now_playing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Data URI of the clip being played, if any
    pub fn now_playing(&self) -> Option<String> {
        self.slot().clone()
    }
}

impl Default for PacedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the slot even if playback is cancelled mid-way
struct PlayingGuard<'a>(&'a PacedPlayer);

impl Drop for PlayingGuard<'_> {
    fn drop(&mut self) {
        *self.0.slot() = None;
    }
}

#[async_trait]
impl AudioPlayer for PacedPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), MitigationError> {
        let duration = clip.duration().unwrap_or_else(|| {
            debug!(mime = clip.mime_type(), "Clip length unknown, using fallback");
            self.fallback
        });

        *self.slot() = Some(clip.to_data_uri());
        let _guard = PlayingGuard(self);
        info!(duration_ms = duration.as_millis() as u64, "Playing mitigation audio");
        tokio::time::sleep(duration).await;
        debug!("Playback finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classifier::mock::speech_data_uri;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_play_takes_clip_duration() {
        let player = PacedPlayer::new();
        let clip = AudioClip::from_data_uri(&speech_data_uri(Duration::from_millis(1500))).unwrap();

        let start = tokio::time::Instant::now();
        player.play(&clip).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert!(player.now_playing().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_playing_while_playing() {
        let player = Arc::new(PacedPlayer::new());
        let clip = AudioClip::from_data_uri(&speech_data_uri(Duration::from_secs(2))).unwrap();
        let expected = clip.to_data_uri();

        let task = tokio::spawn({
            let player = player.clone();
            async move { player.play(&clip).await }
        });
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(player.now_playing(), Some(expected));

        task.await.unwrap().unwrap();
        assert!(player.now_playing().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_length_uses_fallback() {
        let player = PacedPlayer::with_fallback(Duration::from_secs(1));
        let clip = AudioClip::from_data_uri("data:audio/mpeg;base64,AAEC").unwrap();

        let start = tokio::time::Instant::now();
        player.play(&clip).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(1) && elapsed < Duration::from_millis(1500));
    }
}
