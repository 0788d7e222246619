//! Monitoring session handle

use crate::config::SessionConfig;
use crate::consumer::{DrowsinessConsumer, EmotionConsumer};
use crate::shared::{Core, Shared};
use crate::SessionError;
use alerting::{AlertConfig, AlertManager, AudibleCue, Notice, TracingCue};
use classifier::{ClassifierClient, SessionSample};
use dms::{DmsConfig, DmsModule, DriverStatus};
use media_capture::{CameraError, CaptureState, FrameSampler, LiveSource, SamplerStats};
use metrics::counter;
use mitigation::{AudioPlayer, MitigationDispatcher};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

/// Shown while camera access is denied
const PERMISSION_MESSAGE: &str = "Please allow camera and microphone access to use this feature.";

/// Point-in-time view of the session, as shown on the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub running: bool,
    pub capture: CaptureState,
    pub driver: DriverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_joke: Option<String>,
    pub samples_recorded: usize,
    pub alerts_recorded: usize,
    pub drowsiness_sampler: SamplerStats,
    pub emotion_sampler: SamplerStats,
}

struct Samplers {
    drowsiness: FrameSampler,
    emotion: FrameSampler,
    running: bool,
}

/// One driver, one camera, one run at a time
pub struct MonitoringSession {
    config: SessionConfig,
    source: Arc<LiveSource>,
    shared: Arc<Shared>,
    samplers: Mutex<Samplers>,
}

/// Assembles a [`MonitoringSession`]
pub struct SessionBuilder {
    config: SessionConfig,
    client: ClassifierClient,
    player: Arc<dyn AudioPlayer>,
    dms: DmsConfig,
    alerts: AlertConfig,
    cue: Arc<dyn AudibleCue>,
}

impl SessionBuilder {
    pub fn dms(mut self, dms: DmsConfig) -> Self {
        self.dms = dms;
        self
    }

    pub fn alerts(mut self, alerts: AlertConfig) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn cue(mut self, cue: Arc<dyn AudibleCue>) -> Self {
        self.cue = cue;
        self
    }

    pub fn build(self) -> MonitoringSession {
        info!(
            drowsiness_period_ms = self.config.drowsiness_period_ms,
            emotion_period_ms = self.config.emotion_period_ms,
            threshold = self.dms.effective_threshold(),
            clear_policy = ?self.dms.clear_policy,
            "Creating monitoring session"
        );

        let source = Arc::new(LiveSource::with_max_age(self.config.max_frame_age()));
        let dispatcher = MitigationDispatcher::new(self.client.clone(), self.player);
        let core = Core::new(DmsModule::new(self.dms), AlertManager::new(self.alerts));
        let shared = Arc::new(Shared::new(
            core,
            self.client,
            dispatcher,
            self.cue,
            self.config.speak_alerts,
        ));

        let samplers = Samplers {
            drowsiness: FrameSampler::new("drowsiness", source.clone()),
            emotion: FrameSampler::new("emotion", source.clone()),
            running: false,
        };

        MonitoringSession {
            config: self.config,
            source,
            shared,
            samplers: Mutex::new(samplers),
        }
    }
}

impl MonitoringSession {
    pub fn builder(
        config: SessionConfig,
        client: ClassifierClient,
        player: Arc<dyn AudioPlayer>,
    ) -> SessionBuilder {
        SessionBuilder {
            config,
            client,
            player,
            dms: DmsConfig::default(),
            alerts: AlertConfig::default(),
            cue: Arc::new(TracingCue),
        }
    }

    fn samplers(&self) -> MutexGuard<'_, Samplers> {
        self.samplers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn client(&self) -> &ClassifierClient {
        &self.shared.client
    }

    /// Record the dashboard's permission outcome
    pub fn set_permission(&self, granted: bool) {
        self.source.set_permission(granted);
        let mut core = self.shared.core();
        if granted {
            core.alerts.permission_granted();
        } else {
            core.alerts.permission_denied(PERMISSION_MESSAGE);
        }
    }

    /// Store a still pushed by the dashboard
    pub fn push_frame(&self, data_uri: &str) -> Result<u64, SessionError> {
        Ok(self.source.push_data_uri(data_uri)?)
    }

    pub fn pause_capture(&self) {
        self.source.pause();
    }

    pub fn resume_capture(&self) {
        self.source.resume();
    }

    /// Open the capture handle and start both samplers
    pub fn start(&self) -> Result<(), SessionError> {
        let mut samplers = self.samplers();
        if samplers.running {
            return Err(SessionError::AlreadyRunning);
        }

        if let Err(e) = self.source.acquire() {
            if matches!(e, CameraError::PermissionDenied) {
                self.shared.core().alerts.permission_denied(PERMISSION_MESSAGE);
            }
            return Err(e.into());
        }

        {
            let mut core = self.shared.core();
            core.alerts.permission_granted();
            core.samples.clear();
            core.alert_timestamps.clear();
            core.last_joke = None;
        }

        samplers.drowsiness.start(
            self.config.drowsiness_period(),
            Arc::new(DrowsinessConsumer {
                shared: Arc::clone(&self.shared),
            }),
        );
        samplers.emotion.start(
            self.config.emotion_period(),
            Arc::new(EmotionConsumer {
                shared: Arc::clone(&self.shared),
            }),
        );
        samplers.running = true;

        counter!("drive_monitor_sessions_total").increment(1);
        info!("Monitoring session started");
        Ok(())
    }

    /// Stop sampling, reset driver state and release the capture handle.
    /// Returns `false` if the session was not running.
    pub fn stop(&self) -> bool {
        let mut samplers = self.samplers();
        if !samplers.running {
            return false;
        }

        samplers.drowsiness.stop();
        samplers.emotion.stop();

        {
            let mut core = self.shared.core();
            core.end_run();
            core.dms.stop();
            core.alerts.clear_drowsiness();
        }

        if !self.source.release() {
            warn!("Capture handle was not held at stop");
        }
        samplers.running = false;
        info!("Monitoring session stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.samplers().running
    }

    /// Driver acknowledged the drowsiness alert
    pub fn acknowledge(&self) -> bool {
        let mut core = self.shared.core();
        match core.dms.acknowledge() {
            Some(_) => {
                core.alerts.clear_drowsiness();
                true
            }
            None => false,
        }
    }

    /// Manual cheer-up. Returns `false` when one is already running.
    pub fn trigger_mitigation(&self) -> bool {
        self.shared.request_mitigation()
    }

    pub fn notices(&self) -> Vec<Notice> {
        let mut core = self.shared.core();
        core.alerts.purge_expired();
        core.alerts.notices()
    }

    pub fn dismiss_notice(&self, id: Uuid) -> bool {
        self.shared.core().alerts.dismiss(id)
    }

    /// Emotion samples and alert timestamps of the current or last run
    pub fn recorded(&self) -> (Vec<SessionSample>, Vec<String>) {
        let core = self.shared.core();
        (core.samples.clone(), core.alert_timestamps.clone())
    }

    /// Summary of the current or last run
    pub async fn summarize_recorded(&self) -> Result<String, SessionError> {
        let (samples, alerts) = self.recorded();
        Ok(self.client().summarize_session(&samples, &alerts).await?)
    }

    pub fn status(&self) -> SessionStatus {
        let samplers = self.samplers();
        let core = self.shared.core();
        SessionStatus {
            running: samplers.running,
            capture: self.source.state(),
            driver: core.dms.status(),
            last_joke: core.last_joke.clone(),
            samples_recorded: core.samples.len(),
            alerts_recorded: core.alert_timestamps.len(),
            drowsiness_sampler: samplers.drowsiness.stats(),
            emotion_sampler: samplers.emotion.stats(),
        }
    }
}

impl Drop for MonitoringSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alerting::{NoticeKind, ToneSpec};
    use async_trait::async_trait;
    use classifier::mock::speech_data_uri;
    use classifier::{AudioClip, ClassifierError, Flow, MockBackend, NO_ALERTS_LINE};
    use dms::{DrowsinessPhase, Emotion, MitigationState};
    use mitigation::MitigationError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    const STILL: &str = "data:image/jpeg;base64,/9j/4AAQ";

    #[derive(Default)]
    struct CountingCue {
        sounded: AtomicUsize,
    }

    impl AudibleCue for CountingCue {
        fn sound(&self, _tone: ToneSpec) {
            self.sounded.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct SlowPlayer {
        plays: AtomicUsize,
        playing: AtomicUsize,
        max_playing: AtomicUsize,
    }

    struct Playing<'a>(&'a AtomicUsize);

    impl Drop for Playing<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl AudioPlayer for SlowPlayer {
        async fn play(&self, _clip: &AudioClip) -> Result<(), MitigationError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            let now = self.playing.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_playing.fetch_max(now, Ordering::SeqCst);
            let _playing = Playing(&self.playing);
            sleep(Duration::from_secs(2)).await;
            Ok(())
        }
    }

    struct Harness {
        backend: Arc<MockBackend>,
        cue: Arc<CountingCue>,
        player: Arc<SlowPlayer>,
        session: MonitoringSession,
    }

    fn harness(dms: DmsConfig) -> Harness {
        let config = SessionConfig {
            speak_alerts: false,
            ..Default::default()
        };
        harness_with(config, dms)
    }

    fn harness_with(config: SessionConfig, dms: DmsConfig) -> Harness {
        let backend = Arc::new(MockBackend::new());
        let cue = Arc::new(CountingCue::default());
        let player = Arc::new(SlowPlayer::default());
        let session = MonitoringSession::builder(config, ClassifierClient::new(backend.clone()), player.clone())
            .dms(dms)
            .cue(cue.clone())
            .build();
        Harness {
            backend,
            cue,
            player,
            session,
        }
    }

    fn script_joke(backend: &MockBackend) {
        backend.respond_always(Flow::Joke, json!({ "joke": "I told my car a joke. It was exhausted." }));
        backend.respond_always(
            Flow::Speech,
            json!({ "audioDataUri": speech_data_uri(Duration::from_secs(2)) }),
        );
    }

    fn start(h: &Harness) {
        h.session.set_permission(true);
        h.session.push_frame(STILL).unwrap();
        h.session.start().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_drowsy_frames_raise_one_alert() {
        let h = harness(DmsConfig::default());
        h.backend.respond_always(Flow::Drowsiness, json!({ "isDrowsy": true, "alertMessage": "Wake up!" }));
        start(&h);

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(h.session.status().driver.phase, DrowsinessPhase::Suspect);
        assert_eq!(h.cue.sounded.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(2000)).await;
        let status = h.session.status();
        assert_eq!(status.driver.phase, DrowsinessPhase::Alerting);
        assert_eq!(status.driver.alert_message.as_deref(), Some("Wake up!"));
        assert_eq!(status.alerts_recorded, 1);
        assert_eq!(h.cue.sounded.load(Ordering::SeqCst), 1);

        let notices = h.session.notices();
        assert!(notices.iter().any(|n| n.kind == NoticeKind::DrowsinessAlert));
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_speech_only_on_raise() {
        let h = harness_with(SessionConfig::default(), DmsConfig::default());
        h.backend.respond_always(Flow::Drowsiness, json!({ "isDrowsy": true, "alertMessage": "Wake up!" }));
        h.backend.respond_always(
            Flow::Speech,
            json!({ "audioDataUri": speech_data_uri(Duration::from_millis(500)) }),
        );
        start(&h);

        // Suspect, raise, then already alerting
        sleep(Duration::from_millis(4500)).await;
        assert_eq!(h.backend.calls(Flow::Drowsiness), 4);
        assert_eq!(h.backend.calls(Flow::Speech), 1);
        assert_eq!(h.backend.requests(Flow::Speech)[0]["text"], "Wake up!");

        let notices = h.session.notices();
        let alert = notices
            .iter()
            .find(|n| n.kind == NoticeKind::DrowsinessAlert)
            .unwrap();
        assert!(alert.audio_data_uri.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acknowledge_ignores_in_flight_verdict() {
        let h = harness(DmsConfig::strict());
        h.backend.respond_always(Flow::Drowsiness, json!({ "isDrowsy": true }));
        h.backend.set_delay(Flow::Drowsiness, Duration::from_millis(500));
        start(&h);

        // tick at 1.0s answers at 1.5s
        sleep(Duration::from_millis(1600)).await;
        assert_eq!(h.session.status().driver.phase, DrowsinessPhase::Alerting);

        // tick at 2.0s is in flight while the driver acknowledges
        sleep(Duration::from_millis(600)).await;
        assert!(h.session.acknowledge());
        assert!(!h.session.acknowledge());

        sleep(Duration::from_millis(400)).await;
        let status = h.session.status();
        assert_eq!(status.driver.phase, DrowsinessPhase::Watching);
        assert_eq!(status.driver.consecutive_drowsy_count, 0);
        assert_eq!(h.cue.sounded.load(Ordering::SeqCst), 1);
        assert!(!h
            .session
            .notices()
            .iter()
            .any(|n| n.kind == NoticeKind::DrowsinessAlert));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_stop_mutates_nothing() {
        let h = harness(DmsConfig::strict());
        h.backend.respond_always(Flow::Drowsiness, json!({ "isDrowsy": true }));
        h.backend.set_delay(Flow::Drowsiness, Duration::from_secs(2));
        start(&h);

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(h.backend.calls(Flow::Drowsiness), 1);
        assert!(h.session.stop());

        sleep(Duration::from_secs(5)).await;
        let status = h.session.status();
        assert!(!status.running);
        assert_eq!(status.capture, CaptureState::Released);
        assert_eq!(status.driver.phase, DrowsinessPhase::Watching);
        assert_eq!(status.alerts_recorded, 0);
        assert_eq!(h.cue.sounded.load(Ordering::SeqCst), 0);
        assert_eq!(h.backend.calls(Flow::Drowsiness), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let h = harness(DmsConfig::default());
        assert!(!h.session.stop());

        start(&h);
        assert!(matches!(h.session.start(), Err(SessionError::AlreadyRunning)));
        assert!(h.session.stop());
        assert!(!h.session.stop());

        // Pushes are refused until the next start reopens the handle
        assert!(h.session.push_frame(STILL).is_err());
        h.session.start().unwrap();
        assert!(h.session.push_frame(STILL).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_without_permission() {
        let h = harness(DmsConfig::default());
        let err = h.session.start().unwrap_err();
        assert!(matches!(err, SessionError::Camera(CameraError::PermissionDenied)));

        let notices = h.session.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::PermissionWarning);
        assert!(notices[0].retry);

        h.session.set_permission(true);
        assert!(h.session.notices().is_empty());
        assert!(h.session.start().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_mitigation_triggers_play_once() {
        let h = harness(DmsConfig::default());
        script_joke(&h.backend);

        assert!(h.session.trigger_mitigation());
        assert!(!h.session.trigger_mitigation());
        assert_eq!(h.session.status().driver.mitigation, MitigationState::InFlight);

        sleep(Duration::from_secs(3)).await;
        assert_eq!(h.player.plays.load(Ordering::SeqCst), 1);
        assert_eq!(h.backend.calls(Flow::Joke), 1);

        let status = h.session.status();
        assert_eq!(status.driver.mitigation, MitigationState::Idle);
        assert_eq!(
            status.last_joke.as_deref(),
            Some("I told my car a joke. It was exhausted.")
        );
        assert!(h.session.trigger_mitigation());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mitigation_after_stop_completes() {
        let h = harness(DmsConfig::default());
        script_joke(&h.backend);
        h.backend.set_delay(Flow::Joke, Duration::from_millis(50));
        start(&h);
        assert!(h.session.stop());

        assert!(h.session.trigger_mitigation());
        sleep(Duration::from_secs(10)).await;

        let status = h.session.status();
        assert_eq!(status.driver.mitigation, MitigationState::Idle);
        assert_eq!(h.backend.calls(Flow::Joke), 1);
        assert_eq!(h.player.plays.load(Ordering::SeqCst), 1);
        assert!(h.session.trigger_mitigation());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_mitigation_from_before_start() {
        let h = harness(DmsConfig::default());
        script_joke(&h.backend);

        assert!(h.session.trigger_mitigation());
        sleep(Duration::from_millis(100)).await;
        assert_eq!(h.player.playing.load(Ordering::SeqCst), 1);

        start(&h);
        assert!(h.session.stop());
        h.session.start().unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(h.player.playing.load(Ordering::SeqCst), 0);

        assert!(h.session.trigger_mitigation());
        sleep(Duration::from_secs(3)).await;

        assert_eq!(h.player.plays.load(Ordering::SeqCst), 2);
        assert_eq!(h.player.max_playing.load(Ordering::SeqCst), 1);
        assert_eq!(h.session.status().driver.mitigation, MitigationState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_emotion_after_stop_mutates_nothing() {
        let h = harness(DmsConfig::default());
        h.backend.respond_always(Flow::Drowsiness, json!({ "isDrowsy": false }));
        h.backend.respond_always(Flow::Emotion, json!({ "summary": "The driver looks sad today" }));
        h.backend.set_delay(Flow::Emotion, Duration::from_secs(2));
        script_joke(&h.backend);
        start(&h);
        sleep(Duration::from_secs(4)).await;
        h.session.push_frame(STILL).unwrap();

        // emotion tick at 5.0s answers at 7.0s
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(h.backend.calls(Flow::Emotion), 1);
        assert!(h.session.stop());

        sleep(Duration::from_secs(5)).await;
        let status = h.session.status();
        assert_eq!(status.driver.emotion, Emotion::Neutral);
        assert_eq!(status.driver.mitigation, MitigationState::Idle);
        assert_eq!(status.samples_recorded, 0);
        assert_eq!(h.backend.calls(Flow::Joke), 0);
        assert_eq!(h.player.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_mitigation_releases_guard() {
        let h = harness(DmsConfig::default());
        h.backend.fail(Flow::Joke, ClassifierError::Classification("HTTP 500".into()));

        assert!(h.session.trigger_mitigation());
        sleep(Duration::from_millis(10)).await;

        let status = h.session.status();
        assert_eq!(status.driver.mitigation, MitigationState::Idle);
        assert!(status.last_joke.is_none());
        assert_eq!(h.player.plays.load(Ordering::SeqCst), 0);
        // Silent abort: no notice
        assert!(h.session.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sad_mood_records_sample_and_mitigates() {
        let h = harness(DmsConfig::default());
        h.backend.respond_always(Flow::Drowsiness, json!({ "isDrowsy": false }));
        h.backend.respond_always(Flow::Emotion, json!({ "summary": "The driver looks sad today" }));
        script_joke(&h.backend);
        start(&h);
        // Keep the still fresh past the first emotion tick
        sleep(Duration::from_secs(4)).await;
        h.session.push_frame(STILL).unwrap();

        sleep(Duration::from_millis(1500)).await;
        let status = h.session.status();
        assert_eq!(status.driver.emotion, Emotion::Sad);
        assert_eq!(status.driver.mitigation, MitigationState::InFlight);

        let (samples, alerts) = h.session.recorded();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].emotion, "Sad");
        assert_eq!(samples[0].confidence, 1.0);
        assert!(alerts.is_empty());

        sleep(Duration::from_secs(3)).await;
        assert_eq!(h.player.plays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_classifier_failure_skips_tick() {
        let h = harness(DmsConfig::default());
        h.backend.fail(Flow::Drowsiness, ClassifierError::Timeout(15_000));
        h.backend.fail(Flow::Drowsiness, ClassifierError::Timeout(15_000));
        h.backend.respond_always(Flow::Drowsiness, json!({ "isDrowsy": true }));
        start(&h);

        sleep(Duration::from_millis(3500)).await;
        let status = h.session.status();
        assert!(status.running);
        assert_eq!(status.drowsiness_sampler.frames, 3);
        // Failures are skipped ticks, not verdicts
        assert_eq!(status.driver.phase, DrowsinessPhase::Suspect);

        // Identical failures collapse into one toast
        let toasts: Vec<_> = h
            .session
            .notices()
            .into_iter()
            .filter(|n| n.kind == NoticeKind::Toast)
            .collect();
        assert_eq!(toasts.len(), 1);
        assert_eq!(toasts[0].title, "Drowsiness Check Failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_summarize_empty_session() {
        let h = harness(DmsConfig::default());
        h.backend.respond(Flow::Summary, json!({ "summary": "An uneventful drive." }));

        let summary = h.session.summarize_recorded().await.unwrap();
        assert_eq!(summary, "An uneventful drive.");

        let request = &h.backend.requests(Flow::Summary)[0];
        assert_eq!(request["drowsinessAlerts"], json!([]));
        assert!(request["prompt"].as_str().unwrap().contains(NO_ALERTS_LINE));
    }
}
