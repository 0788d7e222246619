//! Notice Manager Implementation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// How long a toast stays visible (seconds)
    pub toast_ttl_secs: u64,
    /// Identical toasts within this window are suppressed (seconds)
    pub toast_cooldown_secs: u64,
    /// Maximum notices kept; oldest toasts are evicted first
    pub max_notices: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            toast_ttl_secs: 5,
            toast_cooldown_secs: 10,
            max_notices: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// Camera/microphone access denied. Persistent, offers a retry.
    PermissionWarning,
    /// Transient notification
    Toast,
    /// Active drowsiness alert. Cleared by acknowledgement, not dismissal.
    DrowsinessAlert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A user-visible notice
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: Uuid,
    pub kind: NoticeKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub retry: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data_uri: Option<String>,
    #[serde(skip)]
    expires_at: Option<Instant>,
}

impl Notice {
    fn new(kind: NoticeKind, severity: Severity, title: &str, message: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            severity,
            title: title.to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
            retry: false,
            audio_data_uri: None,
            expires_at: None,
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Notice manager for deduplication and expiry
pub struct AlertManager {
    /// Configuration
    config: AlertConfig,
    /// Notices in creation order
    notices: Vec<Notice>,
    /// Last time each toast (title + message) was shown
    last_toast: HashMap<String, Instant>,
}

impl AlertManager {
    /// Create a new alert manager
    pub fn new(config: AlertConfig) -> Self {
        info!("Creating alert manager with config: {:?}", config);
        Self {
            config,
            notices: Vec::new(),
            last_toast: HashMap::new(),
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Show the persistent permission warning, replacing any previous one
    pub fn permission_denied(&mut self, message: &str) -> Uuid {
        self.remove_kind(NoticeKind::PermissionWarning);
        let mut notice = Notice::new(
            NoticeKind::PermissionWarning,
            Severity::Critical,
            "Permission Denied",
            message,
        );
        notice.retry = true;
        warn!("Capture permission denied: {}", message);
        self.push(notice)
    }

    /// Access granted on retry
    pub fn permission_granted(&mut self) -> bool {
        self.remove_kind(NoticeKind::PermissionWarning) > 0
    }

    /// Show a transient toast. Returns `None` if an identical toast is in cooldown.
    pub fn toast(&mut self, severity: Severity, title: &str, message: &str) -> Option<Uuid> {
        let now = Instant::now();
        let key = format!("{}\u{1f}{}", title, message);

        if let Some(last) = self.last_toast.get(&key) {
            let cooldown = Duration::from_secs(self.config.toast_cooldown_secs);
            if now.duration_since(*last) < cooldown {
                debug!("Toast suppressed: in cooldown period");
                return None;
            }
        }
        self.last_toast.insert(key, now);

        let mut notice = Notice::new(NoticeKind::Toast, severity, title, message);
        notice.expires_at = Some(now + Duration::from_secs(self.config.toast_ttl_secs));
        Some(self.push(notice))
    }

    /// Show the drowsiness alert, replacing any previous one
    pub fn raise_drowsiness(&mut self, message: &str, audio_data_uri: Option<String>) -> Uuid {
        self.remove_kind(NoticeKind::DrowsinessAlert);
        let mut notice = Notice::new(
            NoticeKind::DrowsinessAlert,
            Severity::Critical,
            "Drowsiness Alert!",
            message,
        );
        notice.audio_data_uri = audio_data_uri;
        info!("Drowsiness notice raised: {}", message);
        self.push(notice)
    }

    pub fn clear_drowsiness(&mut self) -> bool {
        self.remove_kind(NoticeKind::DrowsinessAlert) > 0
    }

    /// Dismiss a notice by id. The drowsiness alert cannot be dismissed.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices
            .retain(|n| n.id != id || n.kind == NoticeKind::DrowsinessAlert);
        let dismissed = self.notices.len() < before;
        if dismissed {
            debug!(%id, "Notice dismissed");
        }
        dismissed
    }

    /// Currently visible notices, oldest first
    pub fn notices(&self) -> Vec<Notice> {
        let now = Instant::now();
        self.notices
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect()
    }

    /// Drop expired toasts and stale cooldown entries
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.notices.len();
        self.notices.retain(|n| !n.is_expired(now));

        let cooldown = Duration::from_secs(self.config.toast_cooldown_secs);
        self.last_toast
            .retain(|_, last| now.duration_since(*last) < cooldown);

        before - self.notices.len()
    }

    fn push(&mut self, notice: Notice) -> Uuid {
        let id = notice.id;
        self.notices.push(notice);
        self.enforce_capacity();
        id
    }

    fn remove_kind(&mut self, kind: NoticeKind) -> usize {
        let before = self.notices.len();
        self.notices.retain(|n| n.kind != kind);
        before - self.notices.len()
    }

    fn enforce_capacity(&mut self) {
        self.purge_expired();
        while self.notices.len() > self.config.max_notices {
            match self.notices.iter().position(|n| n.kind == NoticeKind::Toast) {
                Some(oldest) => {
                    self.notices.remove(oldest);
                }
                None => break,
            }
        }
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_drowsiness(manager: &AlertManager) -> bool {
        manager
            .notices()
            .iter()
            .any(|n| n.kind == NoticeKind::DrowsinessAlert)
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_expires() {
        let mut manager = AlertManager::default();
        manager.toast(Severity::Warning, "Analysis Failed", "Backend unavailable");
        assert_eq!(manager.notices().len(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(manager.notices().is_empty());
        assert_eq!(manager.purge_expired(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deduplication() {
        let mut manager = AlertManager::default();

        assert!(manager.toast(Severity::Warning, "Analysis Failed", "timeout").is_some());
        // Immediate duplicate should not show
        assert!(manager.toast(Severity::Warning, "Analysis Failed", "timeout").is_none());
        // Different message is a different toast
        assert!(manager.toast(Severity::Warning, "Analysis Failed", "HTTP 500").is_some());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(manager.toast(Severity::Warning, "Analysis Failed", "timeout").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permission_warning_is_persistent() {
        let mut manager = AlertManager::default();
        let first = manager.permission_denied("Please allow camera access");
        let second = manager.permission_denied("Please allow camera access");
        assert_ne!(first, second);

        tokio::time::advance(Duration::from_secs(3600)).await;
        let notices = manager.notices();
        assert_eq!(notices.len(), 1);
        assert!(notices[0].retry);

        assert!(manager.permission_granted());
        assert!(manager.notices().is_empty());
    }

    #[tokio::test]
    async fn test_drowsiness_alert_not_dismissable() {
        let mut manager = AlertManager::default();
        let id = manager.raise_drowsiness("Take a break", None);

        assert!(!manager.dismiss(id));
        assert!(has_drowsiness(&manager));
        assert!(manager.clear_drowsiness());
        assert!(!has_drowsiness(&manager));
    }

    #[tokio::test]
    async fn test_dismiss() {
        let mut manager = AlertManager::default();
        let id = manager.permission_denied("denied");
        assert!(manager.dismiss(id));
        assert!(!manager.dismiss(id));
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest_toast() {
        let config = AlertConfig {
            max_notices: 2,
            ..Default::default()
        };
        let mut manager = AlertManager::new(config);
        manager.raise_drowsiness("Take a break", None);
        let oldest = manager.toast(Severity::Info, "a", "1");
        manager.toast(Severity::Info, "b", "2");

        let notices = manager.notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| Some(n.id) != oldest));
        assert!(has_drowsiness(&manager));
    }
}
