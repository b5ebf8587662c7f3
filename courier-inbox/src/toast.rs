//! Toast presentation: in-page banners and desktop notifications.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use courier_core::config::ToastConfig;
use courier_core::notification::Notification;
use courier_core::traits::DesktopNotifier;

/// Lifecycle phase of a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerPhase {
    /// The banner is on screen.
    Visible,
    /// The exit transition is playing; removal is imminent.
    Leaving,
}

/// One transient in-page banner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Banner {
    /// Overlay-local identifier, used for manual dismissal.
    pub id: u64,
    /// Headline text.
    pub title: String,
    /// Long text, message falling back to body.
    pub body: String,
    /// Current lifecycle phase.
    pub phase: BannerPhase,
}

struct ToastInner {
    config: ToastConfig,
    notifier: Option<Arc<dyn DesktopNotifier>>,
    banners: RwLock<Vec<Banner>>,
    timers: DashMap<u64, JoinHandle<()>>,
    seq: AtomicU64,
    permission_requested: AtomicBool,
}

/// Presents toasts for inbound notifications.
///
/// Each presentation is an optional desktop notification (when the
/// capability is present and permission granted) plus an in-page banner
/// that auto-dismisses after the configured duration. Manual dismissal
/// cancels the pending auto-dismiss timer so a banner is removed exactly
/// once.
///
/// The manager is a cheap clonable handle; the pipeline presents through
/// it and the rendering layer reads `banners()`.
#[derive(Clone)]
pub struct ToastManager {
    inner: Arc<ToastInner>,
}

impl ToastManager {
    /// Creates a new toast manager.
    ///
    /// `notifier` is `None` when the host environment has no desktop
    /// notification capability; presentation then degrades to banners
    /// only.
    #[must_use]
    pub fn new(config: ToastConfig, notifier: Option<Arc<dyn DesktopNotifier>>) -> Self {
        Self {
            inner: Arc::new(ToastInner {
                config,
                notifier,
                banners: RwLock::new(Vec::new()),
                timers: DashMap::new(),
                seq: AtomicU64::new(0),
                permission_requested: AtomicBool::new(false),
            }),
        }
    }

    /// Requests desktop permission once, if the user has not decided yet.
    ///
    /// Re-invocations are no-ops: a granted or denied answer is never
    /// re-requested, and the undecided state is only prompted a single
    /// time per manager.
    pub async fn bootstrap_permission(&self) {
        let Some(notifier) = &self.inner.notifier else {
            return;
        };
        if !notifier.permission().is_undecided() {
            return;
        }
        if self.inner.permission_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        let decision = notifier.request_permission().await;
        debug!(%decision, "Desktop notification permission requested");
    }

    /// Presents one notification: desktop (permission permitting) plus an
    /// in-page banner with auto-dismissal.
    pub async fn present(&self, notification: &Notification) {
        let title = notification.title.clone();
        let body = notification.body_text().to_string();

        if let Some(notifier) = &self.inner.notifier {
            if notifier.permission().is_granted() {
                let icon = self.inner.config.desktop_icon.as_deref();
                if let Err(e) = notifier.show(&title, &body, icon).await {
                    warn!(error = %e, "Desktop notification failed");
                }
            }
        }

        self.push_banner(title, body);
    }

    /// Manually dismisses a banner, cancelling its auto-dismiss timer.
    ///
    /// Returns false when the banner is already gone.
    pub fn dismiss(&self, id: u64) -> bool {
        if let Some((_, timer)) = self.inner.timers.remove(&id) {
            timer.abort();
        }
        let mut banners = self.inner.banners.write();
        let before = banners.len();
        banners.retain(|b| b.id != id);
        before != banners.len()
    }

    /// Returns a snapshot of the banners currently on screen.
    #[must_use]
    pub fn banners(&self) -> Vec<Banner> {
        self.inner.banners.read().clone()
    }

    fn push_banner(&self, title: String, body: String) -> u64 {
        let id = self.inner.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.banners.write().push(Banner {
            id,
            title,
            body,
            phase: BannerPhase::Visible,
        });

        let manager = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(manager.inner.config.banner_duration()).await;

            // Exit transition: flip the phase, give the renderer time to
            // play it, then remove.
            {
                let mut banners = manager.inner.banners.write();
                if let Some(banner) = banners.iter_mut().find(|b| b.id == id) {
                    banner.phase = BannerPhase::Leaving;
                } else {
                    return;
                }
            }
            tokio::time::sleep(manager.inner.config.exit_transition()).await;

            manager.inner.banners.write().retain(|b| b.id != id);
            manager.inner.timers.remove(&id);
        });

        self.inner.timers.insert(id, timer);
        id
    }
}
