/// Theme tracking
///
/// Follows the platform's dark-mode preference with an explicit lifecycle:
/// `init` starts tracking and fires an initial notification, `dispose`
/// stops it. A disposed controller drops later refreshes instead of
/// notifying stale subscribers.

use crate::services::ThemeSource;

/// Resolved UI theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    fn from_prefers_dark(dark: bool) -> Self {
        if dark {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LifecycleState {
    Created,
    Active,
    Disposed,
}

type ThemeListener = Box<dyn Fn(ThemeMode) + Send>;

/// Tracks the platform theme preference and fans changes out to listeners.
pub struct ThemeController {
    source: Box<dyn ThemeSource>,
    state: LifecycleState,
    mode: ThemeMode,
    listeners: Vec<ThemeListener>,
}

impl ThemeController {
    pub fn new(source: Box<dyn ThemeSource>) -> Self {
        ThemeController {
            source,
            state: LifecycleState::Created,
            mode: ThemeMode::Light,
            listeners: Vec::new(),
        }
    }

    /// Current resolved mode. Light until `init` has run.
    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.state == LifecycleState::Active
    }

    /// Register a change listener. Fires on `init` and on every refresh
    /// that changes the mode.
    pub fn subscribe(&mut self, listener: impl Fn(ThemeMode) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Start tracking: read the source once and notify. Idempotent after
    /// the first call.
    pub fn init(&mut self) {
        if self.state != LifecycleState::Created {
            return;
        }
        self.state = LifecycleState::Active;
        self.mode = ThemeMode::from_prefers_dark(self.source.prefers_dark());
        log::debug!("theme tracking started: {:?}", self.mode);
        self.notify();
    }

    /// Re-read the source, notifying only on an actual change. Dropped
    /// silently unless the controller is active.
    pub fn refresh(&mut self) {
        if self.state != LifecycleState::Active {
            return;
        }
        let next = ThemeMode::from_prefers_dark(self.source.prefers_dark());
        if next != self.mode {
            self.mode = next;
            log::debug!("theme changed: {:?}", self.mode);
            self.notify();
        }
    }

    /// Stop tracking. Later refreshes are ignored; listeners are released.
    pub fn dispose(&mut self) {
        self.state = LifecycleState::Disposed;
        self.listeners.clear();
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(self.mode);
        }
    }
}
