//! Access controller state machine.
//!
//! The `AccessController` is the top-level state machine of the gate. It owns
//! the keystroke window, checks it against the target digest, persists the
//! session flag and schedules the post-login navigation.
//!
//! # Transitions
//!
//! ```text
//!                 keystroke match / force login
//! Unauthenticated ─────────────────────────────▶ Authenticated
//!        ▲                                              │
//!        └──────────────────── logout ──────────────────┘
//! ```
//!
//! A successful login persists the flag, clears the window, notifies (when
//! permitted) and schedules a navigation to the admin route unless the
//! application is already there. Logout removes the flag, clears the window
//! and cancels any navigation still pending. Mismatches are silent.

use crate::{
    config::GateConfig,
    digest,
    env::Environment,
    event::{
        AccessAction, AccessEvent, AccessState, LogLevel, NavigationTimer,
        NotificationPermission, SessionState,
    },
    storage::SessionStore,
    window::{KeyWindow, Keystroke, RECENT_LEN},
};

/// Value persisted under the storage key while authenticated.
const AUTHENTICATED_VALUE: &str = "true";

/// Title of the notification shown on login.
const NOTIFY_TITLE: &str = "Admin mode enabled";

/// A navigation waiting for its deadline.
#[derive(Debug, Clone)]
struct PendingNavigation<I> {
    timer: NavigationTimer,
    route: String,
    due: I,
}

/// Outcome of a force login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceLoginResult<I> {
    /// Whether the password matched.
    pub accepted: bool,
    /// Actions for the driver to execute. Empty when rejected.
    pub actions: Vec<AccessAction<I>>,
}

/// Access gate state machine.
///
/// Pure state machine: returns actions, caller handles I/O. The only I/O the
/// controller performs itself is through the injected [`SessionStore`], and
/// a failing store degrades the session to memory instead of erroring.
///
/// # Type Parameters
///
/// - `E`: Environment implementation for time
/// - `S`: Session store the authenticated flag lives in
pub struct AccessController<E: Environment, S: SessionStore> {
    /// Resolved configuration.
    config: GateConfig,

    /// Recent ambient keystrokes.
    window: KeyWindow,

    /// Current session state.
    state: SessionState,

    /// Injected persistence.
    store: S,

    /// Set after the first store failure; the store is not touched again.
    degraded: bool,

    /// Last route reported by the application.
    current_route: Option<String>,

    /// Last notification permission reported by the runtime.
    permission: NotificationPermission,

    /// Scheduled navigation, if any.
    pending: Option<PendingNavigation<E::Instant>>,

    /// Next timer handle to hand out.
    next_timer: u64,

    /// Environment for time.
    env: E,
}

impl<E: Environment, S: SessionStore> AccessController<E, S> {
    /// Create a controller, restoring the session from `store`.
    ///
    /// A persisted `"true"` flag restores the admin session without any
    /// keystroke. A store that fails on read starts the controller
    /// unauthenticated and degraded.
    pub fn new(env: E, store: S, config: GateConfig) -> Self {
        let mut degraded = false;
        let state = match store.get(&config.storage_key) {
            Ok(Some(value)) if value == AUTHENTICATED_VALUE => SessionState::Authenticated,
            Ok(_) => SessionState::Unauthenticated,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    transient = e.is_transient(),
                    "session store unreadable; running in memory only"
                );
                degraded = true;
                SessionState::Unauthenticated
            },
        };

        if state.is_authenticated() {
            tracing::info!("restored admin session from store");
        }

        Self {
            config,
            window: KeyWindow::new(),
            state,
            store,
            degraded,
            current_route: None,
            permission: NotificationPermission::default(),
            pending: None,
            next_timer: 1,
            env,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether an admin session is active.
    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Derived view for collaborators.
    pub fn access_state(&self) -> AccessState {
        AccessState {
            authenticated: self.is_authenticated(),
            recent_window: self.window.recent(RECENT_LEN),
        }
    }

    /// The keystroke window.
    pub fn window(&self) -> &KeyWindow {
        &self.window
    }

    /// Whether a store failure has forced the session into memory.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Handle and deadline of the scheduled navigation, if any.
    pub fn pending_navigation(&self) -> Option<(NavigationTimer, E::Instant)> {
        self.pending.as_ref().map(|p| (p.timer, p.due))
    }

    /// The configuration in use.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Process an event and return resulting actions.
    ///
    /// Never fails: mismatches produce no actions and storage failures
    /// degrade the session. A `StateChanged` action is appended whenever the
    /// derived [`AccessState`] differs from before the event.
    pub fn handle(&mut self, event: AccessEvent<E::Instant>) -> Vec<AccessAction<E::Instant>> {
        let before = self.access_state();

        let mut actions = match event {
            AccessEvent::Keystroke(keystroke) => self.handle_keystroke(keystroke),
            AccessEvent::ForceLogin { password } => self.handle_force_login(&password).1,
            AccessEvent::Logout => self.handle_logout(),
            AccessEvent::RouteChanged { path } => {
                self.current_route = Some(path);
                Vec::new()
            },
            AccessEvent::NotificationPermission(permission) => {
                self.permission = permission;
                Vec::new()
            },
            AccessEvent::Tick { now } => self.handle_tick(now),
            AccessEvent::Teardown => self.handle_teardown(),
        };

        self.push_state_change(&before, &mut actions);
        actions
    }

    /// Feed one keystroke.
    pub fn on_keystroke(&mut self, keystroke: Keystroke) -> Vec<AccessAction<E::Instant>> {
        self.handle(AccessEvent::Keystroke(keystroke))
    }

    /// Log in with an explicit password, bypassing keystroke capture.
    ///
    /// Works in either state and leaves the keystroke window untouched.
    pub fn force_login(&mut self, password: &str) -> ForceLoginResult<E::Instant> {
        let before = self.access_state();
        let (accepted, mut actions) = self.handle_force_login(password);
        self.push_state_change(&before, &mut actions);
        ForceLoginResult { accepted, actions }
    }

    /// End the admin session. A no-op while unauthenticated.
    pub fn logout(&mut self) -> Vec<AccessAction<E::Instant>> {
        self.handle(AccessEvent::Logout)
    }

    /// Handle a keystroke.
    fn handle_keystroke(&mut self, keystroke: Keystroke) -> Vec<AccessAction<E::Instant>> {
        if !self.window.push(keystroke) {
            return Vec::new();
        }

        tracing::trace!(window_len = self.window.len(), "ambient keystroke");

        if self.state.is_authenticated() {
            return Vec::new();
        }

        if !digest::matches(&self.window.contents(), &self.config.target) {
            return Vec::new();
        }

        self.window.clear();
        self.grant_access("keystroke sequence")
    }

    /// Handle force login.
    fn handle_force_login(&mut self, password: &str) -> (bool, Vec<AccessAction<E::Instant>>) {
        if !digest::matches(password, &self.config.target) {
            tracing::debug!("force login rejected");
            return (false, Vec::new());
        }

        (true, self.grant_access("force login"))
    }

    /// Handle logout.
    fn handle_logout(&mut self) -> Vec<AccessAction<E::Instant>> {
        if !self.state.is_authenticated() {
            return Vec::new();
        }

        self.state = SessionState::Unauthenticated;
        self.window.clear();

        let mut actions = Vec::new();
        let key = self.config.storage_key.clone();
        self.persist(|store| store.remove(&key));
        self.cancel_navigation(&mut actions);

        actions.push(AccessAction::Log {
            level: LogLevel::Info,
            message: "admin session ended".to_string(),
        });

        actions
    }

    /// Handle tick (navigation deadlines).
    fn handle_tick(&mut self, now: E::Instant) -> Vec<AccessAction<E::Instant>> {
        match self.pending.take() {
            Some(pending) if now >= pending.due => {
                tracing::debug!(timer = pending.timer.0, route = %pending.route, "navigation due");
                vec![AccessAction::Navigate { route: pending.route }]
            },
            not_due => {
                self.pending = not_due;
                Vec::new()
            },
        }
    }

    /// Handle consumer teardown.
    fn handle_teardown(&mut self) -> Vec<AccessAction<E::Instant>> {
        let mut actions = Vec::new();
        self.cancel_navigation(&mut actions);
        actions
    }

    /// Enter the admin session and produce the login side effects.
    fn grant_access(&mut self, trigger: &str) -> Vec<AccessAction<E::Instant>> {
        self.state = SessionState::Authenticated;

        let mut actions = Vec::new();
        let key = self.config.storage_key.clone();
        self.persist(|store| store.set(&key, AUTHENTICATED_VALUE));

        actions.push(AccessAction::Log {
            level: LogLevel::Info,
            message: format!("admin session granted via {trigger}"),
        });

        if self.permission == NotificationPermission::Granted {
            actions.push(AccessAction::Notify {
                title: NOTIFY_TITLE.to_string(),
                body: format!("Redirecting to {}", self.config.admin_route),
            });
        }

        if self.current_route.as_deref() != Some(self.config.admin_route.as_str()) {
            self.schedule_navigation(&mut actions);
        }

        actions
    }

    /// Arm the navigation timer, replacing any pending one.
    fn schedule_navigation(&mut self, actions: &mut Vec<AccessAction<E::Instant>>) {
        self.cancel_navigation(actions);

        let timer = NavigationTimer(self.next_timer);
        self.next_timer += 1;

        let route = self.config.admin_route.clone();
        let due = self.env.now() + self.config.navigation_delay;

        self.pending = Some(PendingNavigation { timer, route: route.clone(), due });
        actions.push(AccessAction::ScheduleNavigation { timer, route, due });
    }

    /// Disarm the navigation timer if armed.
    fn cancel_navigation(&mut self, actions: &mut Vec<AccessAction<E::Instant>>) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(timer = pending.timer.0, "navigation cancelled");
            actions.push(AccessAction::CancelNavigation { timer: pending.timer });
        }
    }

    /// Run a store write, degrading to memory on failure.
    fn persist<F>(&mut self, op: F)
    where
        F: FnOnce(&S) -> Result<(), crate::error::StoreError>,
    {
        if self.degraded {
            return;
        }

        if let Err(e) = op(&self.store) {
            self.degraded = true;
            tracing::warn!(
                error = %e,
                transient = e.is_transient(),
                "session not persisted; running in memory only"
            );
        }
    }

    /// Append `StateChanged` if the derived state moved.
    fn push_state_change(&self, before: &AccessState, actions: &mut Vec<AccessAction<E::Instant>>) {
        let after = self.access_state();
        if after != *before {
            actions.push(AccessAction::StateChanged(after));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Duration,
    };

    use super::*;
    use crate::{
        digest::TargetDigest,
        storage::{ChaoticStore, MemoryStore},
    };

    /// Manual clock in milliseconds, shared between clones.
    #[derive(Clone, Default)]
    struct TestEnv {
        millis: Arc<AtomicU64>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    struct TestInstant(Duration);

    impl std::ops::Add<Duration> for TestInstant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self {
            Self(self.0 + rhs)
        }
    }

    impl std::ops::Sub for TestInstant {
        type Output = Duration;

        fn sub(self, rhs: Self) -> Duration {
            self.0.saturating_sub(rhs.0)
        }
    }

    impl TestEnv {
        fn advance(&self, millis: u64) -> TestInstant {
            self.millis.fetch_add(millis, Ordering::SeqCst);
            self.now()
        }
    }

    impl Environment for TestEnv {
        type Instant = TestInstant;

        fn now(&self) -> Self::Instant {
            TestInstant(Duration::from_millis(self.millis.load(Ordering::SeqCst)))
        }
    }

    const SECRET: &str = "letmein";

    fn controller<S: SessionStore>(store: S) -> AccessController<TestEnv, S> {
        AccessController::new(TestEnv::default(), store, GateConfig::new(TargetDigest::of(SECRET)))
    }

    fn type_str<S: SessionStore>(
        gate: &mut AccessController<TestEnv, S>,
        s: &str,
    ) -> Vec<AccessAction<TestInstant>> {
        s.chars().flat_map(|key| gate.on_keystroke(Keystroke::ambient(key))).collect()
    }

    fn has_schedule(actions: &[AccessAction<TestInstant>]) -> bool {
        actions.iter().any(|a| matches!(a, AccessAction::ScheduleNavigation { .. }))
    }

    #[test]
    fn starts_unauthenticated_with_empty_store() {
        let gate = controller(MemoryStore::new());

        assert_eq!(gate.state(), SessionState::Unauthenticated);
        assert!(!gate.is_degraded());
    }

    #[test]
    fn typing_secret_authenticates() {
        let store = MemoryStore::new();
        let mut gate = controller(store.clone());

        let actions = type_str(&mut gate, SECRET);

        assert!(gate.is_authenticated());
        assert!(gate.window().is_empty());
        assert_eq!(store.get("admin_authenticated").unwrap().as_deref(), Some("true"));
        assert!(has_schedule(&actions));
    }

    #[test]
    fn leading_noise_then_secret_authenticates_once_window_matches() {
        let mut gate = controller(MemoryStore::new());

        type_str(&mut gate, "x");
        type_str(&mut gate, SECRET);

        // Window is "xletmein", which is not the secret.
        assert!(!gate.is_authenticated());
        assert_eq!(gate.window().contents(), "xletmein");
    }

    #[test]
    fn match_fires_on_the_final_keystroke() {
        let mut gate = controller(MemoryStore::new());

        type_str(&mut gate, "letmei");
        assert!(!gate.is_authenticated());

        type_str(&mut gate, "n");
        assert!(gate.is_authenticated());
    }

    #[test]
    fn text_input_keystrokes_do_not_count() {
        let mut gate = controller(MemoryStore::new());

        for key in SECRET.chars() {
            let actions = gate.on_keystroke(Keystroke::text_input(key));
            assert!(actions.is_empty());
        }

        assert!(!gate.is_authenticated());
        assert!(gate.window().is_empty());
    }

    #[test]
    fn keystrokes_emit_state_changed_with_recent_window() {
        let mut gate = controller(MemoryStore::new());

        let actions = gate.on_keystroke(Keystroke::ambient('a'));

        assert_eq!(
            actions,
            vec![AccessAction::StateChanged(AccessState {
                authenticated: false,
                recent_window: "a".to_string(),
            })]
        );
    }

    #[test]
    fn keystrokes_while_authenticated_do_not_relogin() {
        let mut gate = controller(MemoryStore::new());
        type_str(&mut gate, SECRET);

        let actions = type_str(&mut gate, SECRET);

        assert!(!has_schedule(&actions));
        assert_eq!(gate.window().contents(), SECRET);
    }

    #[test]
    fn force_login_with_secret() {
        let store = MemoryStore::new();
        let mut gate = controller(store.clone());
        type_str(&mut gate, "abc");

        let result = gate.force_login(SECRET);

        assert!(result.accepted);
        assert!(gate.is_authenticated());
        assert_eq!(gate.window().contents(), "abc");
        assert!(has_schedule(&result.actions));
        assert_eq!(store.get("admin_authenticated").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn force_login_with_wrong_password() {
        let store = MemoryStore::new();
        let mut gate = controller(store.clone());

        let result = gate.force_login("letmeinx");

        assert!(!result.accepted);
        assert!(result.actions.is_empty());
        assert!(!gate.is_authenticated());
        assert!(store.is_empty());
    }

    #[test]
    fn logout_clears_flag_and_window() {
        let store = MemoryStore::new();
        let mut gate = controller(store.clone());
        gate.force_login(SECRET);
        type_str(&mut gate, "abc");

        gate.logout();

        assert_eq!(gate.state(), SessionState::Unauthenticated);
        assert!(gate.window().is_empty());
        assert_eq!(store.get("admin_authenticated").unwrap(), None);
    }

    #[test]
    fn logout_while_unauthenticated_is_noop() {
        let mut gate = controller(MemoryStore::new());
        type_str(&mut gate, "abc");

        let actions = gate.logout();

        assert!(actions.is_empty());
        assert_eq!(gate.window().contents(), "abc");
    }

    #[test]
    fn logout_cancels_pending_navigation() {
        let mut gate = controller(MemoryStore::new());
        let result = gate.force_login(SECRET);
        let timer = match result.actions.iter().find_map(|a| match a {
            AccessAction::ScheduleNavigation { timer, .. } => Some(*timer),
            _ => None,
        }) {
            Some(timer) => timer,
            None => panic!("expected navigation to be scheduled"),
        };

        let actions = gate.logout();

        assert!(actions.contains(&AccessAction::CancelNavigation { timer }));
        assert!(gate.pending_navigation().is_none());

        let late = gate.handle(AccessEvent::Tick { now: gate.env.advance(1_000) });
        assert!(late.is_empty());
    }

    #[test]
    fn navigation_fires_once_after_delay() {
        let mut gate = controller(MemoryStore::new());
        gate.force_login(SECRET);

        let early = gate.handle(AccessEvent::Tick { now: gate.env.advance(499) });
        assert!(early.is_empty());

        let due = gate.handle(AccessEvent::Tick { now: gate.env.advance(1) });
        assert_eq!(due, vec![AccessAction::Navigate { route: "/admin".to_string() }]);

        let again = gate.handle(AccessEvent::Tick { now: gate.env.advance(500) });
        assert!(again.is_empty());
    }

    #[test]
    fn no_navigation_when_already_on_admin_route() {
        let mut gate = controller(MemoryStore::new());
        gate.handle(AccessEvent::RouteChanged { path: "/admin".to_string() });

        let result = gate.force_login(SECRET);

        assert!(result.accepted);
        assert!(!has_schedule(&result.actions));
    }

    #[test]
    fn second_login_replaces_pending_navigation() {
        let mut gate = controller(MemoryStore::new());
        gate.force_login(SECRET);
        let (first, _) = gate.pending_navigation().unwrap();

        let result = gate.force_login(SECRET);
        let (second, _) = gate.pending_navigation().unwrap();

        assert_ne!(first, second);
        assert!(result.actions.contains(&AccessAction::CancelNavigation { timer: first }));
    }

    #[test]
    fn teardown_cancels_pending_navigation() {
        let mut gate = controller(MemoryStore::new());
        gate.force_login(SECRET);

        let actions = gate.handle(AccessEvent::Teardown);

        assert!(matches!(actions.as_slice(), [AccessAction::CancelNavigation { .. }]));
        assert!(gate.is_authenticated());
    }

    #[test]
    fn notification_only_when_granted() {
        let mut gate = controller(MemoryStore::new());
        let denied = gate.force_login(SECRET);
        assert!(!denied.actions.iter().any(|a| matches!(a, AccessAction::Notify { .. })));

        gate.handle(AccessEvent::NotificationPermission(NotificationPermission::Granted));
        let granted = gate.force_login(SECRET);
        assert!(granted.actions.iter().any(|a| matches!(a, AccessAction::Notify { .. })));
    }

    #[test]
    fn persisted_flag_restores_session() {
        let store = MemoryStore::new();
        let mut first = controller(store.clone());
        first.force_login(SECRET);
        drop(first);

        let restarted = controller(store);
        assert!(restarted.is_authenticated());
    }

    #[test]
    fn non_true_flag_reads_as_unauthenticated() {
        let store = MemoryStore::new();
        store.set("admin_authenticated", "yes").unwrap();

        let gate = controller(store);
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn unreadable_store_degrades() {
        let store = ChaoticStore::new(MemoryStore::new());
        store.inner().set("admin_authenticated", "true").unwrap();
        store.set_fail_reads(true);

        let gate = controller(store);

        assert!(gate.is_degraded());
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn failed_write_still_authenticates_in_memory() {
        let store = ChaoticStore::new(MemoryStore::new());
        store.set_fail_writes(true);
        let mut gate = controller(store.clone());

        let actions = type_str(&mut gate, SECRET);

        assert!(gate.is_authenticated());
        assert!(gate.is_degraded());
        assert!(actions.contains(&AccessAction::StateChanged(gate.access_state())));
        assert_eq!(store.inner().get("admin_authenticated").unwrap(), None);

        // Once degraded the store is left alone, even after it recovers.
        store.set_fail_writes(false);
        gate.logout();
        gate.force_login(SECRET);
        assert_eq!(store.inner().get("admin_authenticated").unwrap(), None);
    }

    #[test]
    fn placeholder_target_never_authenticates() {
        let mut gate = AccessController::new(
            TestEnv::default(),
            MemoryStore::new(),
            GateConfig::default(),
        );

        type_str(&mut gate, "");
        let result = gate.force_login("");

        assert!(!result.accepted);
        assert!(!gate.is_authenticated());
    }
}
