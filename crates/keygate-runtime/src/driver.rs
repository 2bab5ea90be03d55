//! Gate driver.
//!
//! Owns an [`AccessController`] and executes the actions it returns against a
//! [`Frontend`]. The driver loop multiplexes three inputs: keystrokes from a
//! [`KeystrokeSubscription`], commands from the application, and the
//! controller's navigation deadline. Queued keystrokes always win over
//! commands, and none are dropped when the command channel closes.

use std::future::Future;

use keygate_core::{
    AccessAction, AccessController, AccessEvent, Keystroke, LogLevel, NotificationPermission,
    SessionStore, StatusView,
};
use tokio::sync::mpsc;

use crate::{error::RuntimeError, hub::KeystrokeSubscription, system_env::SystemEnv};

/// The application surface the gate acts on.
///
/// Navigation and notification display belong to the application; the gate
/// only asks for them.
pub trait Frontend {
    /// Whether notifications may be shown. Consulted, never requested.
    fn notification_permission(&self) -> NotificationPermission {
        NotificationPermission::Default
    }

    /// Route currently displayed, if known.
    fn current_route(&self) -> Option<String> {
        None
    }

    /// Show a local notification.
    fn notify(&mut self, title: &str, body: &str);

    /// Navigate the application.
    fn navigate(&mut self, route: &str) -> Result<(), RuntimeError>;

    /// Show the debug status line.
    fn show_status(&mut self, _line: &str) {}
}

/// Commands from the application to the gate.
#[derive(Clone, PartialEq, Eq)]
pub enum DriverCommand {
    /// A keystroke delivered in order with the other commands.
    ///
    /// For applications whose keystrokes and commands share one source.
    Type(Keystroke),
    /// Log in with an explicit password.
    ForceLogin(String),
    /// End the admin session.
    Logout,
    /// The application navigated.
    RouteChanged(String),
}

impl std::fmt::Debug for DriverCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Type(keystroke) => f.debug_tuple("Type").field(&keystroke.source).finish(),
            Self::ForceLogin(_) => f.write_str("ForceLogin(<redacted>)"),
            Self::Logout => f.write_str("Logout"),
            Self::RouteChanged(path) => f.debug_tuple("RouteChanged").field(path).finish(),
        }
    }
}

/// Runs an access controller against a frontend.
pub struct GateDriver<S: SessionStore, F: Frontend> {
    /// The sans-IO controller
    controller: AccessController<SystemEnv, S>,
    /// Application surface
    frontend: F,
    /// Debug indicator
    status: StatusView,
}

impl<S: SessionStore, F: Frontend> GateDriver<S, F> {
    /// Create a driver and sync the controller with the frontend's current
    /// route and notification permission.
    pub fn new(controller: AccessController<SystemEnv, S>, frontend: F, status: StatusView) -> Self {
        let mut driver = Self { controller, frontend, status };

        let permission = driver.frontend.notification_permission();
        driver.dispatch(AccessEvent::NotificationPermission(permission));

        if let Some(path) = driver.frontend.current_route() {
            driver.dispatch(AccessEvent::RouteChanged { path });
        }

        let initial = driver.controller.access_state();
        if let Some(line) = driver.status.render(&initial) {
            driver.frontend.show_status(&line);
        }

        driver
    }

    /// The controller being driven.
    pub fn controller(&self) -> &AccessController<SystemEnv, S> {
        &self.controller
    }

    /// The frontend actions are executed against.
    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    /// Log in with an explicit password. Returns whether it matched.
    pub fn force_login(&mut self, password: &str) -> bool {
        let result = self.controller.force_login(password);
        self.execute(result.actions);
        result.accepted
    }

    /// End the admin session.
    pub fn logout(&mut self) {
        self.dispatch(AccessEvent::Logout);
    }

    /// Fire any navigation that is already due.
    pub fn poll_timers(&mut self) {
        let now = tokio::time::Instant::now();
        self.dispatch(AccessEvent::Tick { now });
    }

    /// Run until `shutdown` resolves or the command channel closes.
    ///
    /// Queued keystrokes are handled before commands, and keystrokes still
    /// queued when the command channel closes are handled before returning.
    /// The hub going away only stops keystroke delivery. Keystrokes and
    /// commands come from independent sources with no order between them;
    /// a source that needs one sends [`DriverCommand::Type`] instead.
    ///
    /// The subscription is consumed and dropped on return, which detaches it
    /// from the hub; any pending navigation is cancelled.
    pub async fn run<Q>(
        &mut self,
        mut subscription: KeystrokeSubscription,
        mut commands: mpsc::UnboundedReceiver<DriverCommand>,
        shutdown: Q,
    ) where
        Q: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("gate driver running");

        let mut hub_open = true;

        loop {
            let deadline = self.controller.pending_navigation().map(|(_, due)| due);

            tokio::select! {
                biased;

                () = &mut shutdown => {
                    tracing::debug!("shutdown requested");
                    break;
                },
                keystroke = subscription.recv(), if hub_open => match keystroke {
                    Some(keystroke) => self.dispatch(AccessEvent::Keystroke(keystroke)),
                    None => {
                        tracing::debug!("keyboard hub closed");
                        hub_open = false;
                    },
                },
                command = commands.recv() => match command {
                    Some(command) => self.apply_command(command),
                    None => {
                        tracing::debug!("command channel closed");
                        self.drain(&mut subscription);
                        break;
                    },
                },
                () = wait_until(deadline) => self.poll_timers(),
            }
        }

        self.dispatch(AccessEvent::Teardown);
        subscription.detach();
        tracing::info!("gate driver stopped");
    }

    /// Handle keystrokes that are already queued.
    fn drain(&mut self, subscription: &mut KeystrokeSubscription) {
        while let Some(keystroke) = subscription.try_recv() {
            self.dispatch(AccessEvent::Keystroke(keystroke));
        }
    }

    fn apply_command(&mut self, command: DriverCommand) {
        match command {
            DriverCommand::Type(keystroke) => self.dispatch(AccessEvent::Keystroke(keystroke)),
            DriverCommand::ForceLogin(password) => {
                let accepted = self.force_login(&password);
                tracing::debug!(accepted, "force login command");
            },
            DriverCommand::Logout => self.logout(),
            DriverCommand::RouteChanged(path) => self.dispatch(AccessEvent::RouteChanged { path }),
        }
    }

    fn dispatch(&mut self, event: AccessEvent<tokio::time::Instant>) {
        let actions = self.controller.handle(event);
        self.execute(actions);
    }

    /// Execute controller actions.
    fn execute(&mut self, actions: Vec<AccessAction<tokio::time::Instant>>) {
        for action in actions {
            match action {
                AccessAction::Notify { title, body } => self.frontend.notify(&title, &body),

                AccessAction::ScheduleNavigation { timer, route, .. } => {
                    tracing::debug!(timer = timer.0, %route, "navigation scheduled");
                },

                AccessAction::CancelNavigation { timer } => {
                    tracing::debug!(timer = timer.0, "navigation cancelled");
                },

                AccessAction::Navigate { route } => match self.frontend.navigate(&route) {
                    Ok(()) => {
                        let follow_up = self.controller.handle(AccessEvent::RouteChanged { path: route });
                        self.execute(follow_up);
                    },
                    Err(e) => tracing::warn!("navigation failed: {}", e),
                },

                AccessAction::StateChanged(state) => {
                    if let Some(line) = self.status.render(&state) {
                        self.frontend.show_status(&line);
                    }
                },

                AccessAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!("{}", message),
                    LogLevel::Info => tracing::info!("{}", message),
                    LogLevel::Warn => tracing::warn!("{}", message),
                },
            }
        }
    }
}

/// Resolve at `deadline`, or never if there is none.
async fn wait_until(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use keygate_core::{GateConfig, MemoryStore, TargetDigest};

    use super::*;

    #[derive(Default)]
    struct RecordingFrontend {
        permission: Option<NotificationPermission>,
        route: Option<String>,
        notifications: Vec<(String, String)>,
        navigations: Vec<String>,
        statuses: Vec<String>,
        unreachable: bool,
    }

    impl Frontend for RecordingFrontend {
        fn notification_permission(&self) -> NotificationPermission {
            self.permission.unwrap_or_default()
        }

        fn current_route(&self) -> Option<String> {
            self.route.clone()
        }

        fn notify(&mut self, title: &str, body: &str) {
            self.notifications.push((title.to_string(), body.to_string()));
        }

        fn navigate(&mut self, route: &str) -> Result<(), RuntimeError> {
            self.navigations.push(route.to_string());
            if self.unreachable {
                return Err(RuntimeError::Navigation {
                    route: route.to_string(),
                    reason: "window closed".to_string(),
                });
            }
            Ok(())
        }

        fn show_status(&mut self, line: &str) {
            self.statuses.push(line.to_string());
        }
    }

    fn driver(frontend: RecordingFrontend) -> GateDriver<MemoryStore, RecordingFrontend> {
        let controller = AccessController::new(
            SystemEnv::new(),
            MemoryStore::new(),
            GateConfig::new(TargetDigest::of("letmein")),
        );
        GateDriver::new(controller, frontend, StatusView::new(true))
    }

    #[tokio::test(start_paused = true)]
    async fn force_login_navigates_after_delay() {
        let mut driver = driver(RecordingFrontend::default());

        assert!(driver.force_login("letmein"));
        driver.poll_timers();
        assert!(driver.frontend().navigations.is_empty());

        tokio::time::advance(Duration::from_millis(500)).await;
        driver.poll_timers();
        assert_eq!(driver.frontend().navigations, vec!["/admin".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn navigation_feeds_route_back() {
        let mut driver = driver(RecordingFrontend::default());
        driver.force_login("letmein");
        tokio::time::advance(Duration::from_millis(500)).await;
        driver.poll_timers();

        // Now on the admin route, a second login schedules nothing.
        driver.force_login("letmein");
        assert!(driver.controller().pending_navigation().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_navigation_leaves_route_unchanged() {
        let frontend = RecordingFrontend { unreachable: true, ..RecordingFrontend::default() };
        let mut driver = driver(frontend);
        driver.force_login("letmein");
        tokio::time::advance(Duration::from_millis(500)).await;
        driver.poll_timers();
        assert_eq!(driver.frontend().navigations, vec!["/admin".to_string()]);

        // Still off the admin route, so the next login schedules again.
        driver.force_login("letmein");
        assert!(driver.controller().pending_navigation().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn logout_before_deadline_prevents_navigation() {
        let mut driver = driver(RecordingFrontend::default());
        driver.force_login("letmein");
        driver.logout();

        tokio::time::advance(Duration::from_secs(2)).await;
        driver.poll_timers();
        assert!(driver.frontend().navigations.is_empty());
    }

    #[test]
    fn notifies_only_with_permission() {
        let denied = {
            let mut d = driver(RecordingFrontend::default());
            d.force_login("letmein");
            d.frontend().notifications.len()
        };
        let granted = {
            let frontend = RecordingFrontend {
                permission: Some(NotificationPermission::Granted),
                ..RecordingFrontend::default()
            };
            let mut d = driver(frontend);
            d.force_login("letmein");
            d.frontend().notifications.len()
        };

        assert_eq!(denied, 0);
        assert_eq!(granted, 1);
    }

    #[test]
    fn status_lines_follow_state() {
        let mut driver = driver(RecordingFrontend::default());
        driver.force_login("letmein");

        let statuses = &driver.frontend().statuses;
        assert_eq!(statuses.first().unwrap(), "[gate: locked] keys: \"\"");
        assert_eq!(statuses.last().unwrap(), "[gate: ADMIN] keys: \"\"");
    }

    #[test]
    fn wrong_password_is_silent() {
        let mut driver = driver(RecordingFrontend::default());

        assert!(!driver.force_login("nope"));
        assert_eq!(driver.frontend().statuses.len(), 1);
        assert!(driver.frontend().notifications.is_empty());
    }

    #[test]
    fn command_debug_redacts_password() {
        let rendered = format!("{:?}", DriverCommand::ForceLogin("letmein".to_string()));
        assert!(!rendered.contains("letmein"));

        let rendered = format!("{:?}", DriverCommand::Type(Keystroke::ambient('q')));
        assert!(!rendered.contains('q'));
    }

    #[tokio::test(start_paused = true)]
    async fn typed_commands_keep_their_order() {
        let mut driver = driver(RecordingFrontend::default());
        let hub = crate::KeyboardHub::new();
        let (commands, rx) = mpsc::unbounded_channel();

        for key in "letmein".chars() {
            commands.send(DriverCommand::Type(Keystroke::ambient(key))).unwrap();
        }
        commands.send(DriverCommand::Logout).unwrap();
        commands.send(DriverCommand::Type(Keystroke::ambient('z'))).unwrap();
        drop(commands);

        driver.run(hub.attach(), rx, std::future::pending()).await;

        assert!(!driver.controller().is_authenticated());
        assert_eq!(driver.controller().window().contents(), "z");
    }
}
