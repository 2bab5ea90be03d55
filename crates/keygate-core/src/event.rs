//! Events fed into the controller and actions it produces.

use crate::window::Keystroke;

/// Which of the two session states the gate is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No admin session.
    Unauthenticated,
    /// Admin session active.
    Authenticated,
}

impl SessionState {
    /// Whether this is the admin state.
    pub fn is_authenticated(self) -> bool {
        self == Self::Authenticated
    }
}

/// Derived view handed to collaborators such as the status view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessState {
    /// Whether an admin session is active.
    pub authenticated: bool,
    /// The last few characters of the keystroke window.
    pub recent_window: String,
}

/// Whether the runtime lets the gate show notifications.
///
/// The gate only consults this; it never asks for permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPermission {
    /// Notifications may be shown.
    Granted,
    /// The user refused notifications.
    Denied,
    /// The user has not decided yet.
    #[default]
    Default,
}

/// Handle identifying one scheduled navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigationTimer(pub u64);

/// Severity of a log action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal state transitions.
    Info,
    /// Degraded but continuing.
    Warn,
}

/// Events fed into the controller.
///
/// # Security
///
/// - Debug redaction: the `Debug` impl redacts `ForceLogin::password` and
///   keystroke characters so that logging an event never leaks the secret.
#[derive(Clone, PartialEq, Eq)]
pub enum AccessEvent<I> {
    /// A raw keystroke from the keyboard.
    Keystroke(Keystroke),

    /// Bypass keystroke capture with an explicit password.
    ForceLogin {
        /// Candidate passphrase.
        password: String,
    },

    /// End the admin session.
    Logout,

    /// The application navigated somewhere.
    RouteChanged {
        /// New current route.
        path: String,
    },

    /// The runtime's notification permission changed.
    NotificationPermission(NotificationPermission),

    /// Time advanced; fires due navigations.
    Tick {
        /// Current time.
        now: I,
    },

    /// The consumer is being torn down; cancels pending work.
    Teardown,
}

impl<I: std::fmt::Debug> std::fmt::Debug for AccessEvent<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keystroke(keystroke) => {
                f.debug_struct("Keystroke").field("source", &keystroke.source).finish()
            },
            Self::ForceLogin { password } => f
                .debug_struct("ForceLogin")
                .field("password", &format!("<redacted {} chars>", password.chars().count()))
                .finish(),
            Self::Logout => f.write_str("Logout"),
            Self::RouteChanged { path } => f.debug_struct("RouteChanged").field("path", path).finish(),
            Self::NotificationPermission(permission) => {
                f.debug_tuple("NotificationPermission").field(permission).finish()
            },
            Self::Tick { now } => f.debug_struct("Tick").field("now", now).finish(),
            Self::Teardown => f.write_str("Teardown"),
        }
    }
}

/// Actions produced by the controller for its driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessAction<I> {
    /// Show a local notification.
    Notify {
        /// Notification title.
        title: String,
        /// Notification body.
        body: String,
    },

    /// Arm a one-shot timer; feed a `Tick` at or after `due`.
    ScheduleNavigation {
        /// Handle for this navigation.
        timer: NavigationTimer,
        /// Route that will be navigated to.
        route: String,
        /// When the navigation becomes due.
        due: I,
    },

    /// Disarm a previously scheduled timer.
    CancelNavigation {
        /// Handle of the cancelled navigation.
        timer: NavigationTimer,
    },

    /// Navigate the application now.
    Navigate {
        /// Route to navigate to.
        route: String,
    },

    /// The derived access state changed.
    StateChanged(AccessState),

    /// Diagnostic message.
    Log {
        /// Severity.
        level: LogLevel,
        /// Message text. Never contains keystroke contents.
        message: String,
    },
}
