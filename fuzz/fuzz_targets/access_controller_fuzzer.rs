//! Fuzz target for [`AccessController`]
//!
//! Prevent admin access without the secret
//!
//! # Strategy
//!
//! - Operation sequences: Arbitrary keystrokes, text-field typing, forced
//!   logins, logouts, ticks, route changes, store failures and restarts
//! - Reference model: Every step is mirrored on [`ModelGate`]
//!
//! # Invariants
//!
//! - Window NEVER exceeds `WINDOW_CAPACITY`
//! - Text-field keystrokes NEVER change the window
//! - `Authenticated` ONLY reachable via the secret or a persisted flag
//! - After logout: unauthenticated, window empty, no pending navigation
//! - `Navigate` never fires before its deadline
//! - Observable state ALWAYS equals the model's

#![no_main]

use std::time::Duration;

use keygate_core::{
    AccessAction, AccessController, AccessEvent, ChaoticStore, GateConfig, Keystroke,
    MemoryStore, SessionStore, TargetDigest, WINDOW_CAPACITY,
};
use keygate_harness::{MODEL_SECRET, ModelGate, ObservableState, Operation, SimEnv};
use libfuzzer_sys::fuzz_target;

const STORAGE_KEY: &str = "admin_authenticated";

type Store = ChaoticStore<MemoryStore>;

fn build(env: &SimEnv, store: &Store) -> AccessController<SimEnv, Store> {
    AccessController::new(env.clone(), store.clone(), GateConfig::new(TargetDigest::of(MODEL_SECRET)))
}

fn observe(
    gate: &AccessController<SimEnv, Store>,
    store: &Store,
    navigations: u32,
) -> ObservableState {
    ObservableState {
        authenticated: gate.is_authenticated(),
        window: gate.window().contents(),
        persisted: store.inner().get(STORAGE_KEY).ok().flatten().as_deref() == Some("true"),
        degraded: gate.is_degraded(),
        pending_due_ms: gate
            .pending_navigation()
            .map(|(_, due)| u64::try_from(due.elapsed().as_millis()).unwrap_or(u64::MAX)),
        navigations,
    }
}

fuzz_target!(|operations: Vec<Operation>| {
    let env = SimEnv::new();
    let store = ChaoticStore::new(MemoryStore::new());
    let mut gate = build(&env, &store);
    let mut model = ModelGate::new();

    let mut navigations = 0u32;

    for op in &operations {
        let was_authenticated = gate.is_authenticated();
        let window_before = gate.window().contents();
        let due_before = gate.pending_navigation().map(|(_, due)| due);

        let actions = match op {
            Operation::Type { key } => gate.on_keystroke(Keystroke::ambient(key.to_char())),
            Operation::TypeInTextField { key } => {
                let actions = gate.on_keystroke(Keystroke::text_input(key.to_char()));
                assert_eq!(gate.window().contents(), window_before, "text input changed window");
                assert!(actions.is_empty(), "text input produced actions");
                actions
            },
            Operation::TypeSecret => MODEL_SECRET
                .chars()
                .flat_map(|c| gate.on_keystroke(Keystroke::ambient(c)))
                .collect(),
            Operation::ForceLogin { correct } => {
                let password =
                    if *correct { MODEL_SECRET.to_string() } else { format!("{MODEL_SECRET}x") };
                let result = gate.force_login(&password);
                assert_eq!(result.accepted, *correct);
                result.actions
            },
            Operation::Logout => {
                let actions = gate.logout();
                assert!(!gate.is_authenticated());
                assert!(gate.pending_navigation().is_none());
                if was_authenticated {
                    assert!(gate.window().is_empty());
                }
                actions
            },
            Operation::AdvanceTime { millis } => {
                let now = env.advance(Duration::from_millis(u64::from(*millis)));
                let actions = gate.handle(AccessEvent::Tick { now });
                if actions.iter().any(|a| matches!(a, AccessAction::Navigate { .. })) {
                    assert!(due_before.is_some_and(|due| now >= due), "navigated early");
                }
                actions
            },
            Operation::VisitRoute { admin } => {
                let path = if *admin { "/admin" } else { "/" };
                gate.handle(AccessEvent::RouteChanged { path: path.to_string() })
            },
            Operation::StoreWrites { failing } => {
                store.set_fail_writes(*failing);
                Vec::new()
            },
            Operation::Restart => {
                gate = build(&env, &store);
                Vec::new()
            },
        };

        navigations += u32::try_from(
            actions.iter().filter(|a| matches!(a, AccessAction::Navigate { .. })).count(),
        )
        .unwrap_or(u32::MAX);

        assert!(gate.window().len() <= WINDOW_CAPACITY);

        let reached_via_secret = matches!(
            op,
            Operation::TypeSecret | Operation::Type { .. } | Operation::ForceLogin { correct: true }
        );
        if !was_authenticated && gate.is_authenticated() {
            assert!(
                reached_via_secret || matches!(op, Operation::Restart),
                "authenticated by {op:?}"
            );
        }

        model.apply(op);
        assert_eq!(observe(&gate, &store, navigations), model.observable_state(), "after {op:?}");
    }
});
