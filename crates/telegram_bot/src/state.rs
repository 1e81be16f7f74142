use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use teloxide::types::UserId;
use tokio::sync::Mutex;

use crate::conversation::State;

pub(crate) const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Clone, Debug)]
struct Session {
    state: State,
    touched: Instant,
}

/// In-progress conversations, one per user.
///
/// Only active states are stored; writing a terminal or idle state removes
/// the entry. Sessions idle for longer than the timeout are swept on every
/// access.
#[derive(Clone)]
pub(crate) struct SessionStore {
    inner: Arc<Mutex<HashMap<UserId, Session>>>,
    timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TIMEOUT)
    }
}

impl SessionStore {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub(crate) async fn get(&self, user: UserId) -> State {
        self.get_at(user, Instant::now()).await
    }

    pub(crate) async fn set(&self, user: UserId, state: State) {
        self.set_at(user, state, Instant::now()).await;
    }

    /// Apply `f` to the current state and store the result.
    pub(crate) async fn update<F, R>(&self, user: UserId, f: F) -> R
    where
        F: FnOnce(State) -> (State, R),
    {
        let now = Instant::now();
        let mut guard = self.inner.lock().await;
        self.sweep(&mut guard, now);
        let current = guard
            .remove(&user)
            .map(|session| session.state)
            .unwrap_or_default();
        let (next, result) = f(current);
        if next.is_active() {
            guard.insert(
                user,
                Session {
                    state: next,
                    touched: now,
                },
            );
        }
        result
    }

    async fn get_at(&self, user: UserId, now: Instant) -> State {
        let mut guard = self.inner.lock().await;
        self.sweep(&mut guard, now);
        guard
            .get(&user)
            .map(|session| session.state.clone())
            .unwrap_or_default()
    }

    async fn set_at(&self, user: UserId, state: State, now: Instant) {
        let mut guard = self.inner.lock().await;
        self.sweep(&mut guard, now);
        if state.is_active() {
            guard.insert(
                user,
                Session {
                    state,
                    touched: now,
                },
            );
        } else {
            guard.remove(&user);
        }
    }

    fn sweep(&self, sessions: &mut HashMap<UserId, Session>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, session| now.saturating_duration_since(session.touched) <= self.timeout);
        let expired = before - sessions.len();
        if expired > 0 {
            tracing::debug!("discarded {expired} idle session(s)");
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::{Money, TransactionKind};

    use super::*;
    use crate::conversation::Draft;

    fn awaiting_category(minor: i64) -> State {
        State::AwaitingCategory(Draft {
            kind: TransactionKind::Expense,
            amount: Money::new(minor),
            description: None,
            photo: None,
            category: None,
        })
    }

    #[tokio::test]
    async fn missing_session_is_idle() {
        let store = SessionStore::default();
        assert_eq!(store.get(UserId(1)).await, State::Idle);
    }

    #[tokio::test]
    async fn new_session_overwrites_previous() {
        let store = SessionStore::default();
        store.set(UserId(1), awaiting_category(1000)).await;
        store.set(UserId(1), awaiting_category(2000)).await;
        assert_eq!(store.get(UserId(1)).await, awaiting_category(2000));
    }

    #[tokio::test]
    async fn terminal_states_are_not_stored() {
        let store = SessionStore::default();
        store.set(UserId(1), awaiting_category(1000)).await;
        store.set(UserId(1), State::Cancelled).await;
        assert_eq!(store.get(UserId(1)).await, State::Idle);
    }

    #[tokio::test]
    async fn sessions_are_per_user() {
        let store = SessionStore::default();
        store.set(UserId(1), awaiting_category(1000)).await;
        assert_eq!(store.get(UserId(2)).await, State::Idle);
        assert_eq!(store.get(UserId(1)).await, awaiting_category(1000));
    }

    #[tokio::test]
    async fn idle_sessions_expire() {
        let store = SessionStore::new(Duration::from_secs(60));
        let start = Instant::now();
        store.set_at(UserId(1), awaiting_category(1000), start).await;

        let fresh = store.get_at(UserId(1), start + Duration::from_secs(59)).await;
        assert_eq!(fresh, awaiting_category(1000));

        let stale = store.get_at(UserId(1), start + Duration::from_secs(61)).await;
        assert_eq!(stale, State::Idle);
    }

    #[tokio::test]
    async fn update_stores_only_active_results() {
        let store = SessionStore::default();
        let effect = store
            .update(UserId(1), |state| {
                assert_eq!(state, State::Idle);
                (awaiting_category(1000), "prompt")
            })
            .await;
        assert_eq!(effect, "prompt");
        assert!(store.get(UserId(1)).await.is_active());

        store.update(UserId(1), |_| (State::Cancelled, ())).await;
        assert_eq!(store.get(UserId(1)).await, State::Idle);
    }
}
