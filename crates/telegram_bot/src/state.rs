use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use engine::ConversationContext;
use teloxide::types::{ChatId, UserId};
use tokio::{sync::Mutex, task::JoinHandle};

/// Conversations untouched for this long are dropped (24 hours).
pub(crate) const ABANDON_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Abandoned conversation check interval (10 minutes)
pub(crate) const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Identifies one conversation: a user inside a chat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SessionKey {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

struct Session {
    ctx: Arc<Mutex<ConversationContext>>,
    last_activity: Instant,
}

/// In-memory conversations, one lock per user.
///
/// The outer lock only guards the map; the per-session lock is held while an
/// input is handled so inputs of the same user are processed one at a time.
#[derive(Clone, Default)]
pub(crate) struct SessionStore {
    inner: Arc<Mutex<HashMap<SessionKey, Session>>>,
}

impl SessionStore {
    /// Returns the conversation of `key`, creating an idle one on first contact.
    pub(crate) async fn session(&self, key: SessionKey) -> Arc<Mutex<ConversationContext>> {
        let mut guard = self.inner.lock().await;
        let session = guard.entry(key).or_insert_with(|| Session {
            ctx: Arc::default(),
            last_activity: Instant::now(),
        });
        session.last_activity = Instant::now();
        session.ctx.clone()
    }

    /// Forgets the conversation of `key` once it is idle and nobody else holds it.
    pub(crate) async fn remove_if_idle(&self, key: SessionKey) {
        let mut guard = self.inner.lock().await;
        let Some(session) = guard.get(&key) else {
            return;
        };
        if Arc::strong_count(&session.ctx) > 1 {
            return;
        }
        let idle = session.ctx.try_lock().is_ok_and(|ctx| ctx.is_idle());
        if idle {
            guard.remove(&key);
        }
    }

    /// Drops conversations last touched before `cutoff`, whatever their step,
    /// unless an input is being handled for them. Returns how many were dropped.
    pub(crate) async fn remove_abandoned(&self, cutoff: Instant) -> usize {
        let mut guard = self.inner.lock().await;
        let before = guard.len();
        guard.retain(|key, session| {
            let keep = session.last_activity >= cutoff || Arc::strong_count(&session.ctx) > 1;
            if !keep {
                tracing::debug!("dropping abandoned conversation in chat {}", key.chat_id.0);
            }
            keep
        });
        before - guard.len()
    }

    /// Starts the background task dropping conversations idle for longer
    /// than `timeout`, checked every `interval`.
    pub(crate) fn spawn_cleanup(&self, timeout: Duration, interval: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(cutoff) = Instant::now().checked_sub(timeout) else {
                    continue;
                };
                let removed = store.remove_abandoned(cutoff).await;
                if removed > 0 {
                    tracing::info!("Dropped {removed} abandoned conversations");
                }
            }
        })
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
