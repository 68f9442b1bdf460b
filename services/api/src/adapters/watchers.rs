//! services/api/src/adapters/watchers.rs
//!
//! Per-token session notification channels shared by the identity adapters.

use memory_wall_core::domain::Principal;
use std::collections::HashMap;
use tokio::sync::{watch, Mutex};

/// One `watch` channel per live session token.
#[derive(Default)]
pub struct SessionWatchers {
    senders: Mutex<HashMap<String, watch::Sender<Option<Principal>>>>,
}

impl SessionWatchers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `token`, publishing `current` first.
    ///
    /// Tokens without a session get a detached receiver that holds `None` and never
    /// changes again. Channels whose pages have all closed are dropped here.
    pub async fn subscribe(
        &self,
        token: &str,
        current: Option<Principal>,
    ) -> watch::Receiver<Option<Principal>> {
        if current.is_none() {
            let (_, rx) = watch::channel(None);
            return rx;
        }
        let mut senders = self.senders.lock().await;
        senders.retain(|_, sender| sender.receiver_count() > 0);
        let sender = senders
            .entry(token.to_string())
            .or_insert_with(|| watch::channel(None).0);
        sender.send_replace(current);
        sender.subscribe()
    }

    /// Publishes an updated principal to every session of the same user.
    pub async fn publish_user(&self, principal: &Principal) {
        let senders = self.senders.lock().await;
        for sender in senders.values() {
            sender.send_if_modified(|slot| match slot {
                Some(p) if p.user_id == principal.user_id && p != principal => {
                    *slot = Some(principal.clone());
                    true
                }
                _ => false,
            });
        }
    }

    /// Publishes `None` and forgets the token.
    pub async fn close(&self, token: &str) {
        if let Some(sender) = self.senders.lock().await.remove(token) {
            sender.send_replace(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(verified: bool) -> Principal {
        Principal {
            user_id: "u1".into(),
            email: "a@b.c".into(),
            email_verified: verified,
            first_name: None,
        }
    }

    #[tokio::test]
    async fn close_publishes_sign_out() {
        let watchers = SessionWatchers::new();
        let mut rx = watchers.subscribe("t", Some(principal(true))).await;
        assert!(rx.borrow_and_update().is_some());

        watchers.close("t").await;
        rx.changed().await.unwrap();
        assert!(rx.borrow().is_none());
    }

    #[tokio::test]
    async fn user_updates_reach_their_sessions() {
        let watchers = SessionWatchers::new();
        let mut rx = watchers.subscribe("t", Some(principal(false))).await;
        rx.borrow_and_update();

        watchers.publish_user(&principal(true)).await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|p| p.email_verified), Some(true));
    }

    #[tokio::test]
    async fn closed_pages_do_not_accumulate() {
        let watchers = SessionWatchers::new();
        for i in 0..100 {
            let rx = watchers
                .subscribe(&format!("t{}", i), Some(principal(true)))
                .await;
            drop(rx);
        }
        let _open = watchers.subscribe("live", Some(principal(true))).await;
        assert_eq!(watchers.senders.lock().await.len(), 1);

        // A second page on a live token shares its channel.
        let _again = watchers.subscribe("live", Some(principal(true))).await;
        let senders = watchers.senders.lock().await;
        assert_eq!(senders.len(), 1);
        assert_eq!(senders["live"].receiver_count(), 2);
    }

    #[tokio::test]
    async fn unknown_tokens_hold_none() {
        let watchers = SessionWatchers::new();
        let rx = watchers.subscribe("missing", None).await;
        assert!(rx.borrow().is_none());
    }
}
