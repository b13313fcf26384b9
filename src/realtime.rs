use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};

use crate::{lounges::Lounge, pages::PageUser};

/// One event per successful mutation, pushed to every session watching the
/// owning page. Never persisted; a session that misses one reconciles on its
/// next `joinPage`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RealtimeEvent {
    #[serde(rename_all = "camelCase")]
    UserAddedToLounge { user_id: String, lounge_id: String },
    #[serde(rename_all = "camelCase")]
    UserRemovedFromLounge { user_id: String, lounge_id: String },
    NewLounge { lounge: Lounge },
    UserJoinedPage { user: PageUser },
}

/// What actually travels on a scope's channel: the event plus the session it
/// originated from, so that session's own socket can skip the echo.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub origin: Option<String>,
    pub event: RealtimeEvent,
}

const SCOPE_CAPACITY: usize = 64;

/// Page-scoped fan-out. One broadcast channel per page, created on first
/// subscribe or publish; order within a scope is the publish order, nothing
/// is guaranteed across scopes.
#[derive(Clone, Default)]
pub struct Notifier {
    scopes: Arc<RwLock<HashMap<String, broadcast::Sender<Envelope>>>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, page_id: &str) -> broadcast::Receiver<Envelope> {
        let mut scopes = self.scopes.write().await;
        scopes
            .entry(page_id.to_owned())
            .or_insert_with(|| broadcast::channel(SCOPE_CAPACITY).0)
            .subscribe()
    }

    /// Fire-and-forget: a scope nobody watches swallows the event.
    pub async fn publish(&self, page_id: &str, origin: Option<String>, event: RealtimeEvent) {
        let stale = {
            let scopes = self.scopes.read().await;
            match scopes.get(page_id) {
                Some(tx) => tx.send(Envelope { origin, event }).is_err(),
                None => false,
            }
        };

        // The last receiver hung up; drop the channel so scopes don't pile up.
        if stale {
            let mut scopes = self.scopes.write().await;
            if scopes.get(page_id).is_some_and(|tx| tx.receiver_count() == 0) {
                scopes.remove(page_id);
            }
        }
    }
}
