//! Cached contact and group metadata
//!
//! Lookups go to the transport at most once per TTL and never wait longer
//! than the configured timeout. A failed or slow fetch degrades to the last
//! known value, or to "not found".

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::application::errors::BotError;
use crate::domain::entities::GroupMetadata;
use crate::domain::traits::Transport;

struct Cached<T> {
    value: T,
    fetched_at: Instant,
}

pub struct MetadataCache {
    transport: Arc<dyn Transport>,
    groups: RwLock<HashMap<String, Cached<GroupMetadata>>>,
    names: RwLock<HashMap<String, Cached<Option<String>>>>,
    ttl: Duration,
    timeout: Duration,
}

impl MetadataCache {
    pub fn new(transport: Arc<dyn Transport>, ttl: Duration, timeout: Duration) -> Self {
        Self {
            transport,
            groups: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
            ttl,
            timeout,
        }
    }

    pub async fn group_metadata(&self, chat_id: &str) -> Option<GroupMetadata> {
        if let Some(hit) = self.groups.read().await.get(chat_id) {
            if hit.fetched_at.elapsed() < self.ttl {
                return Some(hit.value.clone());
            }
        }

        match self.fetch(self.transport.group_metadata(chat_id)).await {
            Ok(meta) => {
                self.groups.write().await.insert(
                    chat_id.to_string(),
                    Cached { value: meta.clone(), fetched_at: Instant::now() },
                );
                Some(meta)
            }
            Err(e) => {
                tracing::warn!(chat = %chat_id, "group metadata unavailable: {}", e);
                self.groups.read().await.get(chat_id).map(|c| c.value.clone())
            }
        }
    }

    pub async fn contact_name(&self, jid: &str) -> Option<String> {
        if let Some(hit) = self.names.read().await.get(jid) {
            if hit.fetched_at.elapsed() < self.ttl {
                return hit.value.clone();
            }
        }

        match self.fetch(self.transport.contact_name(jid)).await {
            Ok(name) => {
                self.names.write().await.insert(
                    jid.to_string(),
                    Cached { value: name.clone(), fetched_at: Instant::now() },
                );
                name
            }
            Err(e) => {
                tracing::debug!(jid = %jid, "contact name unavailable: {}", e);
                self.names.read().await.get(jid).and_then(|c| c.value.clone())
            }
        }
    }

    /// Record a name seen on an inbound message
    pub async fn remember_name(&self, jid: &str, name: &str) {
        self.names.write().await.insert(
            jid.to_string(),
            Cached { value: Some(name.to_string()), fetched_at: Instant::now() },
        );
    }

    /// Forget contact names older than the TTL. Returns how many went.
    ///
    /// Names arrive with every message, so this runs on the sweep tick.
    /// Group entries stay as the stale fallback for slow fetches; there is
    /// one per group the bot is in.
    pub async fn purge_expired(&self) -> usize {
        let mut names = self.names.write().await;
        let before = names.len();
        names.retain(|_, cached| cached.fetched_at.elapsed() < self.ttl);
        before - names.len()
    }

    /// Drop a group's cached metadata, e.g. after a participant change
    pub async fn invalidate_group(&self, chat_id: &str) {
        self.groups.write().await.remove(chat_id);
    }

    async fn fetch<T>(&self, request: impl Future<Output = Result<T, BotError>>) -> Result<T, BotError> {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| BotError::Timeout(self.timeout))?
    }
}
