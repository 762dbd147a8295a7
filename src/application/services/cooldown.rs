//! Per-command, per-chat cooldowns

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Outcome of a cooldown check
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CooldownDecision {
    Allowed,
    Denied { remaining: Duration },
}

impl CooldownDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CooldownDecision::Allowed)
    }

    /// Remaining wait in fractional seconds (0 when allowed)
    pub fn remaining_secs(&self) -> f64 {
        match self {
            CooldownDecision::Allowed => 0.0,
            CooldownDecision::Denied { remaining } => remaining.as_secs_f64(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    accepted_at: Instant,
    window: Duration,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.accepted_at) >= self.window
    }
}

/// Tracks the last accepted invocation of each command in each chat.
///
/// Entries expire lazily: once the window has elapsed an entry reads as
/// absent, and [`CooldownTracker::purge_expired`] drops it for good.
#[derive(Default)]
pub struct CooldownTracker {
    entries: Mutex<HashMap<(String, String), Entry>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether `command` may run in `chat_key` and record the
    /// invocation if so. Denials never move the baseline.
    pub fn check(&self, command: &str, chat_key: &str, window: Duration) -> CooldownDecision {
        if window.is_zero() {
            return CooldownDecision::Allowed;
        }

        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let key = (command.to_string(), chat_key.to_string());

        if let Some(entry) = entries.get(&key) {
            let elapsed = now.duration_since(entry.accepted_at);
            if elapsed < window {
                return CooldownDecision::Denied {
                    remaining: window - elapsed,
                };
            }
        }

        entries.insert(key, Entry { accepted_at: now, window });
        CooldownDecision::Allowed
    }

    /// Drop every entry whose window has elapsed. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| !entry.expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn second_call_inside_window_is_denied_with_remaining_time() {
        let tracker = CooldownTracker::new();
        assert!(tracker.check("sticker", "chat-a", W).is_allowed());

        tokio::time::advance(Duration::from_millis(1_500)).await;
        let decision = tracker.check("sticker", "chat-a", W);
        assert!(!decision.is_allowed());
        assert!((decision.remaining_secs() - 3.5).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn denials_do_not_extend_the_window() {
        let tracker = CooldownTracker::new();
        tracker.check("sticker", "chat-a", W);

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(!tracker.check("sticker", "chat-a", W).is_allowed());

        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert!(tracker.check("sticker", "chat-a", W).is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn chats_are_isolated() {
        let tracker = CooldownTracker::new();
        assert!(tracker.check("cmd", "chat-a", W).is_allowed());
        assert!(!tracker.check("cmd", "chat-a", W).is_allowed());
        assert!(tracker.check("cmd", "chat-b", W).is_allowed());
        assert!(tracker.check("other", "chat-a", W).is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_window_never_records() {
        let tracker = CooldownTracker::new();
        assert!(tracker.check("cmd", "chat", Duration::ZERO).is_allowed());
        assert!(tracker.check("cmd", "chat", Duration::ZERO).is_allowed());
        assert!(tracker.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired_entries() {
        let tracker = CooldownTracker::new();
        tracker.check("short", "chat", Duration::from_secs(1));
        tracker.check("long", "chat", Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(tracker.purge_expired(), 1);
        assert_eq!(tracker.len(), 1);
        assert!(!tracker.check("long", "chat", Duration::from_secs(60)).is_allowed());
    }
}
