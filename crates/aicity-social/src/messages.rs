//! The message bus: per-agent inboxes with bounded retention.
//!
//! Messages expire after a TTL (default 3 days); the scheduler runs the
//! expiry sweep once per tick. Senders may be anonymous -- blackmail notes
//! and tips arrive with no return address.

use chrono::Utc;
use tracing::debug;

use aicity_types::{AgentId, CityMessage, MessageId, MessageSender};

/// Default message retention in days.
pub const DEFAULT_TTL_DAYS: u64 = 3;

/// The city message bus.
#[derive(Debug, Clone)]
pub struct MessageBus {
    messages: Vec<CityMessage>,
    ttl_days: u64,
}

impl MessageBus {
    /// Create an empty bus with the default TTL.
    pub const fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL_DAYS)
    }

    /// Create an empty bus with an explicit TTL.
    pub const fn with_ttl(ttl_days: u64) -> Self {
        Self {
            messages: Vec::new(),
            ttl_days,
        }
    }

    /// Rebuild from persisted messages (resume path).
    pub const fn from_messages(messages: Vec<CityMessage>, ttl_days: u64) -> Self {
        Self { messages, ttl_days }
    }

    /// Deliver a message. Returns its id.
    pub fn send(
        &mut self,
        day: u64,
        from: MessageSender,
        to: AgentId,
        body: impl Into<String>,
    ) -> MessageId {
        let id = MessageId::new();
        self.messages.push(CityMessage {
            id,
            day,
            from,
            to,
            body: body.into(),
            sent_at: Utc::now(),
            read_at: None,
        });
        id
    }

    /// The recipient's inbox: unexpired messages no older than
    /// `max_age_days`, newest first, truncated to `limit`.
    pub fn inbox(&self, agent: AgentId, day: u64, max_age_days: u64, limit: usize) -> Vec<&CityMessage> {
        let cutoff = day.saturating_sub(max_age_days.min(self.ttl_days));
        let mut found: Vec<&CityMessage> = self
            .messages
            .iter()
            .filter(|m| m.to == agent && m.day >= cutoff)
            .collect();
        found.sort_by(|x, y| y.day.cmp(&x.day));
        found.truncate(limit);
        found
    }

    /// Mark a message read.
    pub fn mark_read(&mut self, id: MessageId) {
        if let Some(message) = self.messages.iter_mut().find(|m| m.id == id) {
            if message.read_at.is_none() {
                message.read_at = Some(Utc::now());
            }
        }
    }

    /// All unexpired messages sent on or after `from_day`.
    ///
    /// The meeting matcher and the gang recruiter both scan recent traffic.
    pub fn recent(&self, from_day: u64) -> impl Iterator<Item = &CityMessage> {
        self.messages.iter().filter(move |m| m.day >= from_day)
    }

    /// Messages a named sender delivered to a recipient, unexpired.
    pub fn between(&self, from: AgentId, to: AgentId) -> Vec<&CityMessage> {
        self.messages
            .iter()
            .filter(|m| m.from == MessageSender::Agent(from) && m.to == to)
            .collect()
    }

    /// Messages first delivered on the given day (checkpoint delta).
    pub fn sent_on(&self, day: u64) -> Vec<&CityMessage> {
        self.messages.iter().filter(|m| m.day == day).collect()
    }

    /// Drop messages older than the TTL. Returns how many expired.
    pub fn expire(&mut self, day: u64) -> usize {
        let cutoff = day.saturating_sub(self.ttl_days);
        let before = self.messages.len();
        self.messages.retain(|m| m.day >= cutoff);
        let expired = before.saturating_sub(self.messages.len());
        if expired > 0 {
            debug!(day, expired, "expired messages swept");
        }
        expired
    }

    /// Number of live messages.
    pub const fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the bus holds no messages.
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn inbox_is_newest_first_and_bounded() {
        let mut bus = MessageBus::new();
        let sender = AgentId::new();
        let recipient = AgentId::new();
        for day in 1..=3 {
            let _ = bus.send(day, MessageSender::Agent(sender), recipient, format!("day {day}"));
        }
        let inbox = bus.inbox(recipient, 3, 5, 2);
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox.first().map(|m| m.day), Some(3));
    }

    #[test]
    fn messages_expire_after_ttl() {
        let mut bus = MessageBus::with_ttl(3);
        let recipient = AgentId::new();
        let _ = bus.send(1, MessageSender::Anon, recipient, "old note");
        let _ = bus.send(4, MessageSender::Anon, recipient, "fresh note");
        let expired = bus.expire(5);
        assert_eq!(expired, 1);
        assert_eq!(bus.len(), 1);
        assert!(bus.inbox(recipient, 5, 5, 10).iter().all(|m| m.day == 4));
    }

    #[test]
    fn anonymous_sender_preserved() {
        let mut bus = MessageBus::new();
        let recipient = AgentId::new();
        let _ = bus.send(1, MessageSender::Anon, recipient, "pay or the city hears");
        let inbox = bus.inbox(recipient, 1, 3, 10);
        assert_eq!(inbox.first().map(|m| m.from), Some(MessageSender::Anon));
    }

    #[test]
    fn between_filters_by_named_sender() {
        let mut bus = MessageBus::new();
        let a = AgentId::new();
        let b = AgentId::new();
        let _ = bus.send(1, MessageSender::Agent(a), b, "hello");
        let _ = bus.send(1, MessageSender::Anon, b, "psst");
        assert_eq!(bus.between(a, b).len(), 1);
    }

    #[test]
    fn mark_read_sets_timestamp_once() {
        let mut bus = MessageBus::new();
        let recipient = AgentId::new();
        let id = bus.send(1, MessageSender::Anon, recipient, "note");
        bus.mark_read(id);
        let first = bus.inbox(recipient, 1, 3, 1).first().and_then(|m| m.read_at);
        assert!(first.is_some());
        bus.mark_read(id);
        let second = bus.inbox(recipient, 1, 3, 1).first().and_then(|m| m.read_at);
        assert_eq!(first, second);
    }
}
