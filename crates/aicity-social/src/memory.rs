//! The memory store contract and its in-memory implementation.
//!
//! Memory is opaque to the core simulation: the decision facade stores
//! recollections and pulls top-k recalls for prompts, and nothing else
//! reads it. The contract makes no ordering guarantees across operations,
//! so a vector database or an external service can stand in for the
//! keyword implementation without touching core logic.

use std::collections::BTreeMap;

use aicity_types::AgentId;

/// A stored recollection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryNote {
    /// The day the memory was formed.
    pub day: u64,
    /// Category ("observation", "action", "partial", ...).
    pub kind: String,
    /// The recollection text.
    pub content: String,
}

/// The memory store contract.
///
/// `remember`/`recall` cover per-agent private memory; `publish_city`/
/// `query_city` cover shared city knowledge.
pub trait MemoryStore {
    /// Store a private recollection for an agent.
    fn remember(&mut self, agent: AgentId, day: u64, kind: &str, content: &str);

    /// The `k` recollections most relevant to the query, best first.
    fn recall(&self, agent: AgentId, query: &str, k: usize) -> Vec<String>;

    /// Publish a piece of shared city knowledge.
    fn publish_city(&mut self, day: u64, kind: &str, content: &str);

    /// The `k` pieces of city knowledge most relevant to the query.
    fn query_city(&self, query: &str, k: usize) -> Vec<String>;
}

/// Keyword-scoring in-memory implementation.
///
/// Relevance is the count of shared lowercase words between query and
/// content, with recency as the tiebreaker.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    private: BTreeMap<AgentId, Vec<MemoryNote>>,
    city: Vec<MemoryNote>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self {
            private: BTreeMap::new(),
            city: Vec::new(),
        }
    }

    /// Score then take the best `k` notes.
    fn rank(notes: &[MemoryNote], query: &str, k: usize) -> Vec<String> {
        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        let mut scored: Vec<(usize, u64, &MemoryNote)> = notes
            .iter()
            .map(|note| {
                let lower = note.content.to_lowercase();
                let hits = query_words.iter().filter(|w| lower.contains(*w)).count();
                (hits, note.day, note)
            })
            .filter(|(hits, _, _)| *hits > 0 || query.is_empty())
            .collect();
        scored.sort_by(|x, y| (y.0, y.1).cmp(&(x.0, x.1)));
        scored
            .into_iter()
            .take(k)
            .map(|(_, _, note)| note.content.clone())
            .collect()
    }
}

impl MemoryStore for InMemoryStore {
    fn remember(&mut self, agent: AgentId, day: u64, kind: &str, content: &str) {
        self.private.entry(agent).or_default().push(MemoryNote {
            day,
            kind: kind.to_owned(),
            content: content.to_owned(),
        });
    }

    fn recall(&self, agent: AgentId, query: &str, k: usize) -> Vec<String> {
        self.private
            .get(&agent)
            .map(|notes| Self::rank(notes, query, k))
            .unwrap_or_default()
    }

    fn publish_city(&mut self, day: u64, kind: &str, content: &str) {
        self.city.push(MemoryNote {
            day,
            kind: kind.to_owned(),
            content: content.to_owned(),
        });
    }

    fn query_city(&self, query: &str, k: usize) -> Vec<String> {
        Self::rank(&self.city, query, k)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn recall_ranks_by_keyword_overlap() {
        let mut store = InMemoryStore::new();
        let agent = AgentId::new();
        store.remember(agent, 1, "observation", "saw a theft at the market");
        store.remember(agent, 2, "action", "repaired the road");
        let recalls = store.recall(agent, "theft market", 1);
        assert_eq!(recalls.len(), 1);
        assert!(recalls.first().unwrap().contains("theft"));
    }

    #[test]
    fn recall_prefers_recent_on_tie() {
        let mut store = InMemoryStore::new();
        let agent = AgentId::new();
        store.remember(agent, 1, "observation", "theft near the well");
        store.remember(agent, 5, "observation", "theft near the gate");
        let recalls = store.recall(agent, "theft", 1);
        assert!(recalls.first().unwrap().contains("gate"));
    }

    #[test]
    fn agents_cannot_read_each_other() {
        let mut store = InMemoryStore::new();
        let a = AgentId::new();
        let b = AgentId::new();
        store.remember(a, 1, "observation", "a private suspicion");
        assert!(store.recall(b, "suspicion", 5).is_empty());
    }

    #[test]
    fn city_knowledge_is_shared() {
        let mut store = InMemoryStore::new();
        store.publish_city(1, "newspaper", "the hospital opened today");
        let found = store.query_city("hospital", 3);
        assert_eq!(found.len(), 1);
    }
}
