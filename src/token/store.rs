use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveToken {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

impl ActiveToken {
    pub fn new(username: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            username: username.to_owned(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// The set of tokens the server currently honours.
pub trait TokenStore: Send + Sync {
    fn insert(&self, token: String, entry: ActiveToken);

    fn remove(&self, token: &str) -> Option<ActiveToken>;

    fn contains(&self, token: &str) -> bool;

    /// Drops every entry that expired before `now`, returning how many went.
    fn purge_expired(&self, now: DateTime<Utc>) -> usize;

    /// All entries, soonest expiry first.
    fn snapshot(&self) -> Vec<(String, ActiveToken)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, ActiveToken>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// A panic while holding the guard cannot leave the map half-updated, so
// poisoned locks are recovered rather than propagated.
impl TokenStore for MemoryTokenStore {
    fn insert(&self, token: String, entry: ActiveToken) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, entry);
    }

    fn remove(&self, token: &str) -> Option<ActiveToken> {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token)
    }

    fn contains(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(token)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let before = tokens.len();

        tokens.retain(|_, entry| !entry.is_expired(now));

        before - tokens.len()
    }

    fn snapshot(&self) -> Vec<(String, ActiveToken)> {
        let mut entries: Vec<_> = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(token, entry)| (token.clone(), entry.clone()))
            .collect();

        entries.sort_by(|a, b| a.1.expires_at.cmp(&b.1.expires_at).then(a.0.cmp(&b.0)));
        entries
    }

    fn len(&self) -> usize {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn clear(&self) {
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn removing_absent_token_is_a_no_op() {
        let store = MemoryTokenStore::new();
        store.insert("a".into(), ActiveToken::new("alice", Utc::now()));

        assert_eq!(store.remove("missing"), None);
        assert_eq!(store.len(), 1);
        assert!(store.contains("a"));
    }

    #[test]
    fn purge_removes_exactly_the_expired_entries() {
        let now = Utc::now();
        let store = MemoryTokenStore::new();
        store.insert("old".into(), ActiveToken::new("alice", now - Duration::seconds(5)));
        store.insert("older".into(), ActiveToken::new("bob", now - Duration::minutes(5)));
        store.insert("edge".into(), ActiveToken::new("carol", now));
        store.insert("fresh".into(), ActiveToken::new("alice", now + Duration::minutes(5)));

        assert_eq!(store.purge_expired(now), 2);
        assert_eq!(store.purge_expired(now), 0);

        let remaining: Vec<String> = store.snapshot().into_iter().map(|(token, _)| token).collect();
        assert_eq!(remaining, vec!["edge".to_string(), "fresh".to_string()]);
    }

    #[test]
    fn clones_share_the_same_registry() {
        let store = MemoryTokenStore::new();
        let other = store.clone();

        other.insert("a".into(), ActiveToken::new("alice", Utc::now()));
        assert!(store.contains("a"));

        store.clear();
        assert!(other.is_empty());
    }
}
