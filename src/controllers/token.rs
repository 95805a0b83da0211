use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::instrument;

use crate::token::TokenError;
use crate::token::clock::{Clock, SystemClock};
use crate::token::signer::{Payload, TokenSigner};
use crate::token::store::{ActiveToken, MemoryTokenStore, TokenStore};
use crate::types::Username;
use crate::types::response::TokenPreview;

const PREVIEW_LENGTH: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues, validates and revokes bearer tokens.
///
/// A token is honoured only while its signature verifies, its encoded expiry
/// lies in the future and it is still present in the store. Once a token fails
/// the last two checks it never passes them again; an expired token is dropped
/// from the store as soon as it is seen.
#[derive(Clone, Debug)]
pub struct TokenController<T: TokenStore = MemoryTokenStore> {
    token_store: T,
    signer: TokenSigner,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<T: TokenStore> TokenController<T> {
    pub fn new(token_store: T, signer: TokenSigner, ttl: Duration) -> Self {
        Self {
            token_store,
            signer,
            ttl,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The caller must already have checked the user's password.
    #[instrument(skip(self))]
    pub fn issue(&self, username: &str) -> IssuedToken {
        let payload = Payload::new(username, self.clock.now(), self.ttl);
        let token = self.signer.encode(&payload);

        self.token_store
            .insert(token.clone(), ActiveToken::new(username, payload.expires_at));

        tracing::debug!(expires_at = %payload.expires_at, "issued token");

        IssuedToken {
            token,
            expires_at: payload.expires_at,
        }
    }

    #[instrument(skip_all)]
    pub fn validate(&self, token: &str) -> Result<Username, TokenError> {
        let result = self.check(token);

        if let Err(e) = &result {
            tracing::debug!(reason = %e, "rejected token");
        }

        result
    }

    fn check(&self, token: &str) -> Result<Username, TokenError> {
        let payload = self.signer.decode(token)?;

        if self.clock.now() > payload.expires_at {
            self.token_store.remove(token);
            return Err(TokenError::Expired);
        }

        if !self.token_store.contains(token) {
            return Err(TokenError::Revoked);
        }

        Ok(payload.username)
    }

    /// Returns whether the token was active.
    #[instrument(skip_all)]
    pub fn revoke(&self, token: &str) -> bool {
        let removed = self.token_store.remove(token);

        if let Some(entry) = &removed {
            tracing::debug!(username = %entry.username, "revoked token");
        }

        removed.is_some()
    }

    #[instrument(skip_all)]
    pub fn purge_expired(&self) -> usize {
        let purged = self.token_store.purge_expired(self.clock.now());

        if purged > 0 {
            tracing::info!(purged, "purged expired tokens");
        }

        purged
    }

    /// Purges expired entries, then lists the remaining ones with their token
    /// values cut down to a short preview.
    pub fn active_tokens(&self) -> Vec<TokenPreview> {
        self.purge_expired();

        self.token_store
            .snapshot()
            .into_iter()
            .map(|(token, entry)| TokenPreview {
                username: entry.username,
                expires_at: entry.expires_at,
                token_preview: preview(&token),
            })
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.token_store.len()
    }

    pub fn clear(&self) {
        self.token_store.clear();
    }
}

fn preview(token: &str) -> String {
    let head: String = token.chars().take(PREVIEW_LENGTH).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::clock::ManualClock;
    use crate::token::signer::SEPARATOR;

    fn controller() -> (TokenController, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let controller = TokenController::new(
            MemoryTokenStore::new(),
            TokenSigner::new("test-secret").unwrap(),
            Duration::minutes(30),
        )
        .with_clock(Arc::new(clock.clone()));

        (controller, clock)
    }

    fn mutate_byte(token: &str, index: usize) -> String {
        let mut bytes = token.as_bytes().to_vec();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn issued_token_validates_to_its_username() {
        let (tokens, _) = controller();

        for username in ["student", "teacher", "alice"] {
            let issued = tokens.issue(username);
            assert_eq!(tokens.validate(&issued.token).as_deref(), Ok(username));
        }

        assert_eq!(tokens.active_count(), 3);
    }

    #[test]
    fn issued_token_expires_after_ttl() {
        let (tokens, clock) = controller();
        let issued = tokens.issue("alice");

        assert_eq!(issued.expires_at - clock.now(), Duration::minutes(30));
    }

    #[test]
    fn any_signature_mutation_is_a_bad_signature() {
        let (tokens, _) = controller();
        let issued = tokens.issue("alice");
        let separator = issued.token.rfind(SEPARATOR).unwrap();

        for index in separator + 1..issued.token.len() {
            let tampered = mutate_byte(&issued.token, index);
            assert_eq!(
                tokens.validate(&tampered),
                Err(TokenError::BadSignature),
                "signature byte {index}"
            );
        }
    }

    #[test]
    fn any_payload_mutation_is_a_bad_signature() {
        let (tokens, _) = controller();
        let issued = tokens.issue("alice");
        let separator = issued.token.rfind(SEPARATOR).unwrap();

        for index in 0..separator {
            let tampered = mutate_byte(&issued.token, index);
            assert_eq!(
                tokens.validate(&tampered),
                Err(TokenError::BadSignature),
                "payload byte {index}"
            );
        }
    }

    #[test]
    fn token_past_its_ttl_is_expired() {
        let (tokens, clock) = controller();
        let issued = tokens.issue("alice");

        clock.advance(Duration::minutes(30));
        assert_eq!(tokens.validate(&issued.token).as_deref(), Ok("alice"));

        clock.advance(Duration::seconds(1));
        assert_eq!(tokens.validate(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn validating_expired_tokens_drops_them_from_the_registry() {
        let (tokens, clock) = controller();
        let issued: Vec<_> = (0..1000).map(|_| tokens.issue("alice")).collect();
        clock.advance(Duration::minutes(10));
        let live = tokens.issue("bob");
        clock.advance(Duration::minutes(25));

        for token in &issued {
            assert_eq!(tokens.validate(&token.token), Err(TokenError::Expired));
        }

        assert_eq!(tokens.active_count(), 1);
        assert_eq!(tokens.validate(&live.token).as_deref(), Ok("bob"));
        assert_eq!(tokens.purge_expired(), 0);
    }

    #[test]
    fn huge_ttl_does_not_panic_on_issue() {
        let tokens = TokenController::new(
            MemoryTokenStore::new(),
            TokenSigner::new("test-secret").unwrap(),
            Duration::MAX,
        );

        let issued = tokens.issue("alice");

        assert_eq!(issued.expires_at, DateTime::<Utc>::MAX_UTC);
        assert_eq!(tokens.active_count(), 1);
    }

    #[test]
    fn token_expires_in_real_time() {
        let tokens = TokenController::new(
            MemoryTokenStore::new(),
            TokenSigner::new("test-secret").unwrap(),
            Duration::seconds(1),
        );
        let issued = tokens.issue("alice");

        assert_eq!(tokens.validate(&issued.token).as_deref(), Ok("alice"));

        std::thread::sleep(std::time::Duration::from_secs(2));

        assert_eq!(tokens.validate(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn revoked_token_is_rejected() {
        let (tokens, _) = controller();
        let issued = tokens.issue("alice");

        assert!(tokens.revoke(&issued.token));
        assert_eq!(tokens.validate(&issued.token), Err(TokenError::Revoked));
        assert!(!tokens.revoke(&issued.token));
    }

    #[test]
    fn revoking_unknown_token_changes_nothing() {
        let (tokens, _) = controller();
        tokens.issue("alice");

        assert!(!tokens.revoke("never-issued"));
        assert!(!tokens.revoke(""));
        assert_eq!(tokens.active_count(), 1);
    }

    #[test]
    fn revocation_is_per_token() {
        let (tokens, _) = controller();
        let first = tokens.issue("alice");
        let second = tokens.issue("alice");

        assert_ne!(first.token, second.token);

        tokens.revoke(&first.token);

        assert_eq!(tokens.validate(&first.token), Err(TokenError::Revoked));
        assert_eq!(tokens.validate(&second.token).as_deref(), Ok("alice"));
    }

    #[test]
    fn token_from_another_server_is_not_active() {
        let (tokens, _) = controller();
        let (other, _) = controller();
        let foreign = other.issue("alice");

        // same secret, different registry
        assert_eq!(tokens.validate(&foreign.token), Err(TokenError::Revoked));
    }

    #[test]
    fn purge_removes_only_expired_tokens() {
        let (tokens, clock) = controller();
        let old = tokens.issue("alice");
        clock.advance(Duration::minutes(20));
        let fresh = tokens.issue("bob");
        clock.advance(Duration::minutes(11));

        assert_eq!(tokens.purge_expired(), 1);
        assert_eq!(tokens.purge_expired(), 0);

        assert_eq!(tokens.active_count(), 1);
        assert_eq!(tokens.validate(&fresh.token).as_deref(), Ok("bob"));
        assert_eq!(tokens.validate(&old.token), Err(TokenError::Expired));
    }

    #[test]
    fn expired_token_stays_dead_after_purge() {
        let (tokens, clock) = controller();
        let start = clock.now();
        let issued = tokens.issue("alice");

        clock.advance(Duration::hours(1));
        tokens.purge_expired();

        clock.set(start);
        assert_eq!(tokens.validate(&issued.token), Err(TokenError::Revoked));
    }

    #[test]
    fn active_tokens_show_previews_only() {
        let (tokens, clock) = controller();
        let stale = tokens.issue("alice");
        clock.advance(Duration::minutes(31));
        let issued = tokens.issue("teacher");

        let listed = tokens.active_tokens();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].username, "teacher");
        assert_eq!(listed[0].expires_at, issued.expires_at);
        assert_eq!(listed[0].token_preview, format!("{}...", &issued.token[..20]));
        assert!(!listed[0].token_preview.contains(&issued.token));
        assert_eq!(tokens.validate(&stale.token), Err(TokenError::Expired));
    }
}
