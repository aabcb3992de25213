use std::collections::HashMap;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

/// RFC 7636 bounds on the code verifier length.
pub const MIN_VERIFIER_LEN: usize = 43;
pub const MAX_VERIFIER_LEN: usize = 128;

/// Verifier length used for every login attempt.
const VERIFIER_LEN: usize = 64;

/// How long a pending login may wait for its callback.
const PENDING_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
#[error("verifier length {0} outside the allowed {MIN_VERIFIER_LEN}..={MAX_VERIFIER_LEN} range")]
pub struct InvalidVerifierLength(pub usize);

/// A PKCE verifier and its S256 challenge. The verifier stays server-side
/// until token exchange; only the challenge crosses the browser channel.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh pair: 64 alphanumeric chars from the thread-local
    /// CSPRNG, challenge derived per S256.
    pub fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(VERIFIER_LEN)
            .map(char::from)
            .collect();
        let challenge = challenge_for(&verifier);
        PkcePair {
            verifier,
            challenge,
        }
    }

    /// Generate a pair with a caller-chosen verifier length, rejecting
    /// anything outside the RFC 7636 range.
    pub fn with_length(len: usize) -> Result<Self, InvalidVerifierLength> {
        if !(MIN_VERIFIER_LEN..=MAX_VERIFIER_LEN).contains(&len) {
            return Err(InvalidVerifierLength(len));
        }
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(char::from)
            .collect();
        let challenge = challenge_for(&verifier);
        Ok(PkcePair {
            verifier,
            challenge,
        })
    }
}

/// `base64url(SHA256(verifier))`, padding stripped. Deterministic.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

struct PendingLogin {
    verifier: String,
    created_at: Instant,
}

/// In-flight login attempts, keyed by the one-time `state` nonce that the
/// provider echoes back on the callback. One verifier per attempt; entries
/// are removed on first take and expire after [`PENDING_TTL`].
pub struct PendingLogins {
    inner: Mutex<HashMap<String, PendingLogin>>,
}

impl PendingLogins {
    pub fn new() -> Self {
        PendingLogins {
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Park the verifier of a new attempt and return the nonce to embed
    /// in the authorize URL. Expired entries are swept on the way in.
    pub async fn begin(&self, pair: &PkcePair) -> String {
        let state_bytes: Vec<u8> = {
            let mut rng = rand::thread_rng();
            (0..48).map(|_| rng.gen::<u8>()).collect()
        };
        let state = URL_SAFE_NO_PAD.encode(&state_bytes);

        let mut guard = self.inner.lock().await;
        guard.retain(|_, p| p.created_at.elapsed() < PENDING_TTL);
        guard.insert(
            state.clone(),
            PendingLogin {
                verifier: pair.verifier.clone(),
                created_at: Instant::now(),
            },
        );
        state
    }

    /// One-shot lookup: returns the parked verifier and forgets it, or
    /// `None` for an unknown, already-used, or expired nonce.
    pub async fn take(&self, state: &str) -> Option<String> {
        let pending = self.inner.lock().await.remove(state)?;
        if pending.created_at.elapsed() >= PENDING_TTL {
            return None;
        }
        Some(pending.verifier)
    }
}

impl Default for PendingLogins {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 7636 appendix B vector.
    #[test]
    fn challenge_matches_reference_vector() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn challenge_is_deterministic() {
        let pair = PkcePair::generate();
        assert_eq!(challenge_for(&pair.verifier), pair.challenge);
        assert_eq!(challenge_for(&pair.verifier), challenge_for(&pair.verifier));
    }

    #[test]
    fn verifier_is_64_alphanumeric_chars() {
        let pair = PkcePair::generate();
        assert_eq!(pair.verifier.len(), 64);
        assert!(pair.verifier.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn challenge_is_base64url_without_padding() {
        for _ in 0..32 {
            let pair = PkcePair::generate();
            assert!(!pair.challenge.contains('+'));
            assert!(!pair.challenge.contains('/'));
            assert!(!pair.challenge.contains('='));
        }
    }

    #[test]
    fn verifier_length_bounds_are_enforced() {
        assert!(PkcePair::with_length(42).is_err());
        assert!(PkcePair::with_length(129).is_err());
        assert_eq!(PkcePair::with_length(43).unwrap().verifier.len(), 43);
        assert_eq!(PkcePair::with_length(128).unwrap().verifier.len(), 128);
    }

    #[tokio::test]
    async fn pending_login_is_one_shot() {
        let pending = PendingLogins::new();
        let pair = PkcePair::generate();
        let state = pending.begin(&pair).await;

        assert_eq!(pending.take(&state).await.as_deref(), Some(pair.verifier.as_str()));
        assert_eq!(pending.take(&state).await, None);
    }

    #[tokio::test]
    async fn unknown_state_yields_nothing() {
        let pending = PendingLogins::new();
        assert_eq!(pending.take("never-issued").await, None);
    }

    #[tokio::test]
    async fn concurrent_attempts_get_distinct_pairs() {
        let pending = PendingLogins::new();
        let first = PkcePair::generate();
        let second = PkcePair::generate();
        assert_ne!(first.verifier, second.verifier);

        let s1 = pending.begin(&first).await;
        let s2 = pending.begin(&second).await;
        assert_ne!(s1, s2);

        assert_eq!(pending.take(&s2).await, Some(second.verifier));
        assert_eq!(pending.take(&s1).await, Some(first.verifier));
    }
}
