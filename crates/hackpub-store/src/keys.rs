//! Key allocation for published documents.
//!
//! Keys are short, lowercase base-36 strings, safe to use as a URL path
//! segment without escaping.

use std::collections::VecDeque;

use rand::Rng;

use crate::error::{StoreError, StoreResult};

/// Characters a random key is drawn from.
const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of keys produced by [`KeyAllocator::default`].
pub const DEFAULT_KEY_LEN: usize = 5;

/// Number of random draws before giving up on finding an unused key.
const MAX_ATTEMPTS: usize = 64;

/// Source of fresh document keys.
///
/// The allocator only proposes candidates; the store decides whether a
/// candidate is taken while holding its write lock, which is what keeps
/// allocation unique under concurrent `create` calls.
#[derive(Clone, Debug)]
pub enum KeyAllocator {
    /// Random keys of a fixed length, redrawn on collision.
    Random { len: usize },
    /// A fixed list of keys handed out front to back.
    Sequence(VecDeque<String>),
}

impl KeyAllocator {
    /// Random keys of `len` characters.
    pub fn random(len: usize) -> Self {
        Self::Random { len: len.max(1) }
    }

    /// Hand out exactly `keys`, in order. Useful for deterministic tests.
    pub fn sequence<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Sequence(keys.into_iter().map(Into::into).collect())
    }

    /// Produce a key for which `is_taken` returns `false`.
    pub fn allocate(&mut self, is_taken: impl Fn(&str) -> bool) -> StoreResult<String> {
        match self {
            Self::Random { len } => {
                let mut rng = rand::thread_rng();
                for _ in 0..MAX_ATTEMPTS {
                    let candidate: String = (0..*len)
                        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                        .collect();
                    if !is_taken(&candidate) {
                        return Ok(candidate);
                    }
                }
                Err(StoreError::KeyCollision(MAX_ATTEMPTS))
            }
            Self::Sequence(keys) => {
                while let Some(candidate) = keys.pop_front() {
                    if !is_taken(&candidate) {
                        return Ok(candidate);
                    }
                    tracing::warn!(key = %candidate, "skipping key already in use");
                }
                Err(StoreError::KeysExhausted)
            }
        }
    }
}

impl Default for KeyAllocator {
    fn default() -> Self {
        Self::random(DEFAULT_KEY_LEN)
    }
}
