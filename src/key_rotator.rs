// src/key_rotator.rs

use crate::error::{AppError, Result};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument};

/// Round-robin selector over a fixed, non-empty set of API keys.
///
/// The set is immutable after construction. The only mutable state is the
/// rotation cursor, guarded by a single mutex that is held for the
/// read-advance-store step and nothing else.
pub struct KeyRotator {
    keys: Vec<SecretString>,
    cursor: Mutex<usize>,
}

impl std::fmt::Debug for KeyRotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRotator")
            .field("keys", &self.keys.len())
            .field("cursor", &*self.cursor.lock())
            .finish()
    }
}

impl KeyRotator {
    /// Builds a rotator starting at the first key.
    ///
    /// Fails with [`AppError::NoCredentials`] when `keys` is empty.
    #[instrument(skip(keys), name = "key_rotator_init")]
    pub fn new<I>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let keys: Vec<SecretString> = keys.into_iter().map(SecretString::new).collect();
        if keys.is_empty() {
            return Err(AppError::NoCredentials);
        }

        let previews: Vec<String> = keys.iter().map(Self::preview_key).collect();
        info!(key_count = keys.len(), keys = ?previews, "Key rotator initialized");

        Ok(Self {
            keys,
            cursor: Mutex::new(0),
        })
    }

    /// Returns the key at the cursor and advances the cursor by one,
    /// wrapping at the end of the set.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> &SecretString {
        let index = {
            let mut cursor = self.cursor.lock();
            let current = *cursor;
            *cursor = (current + 1) % self.keys.len();
            current
        };

        let key = &self.keys[index];
        debug!(
            event = "key_selected",
            api_key.preview = %Self::preview_key(key),
            key_index = index,
            total_keys = self.keys.len(),
            "API key selected for request"
        );
        key
    }

    /// Number of keys in rotation.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always `false`: a rotator cannot be built without keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Log-safe preview of a key: its first four characters followed by `...`.
    pub fn preview_key(key: &SecretString) -> String {
        let preview: String = key.expose_secret().chars().take(4).collect();
        format!("{preview}...")
    }
}
