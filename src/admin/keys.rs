//! API key generation.

use rand::{distributions::Alphanumeric, Rng};

/// Length of generated keys. 43 alphanumeric characters carry a little
/// over 256 bits of entropy.
pub const API_KEY_LENGTH: usize = 43;

/// Generate a random alphanumeric key of `len` characters.
pub fn generate_key(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_have_requested_length_and_alphabet() {
        let key = generate_key(API_KEY_LENGTH);
        assert_eq!(key.len(), API_KEY_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn keys_differ() {
        assert_ne!(generate_key(API_KEY_LENGTH), generate_key(API_KEY_LENGTH));
    }
}
