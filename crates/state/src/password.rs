//! Admin password generation.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of a generated admin password.
pub const GENERATED_PASSWORD_LEN: usize = 16;

/// Generate an alphanumeric password from a cryptographically secure RNG.
///
/// Called at most once per deployment: the result is stored in
/// [`crate::PersistentState`] and never regenerated.
pub fn generate_password(len: usize) -> String {
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
    fn test_generated_length() {
        assert_eq!(generate_password(GENERATED_PASSWORD_LEN).len(), 16);
        assert_eq!(generate_password(32).len(), 32);
    }

    #[test]
    fn test_generated_charset_is_alphanumeric() {
        let password = generate_password(64);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_passwords_differ() {
        // Collisions on 16 alphanumeric chars are vanishingly unlikely.
        assert_ne!(generate_password(16), generate_password(16));
    }
}
