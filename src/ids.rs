use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

/// Length of generated delete keys.
pub const DELETE_KEY_LENGTH: usize = 40;

/// Source of candidate paste ids.
///
/// Candidates are not guaranteed to be free; the store's uniqueness
/// constraint decides that.
pub trait IdGenerator: Send + Sync {
    fn generate(&self, length: usize) -> String;
}

/// Random alphanumeric ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn generate(&self, length: usize) -> String {
        random_alphanumeric(length)
    }
}

/// Generate a fresh delete key.
pub fn generate_delete_key() -> String {
    random_alphanumeric(DELETE_KEY_LENGTH)
}

fn random_alphanumeric(length: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_have_requested_length_and_are_url_safe() {
        for length in [1, 6, 12] {
            let id = RandomIds.generate(length);
            assert_eq!(id.len(), length);
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn delete_keys_are_long_and_distinct() {
        let a = generate_delete_key();
        let b = generate_delete_key();
        assert_eq!(a.len(), DELETE_KEY_LENGTH);
        assert_ne!(a, b);
    }
}
