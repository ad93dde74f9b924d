//! Purchase key generation.
//!
//! The purchase key is an opaque per-donation token printed on receipts and
//! echoed through gateway return URLs. It carries no structure; only equality
//! matters.

use uuid::Uuid;

/// Generates a fresh purchase key: 32 lowercase hex characters.
pub fn generate_purchase_key() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_32_hex_chars() {
        let key = generate_purchase_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn keys_are_unique() {
        assert_ne!(generate_purchase_key(), generate_purchase_key());
    }
}
