//! Route signatures for externally-triggered callback URLs.
//!
//! Secure route methods (browser returns, offsite confirmations) are reachable
//! without a session, so the URL itself must prove it was minted by us. The
//! signature is an HMAC-SHA256 over the canonical encoding of the route plus
//! an expiry; the nonce travels as a query parameter and is re-verified on
//! arrival.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::Timestamp;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the nonce on secure routes.
pub const SIGNATURE_PARAM: &str = "route-signature";

/// Route arguments as ordered pairs; ordering in the URL does not matter for
/// verification because the canonical form sorts them.
pub type RouteArgs = Vec<(String, String)>;

/// A computed signature for one gateway route invocation.
#[derive(Debug, Clone)]
pub struct RouteSignature {
    expires_at: i64,
    signature_hex: String,
}

impl RouteSignature {
    /// Signs a route. `expires_at` is `now + ttl`; two calls within the same
    /// second produce identical nonces.
    pub fn make(
        gateway_id: &str,
        method: &str,
        args: &RouteArgs,
        secret: &SecretString,
        now: Timestamp,
        ttl_secs: u64,
    ) -> Self {
        let expires_at = now.as_unix_secs() + ttl_secs as i64;
        let signature_hex = compute_hex(gateway_id, method, args, secret, expires_at);
        Self {
            expires_at,
            signature_hex,
        }
    }

    /// Serializes as `{expires_at}.{hex}` for the URL query string.
    pub fn to_nonce(&self) -> String {
        format!("{}.{}", self.expires_at, self.signature_hex)
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// Verifies a nonce received on a secure route.
    ///
    /// Rejects malformed nonces, expired signatures, and any mismatch between
    /// the signed route and the one being invoked. Comparison is constant
    /// time.
    pub fn verify(
        gateway_id: &str,
        method: &str,
        args: &RouteArgs,
        secret: &SecretString,
        nonce: &str,
        now: Timestamp,
    ) -> bool {
        let Some((expiry_part, hex_part)) = nonce.split_once('.') else {
            return false;
        };
        let Ok(expires_at) = expiry_part.parse::<i64>() else {
            return false;
        };
        if now.as_unix_secs() > expires_at {
            return false;
        }
        let expected = compute_hex(gateway_id, method, args, secret, expires_at);
        expected.as_bytes().ct_eq(hex_part.as_bytes()).into()
    }
}

/// Canonical form: `gateway_id|method|sorted-args-query-string|expires_at`.
/// The signature parameter itself is never part of the signed material.
fn canonical_string(gateway_id: &str, method: &str, args: &RouteArgs, expires_at: i64) -> String {
    let mut sorted: Vec<&(String, String)> = args
        .iter()
        .filter(|(key, _)| key != SIGNATURE_PARAM)
        .collect();
    sorted.sort();
    let query = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}|{}|{}|{}", gateway_id, method, query, expires_at)
}

fn compute_hex(
    gateway_id: &str,
    method: &str,
    args: &RouteArgs,
    secret: &SecretString,
    expires_at: i64,
) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(canonical_string(gateway_id, method, args, expires_at).as_bytes());
    let result = mac.finalize().into_bytes();
    result.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secret() -> SecretString {
        SecretString::new("0123456789abcdef0123456789abcdef".to_string())
    }

    fn args() -> RouteArgs {
        vec![
            ("donation-id".to_string(), "42".to_string()),
            ("purchase-key".to_string(), "abc123".to_string()),
        ]
    }

    #[test]
    fn valid_nonce_verifies() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let sig = RouteSignature::make("paypal", "handleSuccessPaymentReturn", &args(), &secret(), now, 3600);
        assert!(RouteSignature::verify(
            "paypal",
            "handleSuccessPaymentReturn",
            &args(),
            &secret(),
            &sig.to_nonce(),
            now,
        ));
    }

    #[test]
    fn argument_order_does_not_matter() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let sig = RouteSignature::make("paypal", "m", &args(), &secret(), now, 3600);
        let mut reversed = args();
        reversed.reverse();
        assert!(RouteSignature::verify("paypal", "m", &reversed, &secret(), &sig.to_nonce(), now));
    }

    #[test]
    fn tampered_argument_fails() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let sig = RouteSignature::make("paypal", "m", &args(), &secret(), now, 3600);
        let mut tampered = args();
        tampered[0].1 = "43".to_string();
        assert!(!RouteSignature::verify("paypal", "m", &tampered, &secret(), &sig.to_nonce(), now));
    }

    #[test]
    fn different_method_fails() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let sig = RouteSignature::make("paypal", "m", &args(), &secret(), now, 3600);
        assert!(!RouteSignature::verify("paypal", "other", &args(), &secret(), &sig.to_nonce(), now));
    }

    #[test]
    fn expired_nonce_fails() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let sig = RouteSignature::make("paypal", "m", &args(), &secret(), now, 3600);
        let later = Timestamp::from_unix_secs(1_700_000_000 + 3601);
        assert!(!RouteSignature::verify("paypal", "m", &args(), &secret(), &sig.to_nonce(), later));
    }

    #[test]
    fn forged_expiry_fails() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let sig = RouteSignature::make("paypal", "m", &args(), &secret(), now, 3600);
        // Push the expiry forward without re-signing.
        let hex = sig.to_nonce().split_once('.').unwrap().1.to_string();
        let forged = format!("{}.{}", sig.expires_at() + 86_400, hex);
        assert!(!RouteSignature::verify("paypal", "m", &args(), &secret(), &forged, now));
    }

    #[test]
    fn malformed_nonce_fails() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        assert!(!RouteSignature::verify("paypal", "m", &args(), &secret(), "garbage", now));
        assert!(!RouteSignature::verify("paypal", "m", &args(), &secret(), "123abc.zz", now));
    }

    #[test]
    fn signature_param_is_excluded_from_signed_material() {
        let now = Timestamp::from_unix_secs(1_700_000_000);
        let sig = RouteSignature::make("paypal", "m", &args(), &secret(), now, 3600);
        let mut with_param = args();
        with_param.push((SIGNATURE_PARAM.to_string(), sig.to_nonce()));
        assert!(RouteSignature::verify("paypal", "m", &with_param, &secret(), &sig.to_nonce(), now));
    }

    proptest! {
        #[test]
        fn random_nonces_never_verify(nonce in "[a-z0-9.]{1,64}") {
            let now = Timestamp::from_unix_secs(1_700_000_000);
            let valid = RouteSignature::make("paypal", "m", &args(), &secret(), now, 3600).to_nonce();
            prop_assume!(nonce != valid);
            prop_assert!(!RouteSignature::verify("paypal", "m", &args(), &secret(), &nonce, now));
        }

        #[test]
        fn signing_is_deterministic(
            gateway in "[a-z-]{1,16}",
            method in "[a-zA-Z]{1,24}",
            key in "[a-z-]{1,12}",
            value in "[a-zA-Z0-9]{0,12}",
        ) {
            let now = Timestamp::from_unix_secs(1_700_000_000);
            let args = vec![(key, value)];
            let a = RouteSignature::make(&gateway, &method, &args, &secret(), now, 60).to_nonce();
            let b = RouteSignature::make(&gateway, &method, &args, &secret(), now, 60).to_nonce();
            prop_assert_eq!(a, b);
        }
    }
}
