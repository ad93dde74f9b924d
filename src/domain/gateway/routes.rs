//! Gateway callback URL construction.
//!
//! Callback URLs have the shape `<base>/gateway/<gateway-id>/<method>?<args>`;
//! the secure variant appends a `route-signature` nonce.

use secrecy::SecretString;

use crate::domain::foundation::Timestamp;

use super::route_signature::{RouteArgs, RouteSignature, SIGNATURE_PARAM};

/// Builds plain and signed callback URLs for one gateway.
#[derive(Clone)]
pub struct RouteUrlBuilder {
    base_url: String,
    gateway_id: String,
    secret: SecretString,
    signature_ttl_secs: u64,
}

impl RouteUrlBuilder {
    pub fn new(
        base_url: impl Into<String>,
        gateway_id: impl Into<String>,
        secret: SecretString,
        signature_ttl_secs: u64,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            gateway_id: gateway_id.into(),
            secret,
            signature_ttl_secs,
        }
    }

    pub fn gateway_id(&self) -> &str {
        &self.gateway_id
    }

    /// URL for a plain route method (e.g. webhook notifications, where the
    /// provider authenticates the payload itself).
    pub fn route_url(&self, method: &str, args: &RouteArgs) -> String {
        self.build(method, args.clone())
    }

    /// URL for a secure route method; embeds a signature nonce.
    pub fn secure_route_url(&self, method: &str, args: &RouteArgs, now: Timestamp) -> String {
        let signature = RouteSignature::make(
            &self.gateway_id,
            method,
            args,
            &self.secret,
            now,
            self.signature_ttl_secs,
        );
        let mut signed_args = args.clone();
        signed_args.push((SIGNATURE_PARAM.to_string(), signature.to_nonce()));
        self.build(method, signed_args)
    }

    fn build(&self, method: &str, args: RouteArgs) -> String {
        let mut url = format!("{}/gateway/{}/{}", self.base_url, self.gateway_id, method);
        if !args.is_empty() {
            let query = args
                .iter()
                .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
                .collect::<Vec<_>>()
                .join("&");
            url.push('?');
            url.push_str(&query);
        }
        url
    }
}

/// Minimal query-component percent encoding (RFC 3986 unreserved set).
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
