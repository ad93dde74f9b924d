//! Responses produced by command dispatch.
//!
//! Handlers return a value describing what the transport should do; they never
//! write to the connection or exit the process themselves.

use serde_json::Value as JsonValue;

/// What the HTTP layer should send back to the donor's browser.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayResponse {
    /// 303 redirect to the given URL.
    Redirect { url: String },

    /// 200 with a JSON body.
    Json { payload: JsonValue },
}

impl GatewayResponse {
    pub fn redirect(url: impl Into<String>) -> Self {
        GatewayResponse::Redirect { url: url.into() }
    }

    pub fn json(payload: JsonValue) -> Self {
        GatewayResponse::Json { payload }
    }
}
