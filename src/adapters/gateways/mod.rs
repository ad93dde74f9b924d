//! Gateway adapter implementations.

mod paypal_standard;
mod test_gateway;

pub use paypal_standard::{PayPalStandardConfig, PayPalStandardGateway, PAYPAL_STANDARD_ID};
pub use test_gateway::{TestGatewayAdapter, TestSubscriptionModule, TEST_GATEWAY_ID};
