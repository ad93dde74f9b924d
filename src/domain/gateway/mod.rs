//! Gateway module - Command protocol, route signatures, and the orchestrator
//! that ties adapters to the repositories.

mod command;
mod errors;
pub mod handlers;
mod payment_data;
mod payment_gateway;
mod response;
mod route_signature;
mod routes;

pub use command::GatewayCommand;
pub use errors::GatewayError;
pub use payment_data::{GatewayPaymentData, GatewaySubscriptionData};
pub use payment_gateway::{PaymentGateway, DONOR_SAFE_ERROR_MESSAGE};
pub use response::GatewayResponse;
pub use route_signature::{RouteArgs, RouteSignature, SIGNATURE_PARAM};
pub use routes::RouteUrlBuilder;
