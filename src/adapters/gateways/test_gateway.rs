//! Scriptable gateway adapter for tests.
//!
//! Tests queue the commands or errors the adapter should return; calls are
//! recorded for assertions. An optional subscription module shares the same
//! script queue.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::domain::gateway::{
    GatewayCommand, GatewayError, GatewayPaymentData, GatewayResponse, GatewaySubscriptionData,
};
use crate::ports::{GatewayAdapter, GatewayRouteContext, RouteMethodArgs, SubscriptionModule};

pub const TEST_GATEWAY_ID: &str = "test-gateway";

#[derive(Default)]
struct Script {
    responses: Mutex<VecDeque<Result<GatewayCommand, GatewayError>>>,
    calls: Mutex<Vec<String>>,
}

impl Script {
    fn record(&self, call: impl Into<String>) {
        self.calls
            .lock()
            .expect("TestGatewayAdapter: calls lock poisoned")
            .push(call.into());
    }

    fn next(&self) -> Result<GatewayCommand, GatewayError> {
        self.responses
            .lock()
            .expect("TestGatewayAdapter: responses lock poisoned")
            .pop_front()
            .unwrap_or(Ok(GatewayCommand::PaymentComplete {
                transaction_id: "test-transaction".to_string(),
            }))
    }
}

/// A gateway adapter whose behavior is scripted by the test.
pub struct TestGatewayAdapter {
    script: Arc<Script>,
    subscription_module: Option<TestSubscriptionModule>,
}

impl TestGatewayAdapter {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Script::default()),
            subscription_module: None,
        }
    }

    /// Attaches a subscription module sharing the same script queue.
    pub fn with_subscriptions(mut self) -> Self {
        self.subscription_module = Some(TestSubscriptionModule {
            script: Arc::clone(&self.script),
        });
        self
    }

    /// Queues the command the next call should return.
    pub fn queue_command(&self, command: GatewayCommand) {
        self.script
            .responses
            .lock()
            .expect("TestGatewayAdapter: responses lock poisoned")
            .push_back(Ok(command));
    }

    /// Queues an error for the next call.
    pub fn queue_error(&self, error: GatewayError) {
        self.script
            .responses
            .lock()
            .expect("TestGatewayAdapter: responses lock poisoned")
            .push_back(Err(error));
    }

    /// Returns the recorded call log.
    pub fn calls(&self) -> Vec<String> {
        self.script
            .calls
            .lock()
            .expect("TestGatewayAdapter: calls lock poisoned")
            .clone()
    }
}

impl Default for TestGatewayAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayAdapter for TestGatewayAdapter {
    fn id(&self) -> &str {
        TEST_GATEWAY_ID
    }

    fn name(&self) -> &str {
        "Test Gateway"
    }

    fn payment_method_label(&self) -> &str {
        "Test Payment"
    }

    async fn create_payment(
        &self,
        payment_data: &GatewayPaymentData,
    ) -> Result<GatewayCommand, GatewayError> {
        self.script.record(format!(
            "create_payment:{}",
            payment_data.donation.id.as_i64()
        ));
        self.script.next()
    }

    fn subscription_module(&self) -> Option<&dyn SubscriptionModule> {
        self.subscription_module
            .as_ref()
            .map(|m| m as &dyn SubscriptionModule)
    }

    fn route_methods(&self) -> Vec<&'static str> {
        vec!["handleNotification"]
    }

    fn secure_route_methods(&self) -> Vec<&'static str> {
        vec!["handleReturn"]
    }

    async fn handle_route_method(
        &self,
        _ctx: &GatewayRouteContext,
        method: &str,
        args: &RouteMethodArgs,
    ) -> Result<GatewayResponse, GatewayError> {
        self.script.record(format!("route:{}", method));
        if args.get("fail").map(String::as_str) == Some("1") {
            return Err(GatewayError::provider(TEST_GATEWAY_ID, "scripted failure"));
        }
        Ok(GatewayResponse::json(json!({ "method": method })))
    }
}

/// Subscription half of the test gateway.
pub struct TestSubscriptionModule {
    script: Arc<Script>,
}

#[async_trait]
impl SubscriptionModule for TestSubscriptionModule {
    async fn create_subscription(
        &self,
        payment_data: &GatewayPaymentData,
        subscription_data: &GatewaySubscriptionData,
    ) -> Result<GatewayCommand, GatewayError> {
        self.script.record(format!(
            "create_subscription:{}:{}",
            payment_data.donation.id.as_i64(),
            subscription_data.subscription.id.as_i64()
        ));
        self.script.next()
    }
}
