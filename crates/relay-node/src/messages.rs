//! Messages exchanged by the customer-lookup demo.

use serde::{Deserialize, Serialize};
use shared_types::{now_millis, Message};

/// Ask for the display name of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleRequest {
    pub customer_id: String,
    /// When the request was created (unix millis).
    pub timestamp: u64,
}

impl SimpleRequest {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            timestamp: now_millis(),
        }
    }
}

impl Message for SimpleRequest {
    const MESSAGE_TYPE: &'static str = "urn:message:relay:SimpleRequest";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleResponse {
    pub customer_name: String,
}

impl Message for SimpleResponse {
    const MESSAGE_TYPE: &'static str = "urn:message:relay:SimpleResponse";
}
