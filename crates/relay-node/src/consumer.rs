//! Customer lookup: answers `SimpleRequest` with the customer's name.

use crate::messages::{SimpleRequest, SimpleResponse};
use async_trait::async_trait;
use relay_request::{ProcessingError, RequestProcessor};
use tracing::info;

/// Stateless customer-name lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerLookup;

#[async_trait]
impl RequestProcessor for CustomerLookup {
    type Request = SimpleRequest;
    type Response = SimpleResponse;

    async fn process(&self, request: SimpleRequest) -> Result<SimpleResponse, ProcessingError> {
        info!("Returning name for {}", request.customer_id);

        Ok(SimpleResponse {
            customer_name: format!("Customer Number {}", request.customer_id),
        })
    }
}
