//! Delivery port - the outbound HTTP call to a partner.
//!
//! A `DeliveryClient` is one session: the scheduler opens one per cycle
//! through a [`DeliveryConnector`] and shares it across that cycle's steps.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::{DeliveryError, ProcessingStep};

/// What gets sent for one processing step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub method: String,
    pub url: String,
    pub body: String,
    pub timeout: Duration,
}

impl DeliveryRequest {
    pub fn for_step(step: &ProcessingStep, timeout: Duration) -> Self {
        Self {
            method: step.target.method.clone(),
            url: step.target.endpoint(),
            body: step.data.clone(),
            timeout,
        }
    }
}

#[async_trait]
pub trait DeliveryClient: Send + Sync {
    /// Send the request and return the partner's HTTP status.
    ///
    /// Any status, success or not, is `Ok`; only transport failures
    /// (timeout, refused connection, ...) are `Err`.
    async fn send(&self, request: &DeliveryRequest) -> Result<u16, DeliveryError>;
}

/// Opens delivery sessions.
pub trait DeliveryConnector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn DeliveryClient>, DeliveryError>;
}
