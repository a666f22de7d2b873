//! HttpConnector - partner delivery over plain HTTP with reqwest.
//!
//! One `reqwest::Client` is built per session, so a scheduler cycle reuses
//! connections across its steps and drops them when the cycle ends.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};

use crate::domain::{DeliveryError, ErrorKind};
use crate::ports::{DeliveryClient, DeliveryConnector, DeliveryRequest};

#[derive(Debug, Clone, Default)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn new() -> Self {
        Self
    }
}

impl DeliveryConnector for HttpConnector {
    fn connect(&self) -> Result<Box<dyn DeliveryClient>, DeliveryError> {
        let client = Client::builder().build()?;
        Ok(Box::new(HttpDelivery { client }))
    }
}

pub struct HttpDelivery {
    client: Client,
}

#[async_trait]
impl DeliveryClient for HttpDelivery {
    async fn send(&self, request: &DeliveryRequest) -> Result<u16, DeliveryError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            DeliveryError::new(ErrorKind::Other, format!("{}: {e}", request.method))
        })?;
        let response = self
            .client
            .request(method, &request.url)
            .header(CONTENT_TYPE, "application/json")
            .body(request.body.clone())
            .timeout(request.timeout)
            .send()
            .await?;
        let status = response.status().as_u16();
        tracing::debug!(url = %request.url, status, "partner answered");
        Ok(status)
    }
}
