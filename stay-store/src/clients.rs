use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use stay_core::payment::{PaymentAdapter, PaymentRequest, PaymentResponse};
use stay_core::validation::{ValidationClient, ValidationRequest, ValidationResponse};
use stay_core::{CoreError, CoreResult};
use stay_shared::baggage::BAGGAGE_HEADER;
use stay_shared::Baggage;
use tracing::{error, info};

/// JSON-over-HTTP call to one collaborating service.
#[derive(Clone)]
struct ServiceClient {
    service: &'static str,
    base_url: String,
    http: reqwest::Client,
}

impl ServiceClient {
    fn new(service: &'static str, base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req, baggage: &Baggage) -> CoreResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if !baggage.is_empty() {
            request = request.header(BAGGAGE_HEADER, baggage.as_str());
        }

        let response = request.send().await.map_err(|e| {
            error!(service = self.service, url = %url, error = %e, "Request failed");
            CoreError::Unavailable {
                service: self.service,
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| CoreError::Unavailable {
            service: self.service,
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            error!(service = self.service, status = status.as_u16(), body = %body, "Service returned error");
            return Err(CoreError::UnexpectedStatus {
                service: self.service,
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| CoreError::InvalidResponse {
            service: self.service,
            reason: e.to_string(),
        })
    }
}

/// Client for the booking-management service's `/validate` endpoint.
#[derive(Clone)]
pub struct HttpValidationClient {
    inner: ServiceClient,
}

impl HttpValidationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            inner: ServiceClient::new("booking-management", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl ValidationClient for HttpValidationClient {
    async fn validate_booking(
        &self,
        request: &ValidationRequest,
        baggage: &Baggage,
    ) -> CoreResult<ValidationResponse> {
        info!(room_id = %request.room_id, guests = request.number_of_guests, "Validating booking");
        let verdict: ValidationResponse = self.inner.post_json("/validate", request, baggage).await?;
        info!(is_valid = verdict.is_valid, reasons_count = verdict.reasons.len(), "Booking validation completed");
        Ok(verdict)
    }
}

/// Client for the payment service's `/process-payment` endpoint.
#[derive(Clone)]
pub struct HttpPaymentClient {
    inner: ServiceClient,
}

impl HttpPaymentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            inner: ServiceClient::new("payment", base_url, timeout)?,
        })
    }
}

#[async_trait]
impl PaymentAdapter for HttpPaymentClient {
    async fn process_payment(
        &self,
        request: &PaymentRequest,
        baggage: &Baggage,
    ) -> CoreResult<PaymentResponse> {
        info!(payment_id = %request.payment_id, card = %request.card_number, "Processing payment");
        let receipt: PaymentResponse = self.inner.post_json("/process-payment", request, baggage).await?;
        info!(payment_id = %request.payment_id, success = receipt.success, "Payment processed");
        Ok(receipt)
    }
}
