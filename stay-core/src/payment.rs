use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use stay_shared::{Baggage, CardNumber};

use crate::CoreResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_id: String,
    pub card_number: CardNumber,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

#[async_trait]
pub trait PaymentAdapter: Send + Sync {
    /// Charge the card. `Ok` with `success == false` is a decline, `Err` means
    /// the payment service could not be reached.
    async fn process_payment(
        &self,
        request: &PaymentRequest,
        baggage: &Baggage,
    ) -> CoreResult<PaymentResponse>;
}
