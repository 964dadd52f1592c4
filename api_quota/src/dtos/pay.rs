use common::razorpay::PaymentNotes;
use serde::{Deserialize, Serialize};

/// Webhook envelope delivered by the payment gateway:
/// `{ event, payload: { payment: { id, status, notes: { uid, session } } } }`
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub payment: WebhookPayment,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookPayment {
    pub id: String,
    pub status: String,
    pub notes: PaymentNotes,
}
