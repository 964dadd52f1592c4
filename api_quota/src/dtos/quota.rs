use serde::Serialize;

#[derive(Serialize)]
pub struct CheckResponse {
    pub counter: String,
    pub allowed: bool,
}

#[derive(Serialize)]
pub struct PaymentStatusResponse {
    pub premium: bool,
}

#[derive(Serialize)]
pub struct WaitResponse {
    pub upgraded: bool,
}
