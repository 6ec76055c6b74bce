//! Payment capture and refund against the external gateway, plus the
//! per-category financial rules that drive the provider/platform fee split.

pub mod client;
pub mod handlers;

pub use client::{CaptureRequest, GatewayCharge, PaymentClient};
