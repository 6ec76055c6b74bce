use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{AppError, PaymentError};

/// Charge capture request sent to the payment gateway.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureRequest {
    pub amount: Decimal,
    pub currency: String,
    /// Our booking id, echoed back by the gateway for reconciliation.
    pub reference: Uuid,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct GatewayCharge {
    pub id: String,
    pub status: String,
}

/// Thin client for the payment gateway's REST API. Authenticated with an
/// `X-Api-Key` header; non-2xx responses surface the gateway's status and
/// body verbatim.
pub struct PaymentClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl PaymentClient {
    pub fn new(base_url: &str, api_key: String) -> Result<Self, AppError> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| AppError::ConfigError(format!("invalid payments base_url: {}", e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentError> {
        self.base_url
            .join(path)
            .map_err(|e| PaymentError::InvalidResponse(format!("invalid gateway url: {}", e)))
    }

    pub async fn capture(&self, request: &CaptureRequest) -> Result<GatewayCharge, PaymentError> {
        let resp = self
            .http
            .post(self.endpoint("v1/charges")?)
            .header("X-Api-Key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(PaymentError::Gateway {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<GatewayCharge>(&body)
            .map_err(|e| PaymentError::InvalidResponse(format!("{}; body={}", e, body)))
    }

    pub async fn refund(&self, charge_id: &str) -> Result<(), PaymentError> {
        let resp = self
            .http
            .post(self.endpoint(&format!("v1/charges/{}/refund", charge_id))?)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(PaymentError::Gateway {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_base_url() {
        assert!(PaymentClient::new("not a url", "key".to_string()).is_err());
        assert!(PaymentClient::new("https://pay.example.com/api", "key".to_string()).is_ok());
    }

    #[test]
    fn test_endpoint_joins_with_base_path() {
        let client = PaymentClient::new("https://pay.example.com/api", "key".to_string()).unwrap();
        assert_eq!(
            client.endpoint("v1/charges").unwrap().as_str(),
            "https://pay.example.com/api/v1/charges"
        );
    }
}
