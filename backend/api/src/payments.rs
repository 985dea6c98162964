//! Card payment gateway client.
//!
//! Creates a charge authorization ("payment intent") and hands its client
//! secret back to the browser, which confirms the card payment directly with
//! the gateway. Requests are never retried: a failure surfaces to the caller
//! as an upstream error.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use fundraiser_core::Money;

use crate::config::PaymentConfig;
use crate::errors::{ApiError, Result};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Context attached to the charge so it can be reconciled with the ledger.
#[derive(Debug, Clone, Default)]
pub struct IntentMetadata {
    pub fundraiser_id: Option<String>,
    pub donor_name: Option<String>,
    pub donor_email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: Option<String>,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayError,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    message: Option<String>,
}

#[derive(Clone)]
pub struct PaymentGateway {
    client: Client,
    api_url: String,
    secret_key: Option<String>,
    currency: String,
}

impl PaymentGateway {
    pub fn new(cfg: &PaymentConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(PaymentGateway {
            client,
            api_url: cfg.api_url.trim_end_matches('/').to_string(),
            secret_key: cfg.secret_key.clone(),
            currency: cfg.currency.clone(),
        })
    }

    /// `POST {api_url}/v1/payment_intents` and return the client secret.
    pub async fn create_intent(&self, amount: Money, metadata: &IntentMetadata) -> Result<String> {
        let Some(key) = self.secret_key.as_deref() else {
            warn!("Payment intent requested but no gateway key is configured");
            return Err(ApiError::Upstream("Payment initialization failed".to_string()));
        };

        let mut form = vec![
            ("amount".to_string(), amount.cents().to_string()),
            ("currency".to_string(), self.currency.clone()),
        ];
        let fields = [
            ("fundraiserId", &metadata.fundraiser_id),
            ("donorName", &metadata.donor_name),
            ("donorEmail", &metadata.donor_email),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                form.push((format!("metadata[{name}]"), value.clone()));
            }
        }

        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_url))
            .bearer_auth(key)
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                warn!("Payment gateway unreachable: {e}");
                ApiError::Upstream("Payment initialization failed".to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<GatewayErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_default();
            warn!(%status, detail = %detail, "Payment gateway rejected intent");
            return Err(ApiError::Upstream("Payment initialization failed".to_string()));
        }

        let body: IntentResponse = resp.json().await?;
        let secret = body.client_secret.ok_or_else(|| {
            ApiError::Upstream("Payment gateway returned no client secret".to_string())
        })?;
        info!(
            intent_id = body.id.as_deref().unwrap_or("?"),
            amount = %amount,
            fundraiser_id = metadata.fundraiser_id.as_deref().unwrap_or("-"),
            "Created payment intent"
        );
        Ok(secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use std::collections::HashMap;

    async fn fake_gateway() -> String {
        async fn intents(
            headers: HeaderMap,
            Form(form): Form<HashMap<String, String>>,
        ) -> (StatusCode, Json<serde_json::Value>) {
            let authorized = headers
                .get("authorization")
                .and_then(|h| h.to_str().ok())
                == Some("Bearer sk_test");
            if !authorized {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({ "error": { "message": "bad key" } })),
                );
            }
            let secret = format!(
                "pi_secret_{}_{}_{}",
                form["amount"],
                form["currency"],
                form.get("metadata[fundraiserId]").cloned().unwrap_or_default()
            );
            (
                StatusCode::OK,
                Json(serde_json::json!({ "id": "pi_1", "client_secret": secret })),
            )
        }

        let app = Router::new().route("/v1/payment_intents", post(intents));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn gateway(api_url: String, key: Option<&str>) -> PaymentGateway {
        PaymentGateway::new(&PaymentConfig {
            api_url,
            secret_key: key.map(str::to_string),
            currency: "usd".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn returns_client_secret_for_amount_in_cents() {
        let gw = gateway(fake_gateway().await, Some("sk_test"));
        let meta = IntentMetadata {
            fundraiser_id: Some("f1".to_string()),
            ..Default::default()
        };
        let secret = gw.create_intent(Money::from_cents(5_000), &meta).await.unwrap();
        assert_eq!(secret, "pi_secret_5000_usd_f1");
    }

    #[tokio::test]
    async fn gateway_rejection_is_upstream_error() {
        let gw = gateway(fake_gateway().await, Some("wrong"));
        let err = gw
            .create_intent(Money::from_cents(100), &IntentMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_out() {
        let gw = gateway("http://127.0.0.1:9".to_string(), None);
        let err = gw
            .create_intent(Money::from_cents(100), &IntentMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }
}
