use crate::billing::plans::{Plan, PRODUCT_NAME};
use crate::error::AppError;
use axum::http::StatusCode;
use serde::Deserialize;

/// Minimal Stripe REST client covering what the subscription handlers
/// need: customers, subscriptions, and payment intents. Bodies are
/// form-encoded per the Stripe API convention.
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoice {
    #[serde(default)]
    pub payment_intent: Option<StripePaymentIntent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub latest_invoice: Option<StripeInvoice>,
}

impl StripeSubscription {
    /// Client secret of the expanded latest invoice's payment intent, used
    /// by the frontend to confirm the payment
    pub fn client_secret(&self) -> Option<&str> {
        self.latest_invoice
            .as_ref()
            .and_then(|invoice| invoice.payment_intent.as_ref())
            .and_then(|intent| intent.client_secret.as_deref())
    }

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Error shape returned by the Stripe API
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    /// Create a customer carrying our user id in metadata
    pub async fn create_customer(
        &self,
        email: Option<&str>,
        user_id: &str,
    ) -> Result<StripeCustomer, AppError> {
        let mut params = vec![("metadata[user_id]", user_id.to_string())];
        if let Some(email) = email {
            params.push(("email", email.to_string()));
        }

        self.post_form("/v1/customers", &params).await
    }

    /// Create an incomplete subscription with inline price data; the
    /// returned client secret drives payment confirmation on the client.
    pub async fn create_subscription(
        &self,
        customer_id: &str,
        plan: Plan,
    ) -> Result<StripeSubscription, AppError> {
        let interval = plan.recurring_interval().ok_or_else(|| {
            AppError::InvalidRequest(format!(
                "Plan '{}' is a one-time purchase, not a subscription",
                plan.as_str()
            ))
        })?;

        let params = vec![
            ("customer", customer_id.to_string()),
            ("items[0][price_data][currency]", "usd".to_string()),
            (
                "items[0][price_data][product_data][name]",
                PRODUCT_NAME.to_string(),
            ),
            (
                "items[0][price_data][unit_amount]",
                plan.unit_amount_cents().to_string(),
            ),
            (
                "items[0][price_data][recurring][interval]",
                interval.to_string(),
            ),
            ("payment_behavior", "default_incomplete".to_string()),
            ("expand[0]", "latest_invoice.payment_intent".to_string()),
        ];

        self.post_form("/v1/subscriptions", &params).await
    }

    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, AppError> {
        let url = format!(
            "{}/v1/subscriptions/{}?expand[0]=latest_invoice.payment_intent",
            self.api_base, subscription_id
        );
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// One-time charge for the lifetime plan
    pub async fn create_payment_intent(
        &self,
        customer_id: &str,
        plan: Plan,
        user_id: &str,
    ) -> Result<StripePaymentIntent, AppError> {
        let params = vec![
            ("amount", plan.unit_amount_cents().to_string()),
            ("currency", "usd".to_string()),
            ("customer", customer_id.to_string()),
            ("metadata[user_id]", user_id.to_string()),
            ("metadata[plan]", plan.as_str().to_string()),
            (
                "description",
                format!("{} - Lifetime Access", PRODUCT_NAME),
            ),
        ];

        self.post_form("/v1/payment_intents", &params).await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
            .form(params)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Success bodies deserialize into the target type; failures surface
    /// as a payment error carrying Stripe's status and message unchanged.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let status_code =
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let message = match response.json::<StripeErrorBody>().await {
            Ok(body) => body
                .error
                .message
                .unwrap_or_else(|| "Payment provider error".to_string()),
            Err(_) => "Payment provider error".to_string(),
        };

        tracing::warn!(status = %status, message = %message, "Stripe request failed");
        Err(AppError::PaymentError {
            status: status_code,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> StripeClient {
        StripeClient::new("sk_test_123".to_string(), server.uri())
    }

    #[tokio::test]
    async fn test_create_customer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("maker%40example.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "cus_123",
                "object": "customer",
            })))
            .mount(&server)
            .await;

        let customer = client_for(&server)
            .await
            .create_customer(Some("maker@example.com"), "user-1")
            .await
            .unwrap();
        assert_eq!(customer.id, "cus_123");
    }

    #[tokio::test]
    async fn test_create_subscription_sends_incomplete_behavior() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/subscriptions"))
            .and(body_string_contains("payment_behavior=default_incomplete"))
            .and(body_string_contains("unit_amount"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "sub_123",
                "status": "incomplete",
                "latest_invoice": {
                    "payment_intent": {
                        "id": "pi_123",
                        "client_secret": "pi_123_secret",
                    }
                }
            })))
            .mount(&server)
            .await;

        let subscription = client_for(&server)
            .await
            .create_subscription("cus_123", Plan::Monthly)
            .await
            .unwrap();
        assert_eq!(subscription.id, "sub_123");
        assert!(!subscription.is_active());
        assert_eq!(subscription.client_secret(), Some("pi_123_secret"));
    }

    #[tokio::test]
    async fn test_lifetime_plan_is_not_a_subscription() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .await
            .create_subscription("cus_123", Plan::Lifetime)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_payment_intent_amount() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(body_string_contains("amount=2999"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pi_456",
                "client_secret": "pi_456_secret",
            })))
            .mount(&server)
            .await;

        let intent = client_for(&server)
            .await
            .create_payment_intent("cus_123", Plan::Lifetime, "user-1")
            .await
            .unwrap();
        assert_eq!(intent.client_secret.as_deref(), Some("pi_456_secret"));
    }

    #[tokio::test]
    async fn test_provider_error_passes_status_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/customers"))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": { "message": "Your card was declined." }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .create_customer(None, "user-1")
            .await
            .unwrap_err();
        match err {
            AppError::PaymentError { status, message } => {
                assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
                assert_eq!(message, "Your card was declined.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
