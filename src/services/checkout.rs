use crate::{
    config::AppConfig,
    entities::ProductModel,
    errors::ServiceError,
    events::{Event, EventSender},
    services::orders::OrderDetails,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

/// One line entry of a hosted-checkout session request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionLineItem {
    /// Unit price in minor currency units (cents).
    pub unit_amount: i64,
    pub currency: String,
    pub name: String,
    pub description: String,
    /// Absolute image URL; only populated for guest checkout.
    pub image_url: Option<String>,
    pub quantity: i64,
}

/// A fully assembled session request, ready for the provider client.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<SessionLineItem>,
    /// One-shot payment, not a subscription.
    pub mode: String,
    pub success_url: String,
    pub cancel_url: String,
    pub customer_email: Option<String>,
}

/// Checkout service: translates validated (product, quantity) pairs into a
/// hosted-checkout session and returns the provider's redirect URL.
#[derive(Clone)]
pub struct CheckoutService {
    client: PaymentClient,
    currency: String,
    success_url: String,
    cancel_url: String,
    public_base_url: String,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    /// The provider secret key arrives here via configuration; it is never
    /// read from process-wide state.
    pub fn new(config: &AppConfig, event_sender: Arc<EventSender>) -> Self {
        Self {
            client: PaymentClient::new(
                config.payment_secret_key.clone(),
                config.payment_api_base.clone(),
            ),
            currency: config.checkout_currency.clone(),
            success_url: config.checkout_success_url.clone(),
            cancel_url: config.checkout_cancel_url.clone(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            event_sender,
        }
    }

    /// Assemble a session request from (product, quantity) pairs. Pure with
    /// respect to I/O so the numeric and URL contracts are testable.
    pub fn build_session(
        &self,
        lines: &[(ProductModel, i32)],
        customer_email: Option<String>,
        include_images: bool,
    ) -> Result<CheckoutSessionRequest, ServiceError> {
        let mut line_items = Vec::with_capacity(lines.len());

        for (product, quantity) in lines {
            let image_url = if include_images {
                product
                    .image_id
                    .map(|id| format!("{}/api/v1/file/{}", self.public_base_url, id))
            } else {
                None
            };

            line_items.push(SessionLineItem {
                unit_amount: to_minor_units(product.price)?,
                currency: self.currency.clone(),
                name: product.name.clone(),
                description: product.description.clone(),
                image_url,
                quantity: i64::from(*quantity),
            });
        }

        Ok(CheckoutSessionRequest {
            line_items,
            mode: "payment".to_string(),
            success_url: self.success_url.clone(),
            cancel_url: self.cancel_url.clone(),
            customer_email,
        })
    }

    /// Hosted-checkout session for a persisted order (authenticated path).
    /// The session carries the customer's email; no image URLs.
    #[instrument(skip(self, details), fields(order_id = %details.order.id))]
    pub async fn session_for_order(
        &self,
        details: &OrderDetails,
        customer_email: String,
    ) -> Result<String, ServiceError> {
        let lines: Vec<(ProductModel, i32)> = details
            .lines
            .iter()
            .map(|line| (line.product.clone(), line.item.quantity))
            .collect();

        let request = self.build_session(&lines, Some(customer_email), false)?;
        let url = self.client.create_session(&request).await?;

        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                order_id: Some(details.order.id),
                line_count: request.line_items.len(),
            })
            .await;

        info!("created checkout session for order {}", details.order.id);
        Ok(url)
    }

    /// Hosted-checkout session straight from a client-side cart (guest
    /// path). Nothing is persisted; line items carry absolute image URLs.
    #[instrument(skip(self, resolved), fields(lines = resolved.len()))]
    pub async fn session_for_cart(
        &self,
        resolved: &[(ProductModel, i32)],
    ) -> Result<String, ServiceError> {
        let request = self.build_session(resolved, None, true)?;
        let url = self.client.create_session(&request).await?;

        self.event_sender
            .send_or_log(Event::CheckoutSessionCreated {
                order_id: None,
                line_count: request.line_items.len(),
            })
            .await;

        Ok(url)
    }
}

/// Convert a major-unit price to provider minor units: price x 100, rounded.
fn to_minor_units(price: Decimal) -> Result<i64, ServiceError> {
    (price * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| ServiceError::validation("price", "price out of range for checkout"))
}

/// Minimal client for the provider's hosted-checkout session endpoint.
/// Requests are form-encoded and bearer-authenticated with the secret key.
#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl PaymentClient {
    pub fn new(secret_key: String, api_base: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Create a hosted-checkout session and return its redirect URL. The URL
    /// is treated as an opaque string.
    pub async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<String, ServiceError> {
        let params = encode_session_form(request);

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(e.to_string()))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::PaymentProviderError(e.to_string()))?;

        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("session creation rejected");
            return Err(ServiceError::PaymentProviderError(format!(
                "{}: {}",
                status, message
            )));
        }

        body.get("url")
            .and_then(|u| u.as_str())
            .map(str::to_string)
            .ok_or_else(|| {
                ServiceError::PaymentProviderError("response missing session url".to_string())
            })
    }
}

/// Flatten a session request into the provider's indexed form-field scheme.
fn encode_session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("mode".to_string(), request.mode.clone()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    if let Some(ref email) = request.customer_email {
        params.push(("customer_email".to_string(), email.clone()));
    }

    for (i, line) in request.line_items.iter().enumerate() {
        let prefix = format!("line_items[{}]", i);
        params.push((
            format!("{}[price_data][currency]", prefix),
            line.currency.clone(),
        ));
        params.push((
            format!("{}[price_data][unit_amount]", prefix),
            line.unit_amount.to_string(),
        ));
        params.push((
            format!("{}[price_data][product_data][name]", prefix),
            line.name.clone(),
        ));
        params.push((
            format!("{}[price_data][product_data][description]", prefix),
            line.description.clone(),
        ));
        if let Some(ref image) = line.image_url {
            params.push((
                format!("{}[price_data][product_data][images][0]", prefix),
                image.clone(),
            ));
        }
        params.push((format!("{}[quantity]", prefix), line.quantity.to_string()));
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn test_service() -> CheckoutService {
        let mut config = AppConfig::new(
            "sqlite::memory:",
            "test_secret_key_for_testing_purposes_only_32chars",
            "127.0.0.1",
            18_080,
            "development",
        );
        config.public_base_url = "https://shop.example.com".to_string();
        let (tx, _rx) = mpsc::channel(8);
        CheckoutService::new(&config, Arc::new(EventSender::new(tx)))
    }

    fn product(name: &str, price: Decimal, image_id: Option<Uuid>) -> ProductModel {
        ProductModel {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: format!("{} description", name),
            price,
            in_stock: true,
            image_id,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unit_amount_is_price_times_hundred_rounded() {
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1999);
        assert_eq!(to_minor_units(dec!(0.00)).unwrap(), 0);
        assert_eq!(to_minor_units(dec!(10)).unwrap(), 1000);
        assert_eq!(to_minor_units(dec!(1.005)).unwrap(), 100);
        assert_eq!(to_minor_units(dec!(1.015)).unwrap(), 102);
    }

    #[test]
    fn session_line_matches_cart_quantity_and_currency() {
        let service = test_service();
        let lines = vec![(product("Keyboard", dec!(19.99), None), 2)];

        let request = service.build_session(&lines, None, false).unwrap();
        assert_eq!(request.line_items.len(), 1);

        let line = &request.line_items[0];
        assert_eq!(line.unit_amount, 1999);
        assert_eq!(line.currency, "eur");
        assert_eq!(line.quantity, 2);
        assert_eq!(line.name, "Keyboard");
        assert!(line.image_url.is_none());
    }

    #[test]
    fn guest_session_carries_absolute_image_urls() {
        let service = test_service();
        let image_id = Uuid::new_v4();
        let lines = vec![(product("Mug", dec!(7.50), Some(image_id)), 1)];

        let request = service.build_session(&lines, None, true).unwrap();
        assert_eq!(
            request.line_items[0].image_url.as_deref(),
            Some(format!("https://shop.example.com/api/v1/file/{}", image_id).as_str())
        );
    }

    #[test]
    fn authenticated_session_sets_customer_email_only() {
        let service = test_service();
        let lines = vec![(product("Mug", dec!(7.50), Some(Uuid::new_v4())), 1)];

        let request = service
            .build_session(&lines, Some("buyer@example.com".to_string()), false)
            .unwrap();
        assert_eq!(request.customer_email.as_deref(), Some("buyer@example.com"));
        assert!(request.line_items[0].image_url.is_none());
        assert_eq!(request.mode, "payment");
    }

    #[test]
    fn empty_cart_builds_empty_session() {
        let service = test_service();
        let request = service.build_session(&[], None, true).unwrap();
        assert!(request.line_items.is_empty());
    }

    #[test]
    fn form_encoding_uses_indexed_fields() {
        let service = test_service();
        let lines = vec![
            (product("A", dec!(1.00), None), 1),
            (product("B", dec!(2.00), None), 3),
        ];
        let request = service
            .build_session(&lines, Some("x@example.com".to_string()), false)
            .unwrap();

        let params = encode_session_form(&request);
        let find = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(find("mode"), Some("payment"));
        assert_eq!(find("customer_email"), Some("x@example.com"));
        assert_eq!(find("line_items[0][price_data][unit_amount]"), Some("100"));
        assert_eq!(find("line_items[1][price_data][unit_amount]"), Some("200"));
        assert_eq!(find("line_items[1][quantity]"), Some("3"));
    }
}
