use portal_core::utils::signature::sign_payload;
use portal_service::config::{Config, DatabaseConfig, RazorpayConfig, ServerConfig};
use portal_service::services::store::memory::InMemoryStore;
use portal_service::services::Store;
use portal_service::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_ADMIN_ID: &str = "admin-user";
pub const TEST_STAFF_ID: &str = "staff-user";
pub const TEST_WEBHOOK_SECRET: &str = "test_webhook_secret";

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryStore>,
    pub gateway: MockServer,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let gateway = MockServer::start().await;
        let store = Arc::new(InMemoryStore::new());

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: Secret::new("postgres://unused".to_string()),
                max_connections: 1,
                min_connections: 1,
            },
            razorpay: RazorpayConfig {
                key_id: "rzp_test_key".to_string(),
                key_secret: Secret::new("test_key_secret".to_string()),
                webhook_secret: Secret::new(TEST_WEBHOOK_SECRET.to_string()),
                api_base_url: gateway.uri(),
                timeout_secs: 5,
            },
            service_name: "portal-service-test".to_string(),
        };

        let shared: Arc<dyn Store> = store.clone();
        let app = Application::with_store(config, shared)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to come up by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            store,
            gateway,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Attach admin identity headers.
    pub fn as_admin(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        rb.header("X-Actor-Id", TEST_ADMIN_ID)
            .header("X-Actor-Role", "company_admin")
    }

    /// Attach staff identity headers.
    pub fn as_staff(&self, rb: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        rb.header("X-Actor-Id", TEST_STAFF_ID)
            .header("X-Actor-Role", "company_staff")
    }

    /// Attach client-role identity headers for the given client.
    pub fn as_client(&self, rb: reqwest::RequestBuilder, client_id: &str) -> reqwest::RequestBuilder {
        rb.header("X-Actor-Id", format!("user-of-{}", client_id))
            .header("X-Actor-Role", "client")
            .header("X-Client-Id", client_id)
    }

    /// Create a client via the API, returning its JSON representation.
    pub async fn seed_client(&self, name: &str) -> Value {
        let response = self
            .as_admin(self.client.post(self.url("/clients")))
            .json(&json!({ "name": name }))
            .send()
            .await
            .expect("Failed to create client");
        assert_eq!(response.status(), 201, "seed_client failed");
        response.json().await.expect("Invalid client JSON")
    }

    /// Create a two-line invoice for a client, returning its JSON
    /// representation (subtotal 2000, tax 180, total 2180).
    pub async fn seed_invoice(&self, client_id: &str) -> Value {
        let response = self
            .as_admin(self.client.post(self.url("/invoices")))
            .json(&json!({
                "client_id": client_id,
                "lines": [
                    { "description": "Development retainer", "quantity": 2, "unit_price": 500, "tax_rate": 18 },
                    { "description": "Hosting", "quantity": 1, "unit_price": 1000 }
                ]
            }))
            .send()
            .await
            .expect("Failed to create invoice");
        assert_eq!(response.status(), 201, "seed_invoice failed");
        response.json().await.expect("Invalid invoice JSON")
    }

    /// Mount a successful order-creation stub on the gateway mock.
    pub async fn mock_gateway_order(&self, order_id: &str) {
        Mock::given(method("POST"))
            .and(path("/orders"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": order_id,
                "entity": "order",
                "amount": 218000,
                "amount_paid": 0,
                "amount_due": 218000,
                "currency": "INR",
                "receipt": null,
                "status": "created",
                "attempts": 0,
                "created_at": 1754500000
            })))
            .mount(&self.gateway)
            .await;
    }

    /// Initiate payment for an invoice as the owning client, returning the
    /// pay response JSON.
    pub async fn initiate_payment(&self, invoice_id: &str, client_id: &str) -> Value {
        let response = self
            .as_client(
                self.client
                    .post(self.url(&format!("/invoices/{}/pay", invoice_id))),
                client_id,
            )
            .send()
            .await
            .expect("Failed to initiate payment");
        assert_eq!(response.status(), 200, "initiate_payment failed");
        response.json().await.expect("Invalid pay JSON")
    }

    /// Sign a webhook body the way the gateway does.
    pub fn sign_webhook(&self, body: &str) -> String {
        sign_payload(TEST_WEBHOOK_SECRET, body.as_bytes()).expect("Failed to sign body")
    }

    /// Deliver a webhook body with the given signature header.
    pub async fn deliver_webhook(&self, body: &str, signature: &str) -> reqwest::Response {
        self.client
            .post(self.url("/webhooks/razorpay"))
            .header("X-Razorpay-Signature", signature)
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .expect("Failed to deliver webhook")
    }

    /// Fetch an invoice's detail view as admin.
    pub async fn get_invoice(&self, invoice_id: &str) -> Value {
        let response = self
            .as_admin(
                self.client
                    .get(self.url(&format!("/invoices/{}", invoice_id))),
            )
            .send()
            .await
            .expect("Failed to get invoice");
        assert_eq!(response.status(), 200, "get_invoice failed");
        response.json().await.expect("Invalid invoice JSON")
    }
}

/// Build a signed `payment.captured` webhook body.
pub fn captured_event(order_id: &str, payment_id: &str, amount_minor: u64) -> String {
    json!({
        "entity": "event",
        "event": "payment.captured",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "entity": "payment",
                    "amount": amount_minor,
                    "currency": "INR",
                    "status": "captured",
                    "order_id": order_id
                }
            }
        },
        "created_at": 1754500000
    })
    .to_string()
}

/// Build a `payment.failed` webhook body.
pub fn failed_event(order_id: &str, payment_id: &str) -> String {
    json!({
        "entity": "event",
        "event": "payment.failed",
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "entity": "payment",
                    "amount": 218000,
                    "currency": "INR",
                    "status": "failed",
                    "order_id": order_id
                }
            }
        },
        "created_at": 1754500100
    })
    .to_string()
}

/// Build a `refund.created` webhook body.
pub fn refund_event(payment_id: &str) -> String {
    json!({
        "entity": "event",
        "event": "refund.created",
        "payload": {
            "refund": {
                "entity": {
                    "id": "rfnd_test_1",
                    "payment_id": payment_id,
                    "amount": 218000
                }
            }
        },
        "created_at": 1754500200
    })
    .to_string()
}
