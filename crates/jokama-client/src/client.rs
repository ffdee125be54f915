//! # Sales API Client
//!
//! The [`SalesApi`] trait is the terminal's only view of the backend;
//! [`HttpSalesApi`] implements it with reqwest.
//!
//! ## Request Policy
//! - One attempt per call; no retry, no backoff
//! - Request timeout and connect timeout from configuration
//! - Non-2xx bodies are mined for an `error` message before falling back
//!   to the status line

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use jokama_core::{Part, Receipt, SaleId};

use crate::error::{ClientError, ClientResult};
use crate::protocol::{CheckoutRequest, CheckoutResponse, ErrorBody};

/// Backend base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

// =============================================================================
// SalesApi Trait
// =============================================================================

/// Operations the terminal needs from the shop backend.
#[async_trait]
pub trait SalesApi: Send + Sync {
    /// `GET /parts`
    async fn list_parts(&self) -> ClientResult<Vec<Part>>;

    /// `POST /sales/checkout`; returns the persisted sale id.
    async fn checkout(&self, request: &CheckoutRequest) -> ClientResult<SaleId>;

    /// `GET /sales/receipt/{id}`
    async fn fetch_receipt(&self, sale_id: SaleId) -> ClientResult<Receipt>;
}

// =============================================================================
// Client Settings
// =============================================================================

/// Connection settings for [`HttpSalesApi`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// reqwest-backed Sales API client.
#[derive(Debug, Clone)]
pub struct HttpSalesApi {
    http: Client,
    base_url: Url,
}

impl HttpSalesApi {
    /// Builds the client.
    ///
    /// ## Errors
    /// `InvalidUrl` for an unparseable base URL, `InvalidConfig` when the
    /// URL is not http(s) or the HTTP client cannot be built.
    pub fn new(settings: &ClientSettings) -> ClientResult<Self> {
        let base_url = normalize_base_url(&settings.base_url)?;

        let http = Client::builder()
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Ok(HttpSalesApi { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl SalesApi for HttpSalesApi {
    async fn list_parts(&self) -> ClientResult<Vec<Part>> {
        let url = self.endpoint("parts")?;
        debug!(%url, "Fetching parts catalog");

        let response = self.http.get(url).send().await?;
        let parts: Vec<Part> = read_json(response).await?;

        debug!(count = parts.len(), "Parts catalog received");
        Ok(parts)
    }

    async fn checkout(&self, request: &CheckoutRequest) -> ClientResult<SaleId> {
        let url = self.endpoint("sales/checkout")?;
        info!(
            lines = request.cart.len(),
            total = %request.total_amount,
            payment_method = %request.payment_method,
            "Submitting sale"
        );

        let response = self.http.post(url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<CheckoutResponse>(&body) {
            Ok(CheckoutResponse {
                success: true,
                sale_id: Some(sale_id),
                ..
            }) if status.is_success() => {
                info!(%sale_id, "Sale persisted");
                Ok(sale_id)
            }
            Ok(CheckoutResponse {
                success: true,
                sale_id: None,
                ..
            }) if status.is_success() => {
                Err(ClientError::Decode("checkout succeeded without a saleId".to_string()))
            }
            Ok(parsed) => {
                let message = parsed
                    .error
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| status_line(status));
                warn!(status = status.as_u16(), %message, "Checkout refused");
                if status.is_success() {
                    Err(ClientError::Rejected(message))
                } else {
                    Err(ClientError::Server {
                        status: status.as_u16(),
                        message,
                    })
                }
            }
            Err(_) if !status.is_success() => {
                let message = server_message(status, &body);
                warn!(status = status.as_u16(), %message, "Checkout failed");
                Err(ClientError::Server {
                    status: status.as_u16(),
                    message,
                })
            }
            Err(e) => Err(ClientError::Decode(e.to_string())),
        }
    }

    async fn fetch_receipt(&self, sale_id: SaleId) -> ClientResult<Receipt> {
        let url = self.endpoint(&format!("sales/receipt/{}", sale_id))?;
        debug!(%sale_id, "Fetching receipt");

        let response = self.http.get(url).send().await?;
        read_json(response).await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parses the base URL and guarantees a trailing slash so that relative
/// endpoints are appended rather than replacing the last segment.
fn normalize_base_url(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidConfig(format!(
            "unsupported scheme '{}' in API URL",
            url.scheme()
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Decodes a 2xx JSON body, or turns any other status into `Server`.
async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Server {
            status: status.as_u16(),
            message: server_message(status, &body),
        });
    }

    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

fn server_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| status_line(status))
}

fn status_line(status: StatusCode) -> String {
    status.to_string()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use jokama_core::{Cart, Money, PartId, PaymentMethod, PricingEngine};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Backend {
        checkout_calls: Arc<AtomicUsize>,
        last_body: Arc<Mutex<Option<Value>>>,
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    fn client(base_url: String) -> HttpSalesApi {
        HttpSalesApi::new(&ClientSettings {
            base_url,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    fn sample_request() -> CheckoutRequest {
        let part = Part {
            id: PartId(3),
            part_name: "Brake Pad Set".to_string(),
            oem_number: "04465-0K240".to_string(),
            sale_price: Money::from_major(1000),
            stock_quantity: 5,
            buying_price: None,
            category: None,
        };
        let mut cart = Cart::new();
        cart.add_line(&part).unwrap();
        cart.add_line(&part).unwrap();
        let summary = PricingEngine::new().summarize(&cart);
        CheckoutRequest::new(&cart, &summary, PaymentMethod::Cash)
    }

    async fn checkout_ok(State(backend): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
        backend.checkout_calls.fetch_add(1, Ordering::SeqCst);
        *backend.last_body.lock().unwrap() = Some(body);
        Json(json!({"success": true, "saleId": 42}))
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let api = HttpSalesApi::new(&ClientSettings::default()).unwrap();
        assert_eq!(api.base_url().as_str(), "http://localhost:5000/api/");
        assert_eq!(
            api.endpoint("sales/receipt/7").unwrap().as_str(),
            "http://localhost:5000/api/sales/receipt/7"
        );
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        let mut settings = ClientSettings::default();
        settings.base_url = "not a url".to_string();
        assert!(matches!(
            HttpSalesApi::new(&settings),
            Err(ClientError::InvalidUrl(_))
        ));

        settings.base_url = "ftp://shop.local/api".to_string();
        assert!(matches!(
            HttpSalesApi::new(&settings),
            Err(ClientError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_checkout_success_posts_once() {
        let backend = Backend::default();
        let app = Router::new()
            .route("/api/sales/checkout", post(checkout_ok))
            .with_state(backend.clone());
        let api = client(serve(app).await);

        let sale_id = api.checkout(&sample_request()).await.unwrap();

        assert_eq!(sale_id, SaleId(42));
        assert_eq!(backend.checkout_calls.load(Ordering::SeqCst), 1);
        let body = backend.last_body.lock().unwrap().clone().unwrap();
        assert_eq!(body["cart"][0]["qty"], 2);
        assert_eq!(body["subtotal"], "1724.14");
        assert_eq!(body["vat_amount"], "275.86");
        assert_eq!(body["payment_method"], "Cash");
    }

    #[tokio::test]
    async fn test_checkout_success_false_is_rejected() {
        let app = Router::new().route(
            "/api/sales/checkout",
            post(|| async { Json(json!({"success": false, "error": "Till closed"})) }),
        );
        let api = client(serve(app).await);

        let err = api.checkout(&sample_request()).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected(ref m) if m == "Till closed"));
    }

    #[tokio::test]
    async fn test_checkout_conflict_surfaces_backend_message() {
        let app = Router::new().route(
            "/api/sales/checkout",
            post(|| async {
                (
                    AxumStatus::CONFLICT,
                    Json(json!({"success": false, "error": "Insufficient stock for Brake Pad Set"})),
                )
            }),
        );
        let api = client(serve(app).await);

        let err = api.checkout(&sample_request()).await.unwrap_err();
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 409);
                assert_eq!(message, "Insufficient stock for Brake Pad Set");
            }
            other => panic!("expected Server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_checkout_unparseable_error_uses_status_line() {
        let app = Router::new().route(
            "/api/sales/checkout",
            post(|| async { (AxumStatus::INTERNAL_SERVER_ERROR, "<html>boom</html>") }),
        );
        let api = client(serve(app).await);

        let err = api.checkout(&sample_request()).await.unwrap_err();
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "500 Internal Server Error");
            }
            other => panic!("expected Server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_network_failure() {
        // Bind and drop to obtain a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client(format!("http://{}/api", addr));
        let err = api.checkout(&sample_request()).await.unwrap_err();
        assert!(err.is_network(), "expected network error, got {:?}", err);
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let app = Router::new().route(
            "/api/parts",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!([]))
            }),
        );
        let api = HttpSalesApi::new(&ClientSettings {
            base_url: serve(app).await,
            request_timeout: Duration::from_millis(200),
            connect_timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = api.list_parts().await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout));
    }

    #[tokio::test]
    async fn test_fetch_receipt_decodes_backend_shape() {
        let app = Router::new().route(
            "/api/sales/receipt/{id}",
            get(|Path(id): Path<i64>| async move {
                Json(json!({
                    "header": {
                        "id": id,
                        "created_at": "2026-03-01T09:30:00.000Z",
                        "subtotal": "2068.97",
                        "vat_amount": "331.03",
                        "total_amount": "2400.00",
                        "payment_method": "M-Pesa"
                    },
                    "items": [
                        {"part_name": "Oil Filter", "quantity": 3, "unit_price": "800.00", "original_price": "1000.00"}
                    ]
                }))
            }),
        );
        let api = client(serve(app).await);

        let receipt = api.fetch_receipt(SaleId(42)).await.unwrap();
        assert_eq!(receipt.header.id, SaleId(42));
        assert_eq!(receipt.header.total_amount, Money::from_major(2400));
        assert_eq!(receipt.items[0].original_price, Some(Money::from_major(1000)));
    }

    #[tokio::test]
    async fn test_fetch_receipt_not_found() {
        let app = Router::new().route(
            "/api/sales/receipt/{id}",
            get(|| async { (AxumStatus::NOT_FOUND, Json(json!({"error": "Sale not found"}))) }),
        );
        let api = client(serve(app).await);

        let err = api.fetch_receipt(SaleId(999)).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().contains("Sale not found"));
    }

    #[tokio::test]
    async fn test_list_parts() {
        let app = Router::new().route(
            "/api/parts",
            get(|| async {
                Json(json!([
                    {"id": 1, "part_name": "Oil Filter", "oem_number": "90915", "sale_price": "1000", "stock_quantity": 4},
                    {"id": 2, "part_name": "Spark Plug", "oem_number": "BKR6E", "sale_price": 250, "stock_quantity": 0, "category": "Ignition"}
                ]))
            }),
        );
        let api = client(serve(app).await);

        let parts = api.list_parts().await.unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1].category.as_deref(), Some("Ignition"));
        assert!(!parts[1].is_sellable());
    }
}
