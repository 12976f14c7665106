//! HTTP clients for the hsd node and wallet APIs.
//!
//! Both APIs use HTTP basic auth with user `x` and the API key as password.
//! Errors are classified so the executor can tell definitive rejections from
//! transient faults.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ClientError, ClientResult, NodeClient, RenewalReceipt, WalletClient};
use crate::config::ApiEndpoint;
use crate::types::{BalanceSnapshot, WalletInfo};

/// Thin authenticated wrapper shared by the node and wallet clients
#[derive(Clone)]
struct HsdHttp {
    base_url: Url,
    api_key: Option<String>,
    http_client: Client,
    timeout: Duration,
}

impl HsdHttp {
    fn new(endpoint: &ApiEndpoint, timeout: Duration) -> ClientResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&endpoint.url)
            .map_err(|e| ClientError::Malformed(format!("invalid URL {}: {e}", endpoint.url)))?;

        Ok(Self {
            base_url,
            api_key: endpoint.api_key.as_ref().map(|k| k.expose().to_string()),
            http_client,
            timeout,
        })
    }

    fn url(&self, segments: &[&str], query: &[(&str, &str)]) -> ClientResult<Url> {
        endpoint_url(&self.base_url, segments, query)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => req.basic_auth("x", Some(key)),
            None => req,
        }
    }

    async fn get(&self, segments: &[&str], query: &[(&str, &str)]) -> ClientResult<Value> {
        let url = self.url(segments, query)?;
        debug!(path = url.path(), "hsd GET");
        let req = self.authed(self.http_client.get(url));
        let response = req.send().await.map_err(|e| self.transport_error(&e))?;
        self.decode(response).await
    }

    async fn post(&self, segments: &[&str], body: &Value) -> ClientResult<Value> {
        let url = self.url(segments, &[])?;
        debug!(path = url.path(), "hsd POST");
        let req = self.authed(self.http_client.post(url).json(body));
        let response = req.send().await.map_err(|e| self.transport_error(&e))?;
        self.decode(response).await
    }

    fn transport_error(&self, e: &reqwest::Error) -> ClientError {
        if e.is_timeout() {
            ClientError::Timeout(self.timeout.as_millis() as u64)
        } else {
            ClientError::Network(e.to_string())
        }
    }

    async fn decode(&self, response: Response) -> ClientResult<Value> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| ClientError::Malformed(e.to_string()))
    }
}

/// Append percent-encoded path segments and query pairs to `base`
fn endpoint_url(base: &Url, segments: &[&str], query: &[(&str, &str)]) -> ClientResult<Url> {
    let mut url = base.clone();
    if !segments.is_empty() {
        url.path_segments_mut()
            .map_err(|()| ClientError::Malformed(format!("{base} cannot be a base URL")))?
            .pop_if_empty()
            .extend(segments);
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query);
    }
    Ok(url)
}

/// Map a non-success HTTP status to a client error
fn classify_status(status: StatusCode, body: &str) -> ClientError {
    let message = error_message(body).unwrap_or_else(|| format!("HTTP {status}"));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Auth(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ClientError::Network(message)
        }
        _ => ClientError::Rejected(message),
    }
}

/// Extract hsd's `{"error": {"message": ...}}` text, if present
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    match error {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => obj.get("message").and_then(Value::as_str).map(String::from),
        _ => None,
    }
}

/// Client for the hsd node HTTP API (default port 12037)
#[derive(Clone)]
pub struct HsdNodeClient {
    http: HsdHttp,
}

impl HsdNodeClient {
    /// Create a node client
    pub fn new(endpoint: &ApiEndpoint, timeout: Duration) -> ClientResult<Self> {
        Ok(Self {
            http: HsdHttp::new(endpoint, timeout)?,
        })
    }
}

#[async_trait]
impl NodeClient for HsdNodeClient {
    async fn chain_height(&self) -> ClientResult<u64> {
        let info = self.http.get(&[], &[]).await?;
        parse_chain_height(&info)
    }
}

fn parse_chain_height(info: &Value) -> ClientResult<u64> {
    info.pointer("/chain/height")
        .and_then(Value::as_u64)
        .ok_or_else(|| ClientError::Malformed("missing chain.height".to_string()))
}

/// Client for the hsd wallet HTTP API (default port 12039), bound to one wallet
#[derive(Clone)]
pub struct HsdWalletClient {
    http: HsdHttp,
    wallet_id: String,
    account: String,
    passphrase: String,
}

impl HsdWalletClient {
    /// Create a wallet client for `wallet_id`
    pub fn new(
        endpoint: &ApiEndpoint,
        timeout: Duration,
        wallet_id: impl Into<String>,
        account: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> ClientResult<Self> {
        Ok(Self {
            http: HsdHttp::new(endpoint, timeout)?,
            wallet_id: wallet_id.into(),
            account: account.into(),
            passphrase: passphrase.into(),
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    #[serde(default)]
    confirmed: i64,
    #[serde(default)]
    unconfirmed: i64,
    #[serde(default)]
    locked_confirmed: i64,
    #[serde(default)]
    locked_unconfirmed: i64,
}

impl From<BalanceResponse> for BalanceSnapshot {
    fn from(b: BalanceResponse) -> Self {
        Self {
            confirmed: b.confirmed,
            unconfirmed: b.unconfirmed,
            locked_confirmed: b.locked_confirmed,
            locked_unconfirmed: b.locked_unconfirmed,
        }
    }
}

#[async_trait]
impl WalletClient for HsdWalletClient {
    async fn list_names(&self) -> ClientResult<Vec<Value>> {
        let names = self
            .http
            .get(&["wallet", self.wallet_id.as_str(), "name"], &[("own", "true")])
            .await?;
        match names {
            Value::Array(names) => Ok(names),
            other => Err(ClientError::Malformed(format!(
                "expected a name list, got {}",
                json_kind(&other)
            ))),
        }
    }

    async fn renew(&self, name: &str) -> ClientResult<RenewalReceipt> {
        let body = json!({
            "passphrase": self.passphrase,
            "name": name,
            "sign": true,
            "broadcast": true,
        });
        let tx = self.http.post(&["wallet", self.wallet_id.as_str(), "renewal"], &body).await?;
        parse_renewal_receipt(&tx)
    }

    async fn balance(&self) -> ClientResult<BalanceSnapshot> {
        let value = self
            .http
            .get(
                &["wallet", self.wallet_id.as_str(), "balance"],
                &[("account", self.account.as_str())],
            )
            .await?;
        let balance: BalanceResponse =
            serde_json::from_value(value).map_err(|e| ClientError::Malformed(e.to_string()))?;
        Ok(balance.into())
    }

    async fn wallet_info(&self) -> ClientResult<WalletInfo> {
        let info = self.http.get(&["wallet", self.wallet_id.as_str()], &[]).await?;
        let id = info
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(&self.wallet_id)
            .to_string();

        let account_path = ["wallet", self.wallet_id.as_str(), "account", self.account.as_str()];
        let receive_address = match self.http.get(&account_path, &[]).await {
            Ok(account) => account
                .get("receiveAddress")
                .and_then(Value::as_str)
                .map(String::from),
            Err(e) => {
                warn!(account = %self.account, "Failed to fetch account info: {}", e);
                None
            }
        };

        Ok(WalletInfo {
            id,
            receive_address,
        })
    }
}

fn parse_renewal_receipt(tx: &Value) -> ClientResult<RenewalReceipt> {
    tx.get("hash")
        .and_then(Value::as_str)
        .filter(|h| !h.is_empty())
        .map(|h| RenewalReceipt {
            transaction_id: h.to_string(),
        })
        .ok_or_else(|| ClientError::Malformed("renewal response has no transaction hash".to_string()))
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth() {
        let err = classify_status(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[test]
    fn test_classify_gateway_errors_as_transient() {
        let err = classify_status(StatusCode::SERVICE_UNAVAILABLE, "");
        assert!(err.is_transient());
    }

    #[test]
    fn test_classify_backend_rejection_keeps_message() {
        let body = r#"{"error":{"type":"Error","message":"Name is not expiring soon."}}"#;
        let err = classify_status(StatusCode::INTERNAL_SERVER_ERROR, body);
        assert_eq!(err, ClientError::Rejected("Name is not expiring soon.".to_string()));
    }

    #[test]
    fn test_endpoint_url_encodes_ids() {
        let base = Url::parse("http://127.0.0.1:12039").unwrap();
        let url = endpoint_url(
            &base,
            &["wallet", "my wallet/../x", "balance"],
            &[("account", "a&b=c")],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:12039/wallet/my%20wallet%2F..%2Fx/balance?account=a%26b%3Dc"
        );
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let base = Url::parse("https://proxy.example/hsd/").unwrap();
        let url = endpoint_url(&base, &["wallet", "primary", "name"], &[("own", "true")]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example/hsd/wallet/primary/name?own=true");

        let root = endpoint_url(&base, &[], &[]).unwrap();
        assert_eq!(root.as_str(), "https://proxy.example/hsd/");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let endpoint = ApiEndpoint {
            url: "not a url".to_string(),
            api_key: None,
        };
        assert!(matches!(
            HsdNodeClient::new(&endpoint, Duration::from_secs(1)),
            Err(ClientError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_chain_height() {
        let info = json!({ "chain": { "height": 268_271 } });
        assert_eq!(parse_chain_height(&info).unwrap(), 268_271);
        assert!(parse_chain_height(&json!({})).is_err());
    }

    #[test]
    fn test_parse_renewal_receipt() {
        let tx = json!({ "hash": "ab12", "inputs": [] });
        assert_eq!(parse_renewal_receipt(&tx).unwrap().transaction_id, "ab12");

        let err = parse_renewal_receipt(&json!({ "hash": "" })).unwrap_err();
        assert!(matches!(err, ClientError::Malformed(_)));
    }

    #[test]
    fn test_balance_response_defaults_missing_fields() {
        let value = json!({ "unconfirmed": 123_500_000, "lockedUnconfirmed": 0 });
        let balance: BalanceSnapshot = serde_json::from_value::<BalanceResponse>(value)
            .unwrap()
            .into();
        assert_eq!(balance.unconfirmed, 123_500_000);
        assert_eq!(balance.confirmed, 0);
    }
}
