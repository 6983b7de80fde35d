use std::time::Duration;

use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::transports::http::Http;
use alloy::transports::{RpcError, TransportError, TransportErrorKind};
use reqwest::Url;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
	#[error("{method}: transport error: {message}")]
	Transport { method: &'static str, message: String },

	/// The node answered with a JSON-RPC error object. The message is the
	/// node's own text, e.g. "insufficient funds for gas * price + value".
	#[error("{method}: node error {code}: {message}")]
	Rejected {
		method: &'static str,
		code: i64,
		message: String,
	},

	#[error("{method}: malformed response: {message}")]
	Malformed { method: &'static str, message: String },

	#[error("{method}: no response within {after:?}")]
	Timeout { method: &'static str, after: Duration },
}

/// The subset of a JSON-RPC node this client relies on.
///
/// Implementations must not retry; a failure is reported once and
/// surfaced to the caller as-is.
#[async_trait::async_trait]
pub trait NodeRpc: Send + Sync {
	/// Native balance at the latest block, in wei.
	async fn get_balance(&self, address: Address) -> Result<U256, NodeError>;

	/// Nonce including transactions still in the node's pending pool.
	async fn get_pending_nonce(&self, address: Address) -> Result<u64, NodeError>;

	/// The node's gas price suggestion, in wei.
	async fn suggest_gas_price(&self) -> Result<u128, NodeError>;

	/// Read-only contract call against the latest block.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, NodeError>;

	/// Submit an RLP-encoded signed transaction; returns its hash.
	async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, NodeError>;
}

// -- HTTP JSON-RPC client --

/// An alloy HTTP provider behind [`NodeRpc`].
///
/// No request deadline is set here; wrap it in [`TimedNode`].
pub struct HttpNode {
	provider: DynProvider<Ethereum>,
	url: Url,
}

impl std::fmt::Debug for HttpNode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		// The URL usually embeds an API key.
		f.debug_struct("HttpNode").finish_non_exhaustive()
	}
}

impl HttpNode {
	pub fn new(url: &str) -> Result<Self, NodeError> {
		let url: Url = url.parse().map_err(|e| NodeError::Transport {
			method: "connect",
			message: format!("invalid RPC URL: {e}"),
		})?;

		let http = reqwest::Client::builder()
			.user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
			.build()
			.map_err(|e| NodeError::Transport {
				method: "connect",
				message: e.without_url().to_string(),
			})?;
		let client = RpcClient::new(Http::with_client(http, url.clone()), false);
		let provider = ProviderBuilder::new().connect_client(client).erased();

		Ok(Self { provider, url })
	}

	fn error(&self, method: &'static str, err: TransportError) -> NodeError {
		match err {
			RpcError::ErrorResp(payload) => NodeError::Rejected {
				method,
				code: payload.code,
				message: payload.message.to_string(),
			},
			RpcError::Transport(TransportErrorKind::HttpError(http)) => NodeError::Transport {
				method,
				message: format!("HTTP {}: {}", http.status, http.body.trim()),
			},
			RpcError::DeserError { err, .. } => NodeError::Malformed {
				method,
				message: err.to_string(),
			},
			RpcError::NullResp => NodeError::Malformed {
				method,
				message: "null response".into(),
			},
			other => NodeError::Transport {
				method,
				message: redact(&other.to_string(), &self.url),
			},
		}
	}
}

#[async_trait::async_trait]
impl NodeRpc for HttpNode {
	async fn get_balance(&self, address: Address) -> Result<U256, NodeError> {
		tracing::debug!(method = "eth_getBalance", "node request");
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| self.error("eth_getBalance", e))
	}

	async fn get_pending_nonce(&self, address: Address) -> Result<u64, NodeError> {
		tracing::debug!(method = "eth_getTransactionCount", "node request");
		self.provider
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(|e| self.error("eth_getTransactionCount", e))
	}

	async fn suggest_gas_price(&self) -> Result<u128, NodeError> {
		tracing::debug!(method = "eth_gasPrice", "node request");
		self.provider
			.get_gas_price()
			.await
			.map_err(|e| self.error("eth_gasPrice", e))
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, NodeError> {
		tracing::debug!(method = "eth_call", to = %to, "node request");
		let request = TransactionRequest::default().to(to).input(data.into());
		self.provider
			.call(request)
			.await
			.map_err(|e| self.error("eth_call", e))
	}

	async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, NodeError> {
		tracing::debug!(method = "eth_sendRawTransaction", "node request");
		let pending = self
			.provider
			.send_raw_transaction(&raw)
			.await
			.map_err(|e| self.error("eth_sendRawTransaction", e))?;
		Ok(*pending.tx_hash())
	}
}

// -- Timeout boundary --

/// Wraps every call of an inner node in a fixed deadline.
pub struct TimedNode<N> {
	inner: N,
	timeout: Duration,
}

impl<N> TimedNode<N> {
	pub fn new(inner: N, timeout: Duration) -> Self {
		Self { inner, timeout }
	}

	async fn bounded<T, F>(&self, method: &'static str, fut: F) -> Result<T, NodeError>
	where
		F: std::future::Future<Output = Result<T, NodeError>>,
	{
		match tokio::time::timeout(self.timeout, fut).await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(method, timeout = ?self.timeout, "node call timed out");
				Err(NodeError::Timeout {
					method,
					after: self.timeout,
				})
			}
		}
	}
}

#[async_trait::async_trait]
impl<N: NodeRpc> NodeRpc for TimedNode<N> {
	async fn get_balance(&self, address: Address) -> Result<U256, NodeError> {
		self.bounded("eth_getBalance", self.inner.get_balance(address))
			.await
	}

	async fn get_pending_nonce(&self, address: Address) -> Result<u64, NodeError> {
		self.bounded("eth_getTransactionCount", self.inner.get_pending_nonce(address))
			.await
	}

	async fn suggest_gas_price(&self) -> Result<u128, NodeError> {
		self.bounded("eth_gasPrice", self.inner.suggest_gas_price())
			.await
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, NodeError> {
		self.bounded("eth_call", self.inner.call(to, data)).await
	}

	async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, NodeError> {
		self.bounded("eth_sendRawTransaction", self.inner.send_raw_transaction(raw))
			.await
	}
}

// -- Helpers --

/// Strip the endpoint from an error message. reqwest errors quote the
/// full URL, which usually carries an API key.
fn redact(message: &str, url: &Url) -> String {
	let mut out = message.replace(url.as_str(), "<rpc-url>");
	if let Some(trimmed) = url.as_str().strip_suffix('/') {
		out = out.replace(trimmed, "<rpc-url>");
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::{json, Value};
	use tokio::io::{AsyncReadExt, AsyncWriteExt};
	use tokio::net::{TcpListener, TcpStream};

	/// A canned HTTP reply: status line, content type, body.
	type Reply = fn(&Value) -> (&'static str, &'static str, String);

	/// Serve `reply` to every request on a local port; returns the URL.
	async fn serve(reply: Reply) -> String {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			loop {
				let (mut stream, _) = listener.accept().await.unwrap();
				tokio::spawn(async move {
					let request = read_request(&mut stream).await;
					let (status, content_type, body) = reply(&request);
					let response = format!(
						"HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
						body.len()
					);
					let _ = stream.write_all(response.as_bytes()).await;
				});
			}
		});
		format!("http://{addr}/v3/secret-key")
	}

	/// Accept connections and never answer.
	async fn serve_nothing() -> String {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let mut held = Vec::new();
			loop {
				let (stream, _) = listener.accept().await.unwrap();
				held.push(stream);
			}
		});
		format!("http://{addr}")
	}

	async fn read_request(stream: &mut TcpStream) -> Value {
		let mut buf = Vec::new();
		let mut chunk = [0u8; 4096];
		loop {
			let n = stream.read(&mut chunk).await.unwrap();
			if n == 0 {
				return Value::Null;
			}
			buf.extend_from_slice(&chunk[..n]);

			let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
				continue;
			};
			let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
			let len = head
				.lines()
				.find_map(|l| l.strip_prefix("content-length:"))
				.and_then(|v| v.trim().parse::<usize>().ok())
				.unwrap_or(0);
			let body = end + 4;
			if buf.len() >= body + len {
				return serde_json::from_slice(&buf[body..body + len]).unwrap_or(Value::Null);
			}
		}
	}

	fn rpc_result(request: &Value, result: Value) -> String {
		json!({"jsonrpc": "2.0", "id": request["id"], "result": result}).to_string()
	}

	fn node(url: &str) -> HttpNode {
		HttpNode::new(url).unwrap()
	}

	#[tokio::test]
	async fn quantities_are_decoded() {
		let url = serve(|req| {
			let result = match req["method"].as_str() {
				Some("eth_gasPrice") => json!("0x14"),
				Some("eth_getTransactionCount") => {
					assert_eq!(req["params"][1], "pending");
					json!("0x3")
				}
				Some("eth_getBalance") => json!("0x1bc16d674ec80000"),
				other => panic!("unexpected method {other:?}"),
			};
			("200 OK", "application/json", rpc_result(req, result))
		})
		.await;
		let node = node(&url);

		assert_eq!(node.suggest_gas_price().await.unwrap(), 20);
		assert_eq!(node.get_pending_nonce(Address::ZERO).await.unwrap(), 3);
		assert_eq!(
			node.get_balance(Address::ZERO).await.unwrap(),
			U256::from(2_000_000_000_000_000_000u64)
		);
	}

	#[tokio::test]
	async fn call_returns_raw_data() {
		let url = serve(|req| {
			assert_eq!(req["method"], "eth_call");
			assert_eq!(req["params"][0]["to"], "0x0101010101010101010101010101010101010101");
			let word = "0x00000000000000000000000000000000000000000000000000000000004c4b40";
			("200 OK", "application/json", rpc_result(req, json!(word)))
		})
		.await;

		let reply = node(&url)
			.call(Address::repeat_byte(1), Bytes::from(vec![0x70, 0xa0, 0x82, 0x31]))
			.await
			.unwrap();
		assert_eq!(reply.len(), 32);
		assert_eq!(U256::from_be_slice(&reply), U256::from(5_000_000u64));
	}

	#[tokio::test]
	async fn error_object_is_rejected_verbatim() {
		let url = serve(|req| {
			let body = json!({
				"jsonrpc": "2.0",
				"id": req["id"],
				"error": {"code": -32000, "message": "insufficient funds for gas * price + value"},
			});
			("200 OK", "application/json", body.to_string())
		})
		.await;

		let err = node(&url)
			.send_raw_transaction(Bytes::from(vec![0xf8, 0x6c]))
			.await
			.unwrap_err();
		match err {
			NodeError::Rejected { method, code, message } => {
				assert_eq!(method, "eth_sendRawTransaction");
				assert_eq!(code, -32000);
				assert_eq!(message, "insufficient funds for gas * price + value");
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[tokio::test]
	async fn http_status_keeps_body_text() {
		let url = serve(|_| ("429 Too Many Requests", "text/plain", "rate limit exceeded".into())).await;

		let err = node(&url).suggest_gas_price().await.unwrap_err();
		match err {
			NodeError::Transport { message, .. } => {
				assert!(message.contains("429"), "{message}");
				assert!(message.contains("rate limit exceeded"), "{message}");
			}
			other => panic!("unexpected {other:?}"),
		}
	}

	#[tokio::test]
	async fn garbage_result_is_malformed() {
		let url = serve(|req| ("200 OK", "application/json", rpc_result(req, json!("not hex")))).await;
		let err = node(&url).suggest_gas_price().await.unwrap_err();
		assert!(matches!(err, NodeError::Malformed { .. }), "{err:?}");
	}

	#[tokio::test]
	async fn stalled_node_times_out() {
		let url = serve_nothing().await;
		let node = TimedNode::new(node(&url), Duration::from_millis(200));

		let err = node.suggest_gas_price().await.unwrap_err();
		assert!(matches!(err, NodeError::Timeout { method: "eth_gasPrice", .. }), "{err:?}");
	}

	#[tokio::test]
	async fn unreachable_node_hides_url() {
		// Bind then drop to get a port nobody listens on.
		let port = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap().port();
		let err = node(&format!("http://127.0.0.1:{port}/v3/secret-key"))
			.suggest_gas_price()
			.await
			.unwrap_err();
		assert!(matches!(err, NodeError::Transport { .. }));
		assert!(!err.to_string().contains("secret-key"), "{err}");
	}

	#[test]
	fn redact_strips_endpoint() {
		let url: Url = "https://mainnet.infura.io/v3/secret".parse().unwrap();
		let message = "error sending request for url (https://mainnet.infura.io/v3/secret)";
		assert_eq!(redact(message, &url), "error sending request for url (<rpc-url>)");
	}

	#[test]
	fn invalid_url_is_rejected() {
		assert!(matches!(HttpNode::new("not a url"), Err(NodeError::Transport { .. })));
	}

	struct SlowNode;

	#[async_trait::async_trait]
	impl NodeRpc for SlowNode {
		async fn get_balance(&self, _: Address) -> Result<U256, NodeError> {
			tokio::time::sleep(Duration::from_secs(5)).await;
			Ok(U256::ZERO)
		}
		async fn get_pending_nonce(&self, _: Address) -> Result<u64, NodeError> {
			Ok(7)
		}
		async fn suggest_gas_price(&self) -> Result<u128, NodeError> {
			Ok(1)
		}
		async fn call(&self, _: Address, _: Bytes) -> Result<Bytes, NodeError> {
			Ok(Bytes::new())
		}
		async fn send_raw_transaction(&self, _: Bytes) -> Result<B256, NodeError> {
			Ok(B256::ZERO)
		}
	}

	#[tokio::test]
	async fn timed_node_cuts_off_slow_calls() {
		let node = TimedNode::new(SlowNode, Duration::from_millis(20));
		let err = node.get_balance(Address::ZERO).await.unwrap_err();
		assert!(matches!(err, NodeError::Timeout { method: "eth_getBalance", .. }));

		// Fast calls pass straight through.
		assert_eq!(node.get_pending_nonce(Address::ZERO).await.unwrap(), 7);
	}

	#[test]
	fn http_node_debug_hides_url() {
		let node = node("https://mainnet.infura.io/v3/secret");
		assert!(!format!("{node:?}").contains("secret"));
	}
}
