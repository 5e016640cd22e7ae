//! JSON-RPC Server
//!
//! Serves the runtime over JSON-RPC 2.0 on a localhost TCP port.

use crate::handler::{RateLimitConfig, RpcHandler};
use crate::types::{CallRequest, PollRequest, StatsRequest};
use gdkbridge_core::application::Runtime;
use gdkbridge_core::error::{AppError, Result};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::types::{ErrorObjectOwned, Params};
use jsonrpsee::RpcModule;
use serde::de::DeserializeOwned;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9600;

/// Method names served by this layer
pub mod method {
    pub const CALL: &str = "gdk.call.v1";
    pub const POLL: &str = "events.poll.v1";
    pub const STATS: &str = "admin.stats.v1";
}

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// `0` picks a free port
    pub port: u16,
    pub rate_limit: RateLimitConfig,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Accepts `{...}` or `[{...}]`
fn parse<T: DeserializeOwned>(params: Params<'_>) -> std::result::Result<T, ErrorObjectOwned> {
    match params.as_str().map(str::trim_start) {
        Some(raw) if raw.starts_with('[') => params.one(),
        _ => params.parse(),
    }
}

/// Parameterless calls get the defaults
fn parse_or_default<T: DeserializeOwned + Default>(
    params: Params<'_>,
) -> std::result::Result<T, ErrorObjectOwned> {
    match params.as_str() {
        None => Ok(T::default()),
        Some(_) => parse(params),
    }
}

fn registration(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("failed to register RPC method: {}", e))
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, runtime: Arc<Runtime>) -> Self {
        let handler = Arc::new(RpcHandler::new(runtime, config.rate_limit));
        Self { config, handler }
    }

    /// Bind and start serving; the returned address reflects the bound port
    pub async fn start(self) -> Result<(ServerHandle, SocketAddr)> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder().build(&addr).await.map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to bind {}: {}", addr, e),
            ))
        })?;
        let local_addr = server.local_addr()?;

        let mut module = RpcModule::new(());

        let handler = Arc::clone(&self.handler);
        module
            .register_async_method(method::CALL, move |params, _, _| {
                let handler = Arc::clone(&handler);
                async move {
                    let req: CallRequest = parse(params)?;
                    handler.call(req).await
                }
            })
            .map_err(registration)?;

        let handler = Arc::clone(&self.handler);
        module
            .register_async_method(method::POLL, move |params, _, _| {
                let handler = Arc::clone(&handler);
                async move {
                    let req: PollRequest = parse_or_default(params)?;
                    handler.poll(req).await
                }
            })
            .map_err(registration)?;

        let handler = Arc::clone(&self.handler);
        module
            .register_async_method(method::STATS, move |params, _, _| {
                let handler = Arc::clone(&handler);
                async move {
                    let req: StatsRequest = parse_or_default(params)?;
                    handler.stats(req).await
                }
            })
            .map_err(registration)?;

        info!(addr = %local_addr, "JSON-RPC server started");
        Ok((server.start(module), local_addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallResponse, PollResponse, StatsResponse};
    use gdkbridge_core::application::RuntimeDeps;
    use gdkbridge_core::domain::{UserId, UserProfile};
    use gdkbridge_core::port::live_backend::mocks::RecordingLive;
    use gdkbridge_core::port::save_store::mocks::MemorySaveStore;
    use gdkbridge_core::port::store_backend::mocks::MockStore;
    use gdkbridge_core::port::user_directory::mocks::StaticUserDirectory;
    use gdkbridge_core::port::SequentialIdProvider;
    use jsonrpsee::core::client::ClientT;
    use jsonrpsee::http_client::HttpClientBuilder;
    use jsonrpsee::rpc_params;
    use serde_json::json;
    use tokio::runtime::Handle;

    #[test]
    fn test_parse_accepts_object_or_array() {
        let object: CallRequest =
            parse(Params::new(Some(r#"{"function": "gdk_update"}"#))).unwrap();
        assert_eq!(object.function, "gdk_update");
        assert!(object.args.is_null());

        let array: CallRequest =
            parse(Params::new(Some(r#"[{"function": "gdk_quit", "args": {}}]"#))).unwrap();
        assert_eq!(array.function, "gdk_quit");

        let poll: PollRequest = parse_or_default(Params::new(None)).unwrap();
        assert!(poll.max.is_none());
    }

    #[tokio::test]
    async fn test_methods_over_http() {
        let runtime = Runtime::init(
            RuntimeDeps {
                directory: Arc::new(StaticUserDirectory::new(vec![UserProfile::new(
                    UserId::new(8),
                    "Eight",
                )])),
                store: Arc::new(MockStore::new(vec![])),
                live: Arc::new(RecordingLive::new()),
                saves: Arc::new(MemorySaveStore::new()),
                ids: Arc::new(SequentialIdProvider::new()),
            },
            Handle::current(),
        );
        let config = RpcServerConfig {
            port: 0,
            ..RpcServerConfig::default()
        };
        let (handle, addr) = RpcServer::new(config, Arc::new(runtime))
            .start()
            .await
            .unwrap();

        let client = HttpClientBuilder::default()
            .build(format!("http://{}", addr))
            .unwrap();

        let response: CallResponse = client
            .request(
                method::CALL,
                rpc_params![CallRequest {
                    function: "xboxone_get_user_count".to_string(),
                    args: json!(null),
                }],
            )
            .await
            .unwrap();
        assert_eq!(response.result, json!(1));

        let _: PollResponse = client
            .request(method::POLL, rpc_params![PollRequest::default()])
            .await
            .unwrap();
        // No params at all
        let stats: StatsResponse = client.request(method::STATS, rpc_params![]).await.unwrap();
        assert_eq!(stats.issued_requests, 0);

        handle.stop().unwrap();
    }
}
