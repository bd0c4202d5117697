//! WebSocket transport for the registry manager
//!
//! Thin request/response framing over the manager operations; all validation
//! of interest to the registry itself happens again inside
//! [`Registry`](crate::Registry).

use crate::{
    error::{Error, Result},
    models::{Action, ConfigRecord, ErrorInfo, WsMessage},
    registry::Registry,
};
use async_net::{TcpListener, TcpStream};
use async_tungstenite::{WebSocketStream, accept_async};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tungstenite::Message;

/// WebSocket server
pub struct WsServer {
    registry: Arc<Registry>,
    /// The TCP listener
    pub listener: TcpListener,
}

impl WsServer {
    /// Create a new WebSocket server
    pub async fn new(addr: impl AsRef<str>, registry: Arc<Registry>) -> Result<Self> {
        let listener = TcpListener::bind(addr.as_ref()).await?;
        info!("Registry server listening on {}", addr.as_ref());

        Ok(Self { registry, listener })
    }

    /// Accept a new connection
    pub async fn accept(&self) -> Result<ConnectionHandler> {
        let (tcp_stream, addr) = self.listener.accept().await?;
        let ws_stream = accept_async(tcp_stream).await?;

        debug!("New connection from {}", addr);

        Ok(ConnectionHandler {
            ws: ws_stream,
            addr,
            registry: self.registry.clone(),
        })
    }

    /// Get the registry reference
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

/// Handler for a single client connection
pub struct ConnectionHandler {
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
    registry: Arc<Registry>,
}

impl ConnectionHandler {
    /// Handle the connection until the client disconnects
    pub async fn handle(mut self) -> Result<()> {
        info!("Handling connection from {}", self.addr);

        while let Some(msg) = self.ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(e) = self.process_text_message(&text).await {
                        error!("Error processing message: {}", e);
                        self.send_error_response("", &e).await?;
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Client {} closing connection", self.addr);
                    break;
                }
                Ok(Message::Ping(data)) => {
                    self.ws.send(Message::Pong(data)).await?;
                }
                Ok(_) => {
                    // Ignore other message types
                }
                Err(e) => {
                    error!("WebSocket error from {}: {}", self.addr, e);
                    break;
                }
            }
        }

        info!("Connection from {} closed", self.addr);
        Ok(())
    }

    /// Process a text message
    async fn process_text_message(&mut self, text: &str) -> Result<()> {
        let msg: WsMessage = serde_json::from_str(text)?;

        match msg {
            WsMessage::Request { id, action, params } => {
                self.handle_request(&id, action, params).await?;
            }
            _ => {
                warn!("Unexpected message type from client");
            }
        }

        Ok(())
    }

    /// Handle a request
    async fn handle_request(
        &mut self,
        id: &str,
        action: Action,
        params: serde_json::Value,
    ) -> Result<()> {
        debug!("Request {}: {:?}", id, action);

        let response = match action {
            Action::ListConfigs => self.handle_list_configs().await,
            Action::GetConfig => self.handle_get_config(params).await,
            Action::AddConfig => self.handle_add_config(params).await,
            Action::RemoveConfig => self.handle_remove_config(params).await,
            Action::UpdateConfig => self.handle_update_config(params).await,
            Action::ExportConfigs => self.handle_export_configs().await,
            Action::ImportConfigs => self.handle_import_configs(params).await,
        };

        match response {
            Ok(data) => self.send_response(id, data).await?,
            Err(e) => self.send_error_response(id, &e).await?,
        }

        Ok(())
    }

    /// Handle list configs request
    async fn handle_list_configs(&self) -> Result<serde_json::Value> {
        let records = self.registry.list().await?;
        Ok(serde_json::to_value(&records)?)
    }

    /// Handle get config request
    async fn handle_get_config(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct GetConfigParams {
            service_name: String,
        }

        let params: GetConfigParams = serde_json::from_value(params)?;
        let record = self.registry.get(&params.service_name).await?;
        Ok(serde_json::to_value(&record)?)
    }

    /// Handle add config request
    async fn handle_add_config(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let record = parse_named_record(params)?;
        let service_name = record.service_name.clone();

        self.registry.add(record).await?;

        Ok(serde_json::json!({ "stored": service_name }))
    }

    /// Handle remove config request
    async fn handle_remove_config(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct RemoveConfigParams {
            service_name: String,
        }

        let params: RemoveConfigParams = serde_json::from_value(params)?;
        self.registry.delete(&params.service_name).await?;

        Ok(serde_json::json!({ "removed": params.service_name }))
    }

    /// Handle update config request
    async fn handle_update_config(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        let partial = parse_named_record(params)?;
        let service_name = partial.service_name.clone();

        self.registry.update(&service_name, &partial).await?;

        Ok(serde_json::json!({ "updated": service_name }))
    }

    /// Handle export configs request
    async fn handle_export_configs(&self) -> Result<serde_json::Value> {
        let records = self.registry.list().await?;
        Ok(serde_json::json!({
            "count": records.len(),
            "records": records,
        }))
    }

    /// Handle import configs request
    async fn handle_import_configs(&self, params: serde_json::Value) -> Result<serde_json::Value> {
        #[derive(Deserialize)]
        struct ImportConfigsParams {
            source: String,
        }

        let params: ImportConfigsParams = serde_json::from_value(params)?;
        let imported = self.registry.load_from(&params.source).await?;

        Ok(serde_json::json!({ "imported": imported }))
    }

    /// Send a response
    async fn send_response(&mut self, id: &str, data: serde_json::Value) -> Result<()> {
        let msg = WsMessage::Response {
            id: id.to_string(),
            data: Some(data),
            error: None,
        };

        self.send_message(&msg).await
    }

    /// Send an error response
    async fn send_error_response(&mut self, id: &str, error: &Error) -> Result<()> {
        let msg = WsMessage::Response {
            id: id.to_string(),
            data: None,
            error: Some(ErrorInfo {
                code: error_code(error).to_string(),
                message: error.to_string(),
            }),
        };

        self.send_message(&msg).await
    }

    /// Send a message
    async fn send_message(&mut self, msg: &WsMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.ws.send(Message::Text(json.into())).await?;
        Ok(())
    }
}

/// Decode a record payload, requiring a service name
///
/// Requests that carry a record must name the service they are about before
/// the registry is ever invoked.
fn parse_named_record(params: serde_json::Value) -> Result<ConfigRecord> {
    let record: ConfigRecord = serde_json::from_value(params)?;
    if record.service_name.trim().is_empty() {
        return Err(Error::Validation(
            "payload must include a service_name".to_string(),
        ));
    }
    Ok(record)
}

/// Wire error code for an error variant
fn error_code(error: &Error) -> &'static str {
    match error {
        Error::Validation(_) => "validation",
        Error::NotFound(_) => "not_found",
        Error::Storage(_) => "storage",
        Error::Json(_) | Error::Yaml(_) => "serialization",
        Error::Io(_) => "io",
        Error::Http(_) => "network",
        Error::WebSocket(_) => "websocket",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_record_requires_name() {
        let err = parse_named_record(serde_json::json!({ "poll_frequency": 30 }));
        assert!(matches!(err, Err(Error::Validation(_))));

        let ok = parse_named_record(serde_json::json!({ "service_name": "svc-a" }));
        assert_eq!(ok.unwrap().service_name, "svc-a");
    }

    #[test]
    fn test_error_codes_cover_taxonomy() {
        assert_eq!(error_code(&Error::Validation("x".into())), "validation");
        assert_eq!(error_code(&Error::NotFound("x".into())), "not_found");
    }
}
