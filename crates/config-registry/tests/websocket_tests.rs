//! WebSocket transport integration tests

use async_net::TcpStream;
use async_tungstenite::{WebSocketStream, client_async};
use config_registry::{Action, ConfigRecord, ErrorInfo, Registry, WsMessage, WsServer};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tungstenite::Message;

/// Minimal request/response client for driving the transport
struct TestClient {
    ws: WebSocketStream<TcpStream>,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (ws, _) = client_async(&format!("ws://{}", addr), stream).await?;
        Ok(Self { ws })
    }

    async fn request(
        &mut self,
        action: Action,
        params: Value,
    ) -> anyhow::Result<(Option<Value>, Option<ErrorInfo>)> {
        let id = uuid::Uuid::new_v4().to_string();
        let msg = WsMessage::Request {
            id: id.clone(),
            action,
            params,
        };
        self.ws
            .send(Message::Text(serde_json::to_string(&msg)?.into()))
            .await?;

        while let Some(msg) = self.ws.next().await {
            if let Message::Text(text) = msg? {
                let parsed: WsMessage = serde_json::from_str(&text)?;
                if let WsMessage::Response {
                    id: response_id,
                    data,
                    error,
                } = parsed
                {
                    if response_id == id {
                        return Ok((data, error));
                    }
                }
            }
        }

        anyhow::bail!("connection closed before response arrived")
    }

    async fn expect_data(&mut self, action: Action, params: Value) -> anyhow::Result<Value> {
        let (data, error) = self.request(action, params).await?;
        if let Some(error) = error {
            anyhow::bail!("unexpected error response: {} ({})", error.message, error.code);
        }
        data.ok_or_else(|| anyhow::anyhow!("response carried no data"))
    }

    async fn close(mut self) -> anyhow::Result<()> {
        self.ws.send(Message::Close(None)).await?;
        Ok(())
    }
}

async fn start_server() -> (Arc<Registry>, SocketAddr, smol::Task<()>) {
    let registry = Arc::new(Registry::in_memory().await.expect("Failed to create registry"));
    let server = WsServer::new("127.0.0.1:0", registry.clone())
        .await
        .expect("Failed to create server");

    let server_addr = server
        .listener
        .local_addr()
        .expect("Failed to get server address");

    let server_task = smol::spawn(async move {
        loop {
            match server.accept().await {
                Ok(handler) => {
                    smol::spawn(handler.handle()).detach();
                }
                Err(_) => break,
            }
        }
    });

    // Give server time to start
    smol::Timer::after(Duration::from_millis(100)).await;

    (registry, server_addr, server_task)
}

#[smol_potat::test]
async fn test_config_lifecycle_over_websocket() {
    let (registry, server_addr, server_task) = start_server().await;

    let mut client = TestClient::connect(server_addr)
        .await
        .expect("Failed to connect client");

    // Empty registry lists nothing
    let listed = client
        .expect_data(Action::ListConfigs, json!({}))
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 0);

    // Add a record
    client
        .expect_data(
            Action::AddConfig,
            json!({
                "service_name": "svc-a",
                "status_page": "https://status.example.com",
                "poll_frequency": 30,
                "poll_pages": ["/health"],
            }),
        )
        .await
        .unwrap();

    // Get it back
    let fetched = client
        .expect_data(Action::GetConfig, json!({ "service_name": "svc-a" }))
        .await
        .unwrap();
    let record: ConfigRecord = serde_json::from_value(fetched).unwrap();
    assert_eq!(record.service_name, "svc-a");
    assert_eq!(record.poll_frequency, 30);

    // Merge-update: empty fields must not clobber stored values
    client
        .expect_data(
            Action::UpdateConfig,
            json!({ "service_name": "svc-a", "poll_frequency": 120 }),
        )
        .await
        .unwrap();
    let fetched = client
        .expect_data(Action::GetConfig, json!({ "service_name": "svc-a" }))
        .await
        .unwrap();
    let record: ConfigRecord = serde_json::from_value(fetched).unwrap();
    assert_eq!(record.poll_frequency, 120);
    assert_eq!(record.status_page, "https://status.example.com");

    // Export carries the full set
    let exported = client
        .expect_data(Action::ExportConfigs, json!({}))
        .await
        .unwrap();
    assert_eq!(exported["count"], 1);
    assert_eq!(exported["records"][0]["service_name"], "svc-a");

    // The mutations above marked the registry dirty
    assert!(registry.needs_reload());

    // Remove, then a lookup reports not_found
    client
        .expect_data(Action::RemoveConfig, json!({ "service_name": "svc-a" }))
        .await
        .unwrap();
    let (data, error) = client
        .request(Action::GetConfig, json!({ "service_name": "svc-a" }))
        .await
        .unwrap();
    assert!(data.is_none());
    assert_eq!(error.unwrap().code, "not_found");

    client.close().await.unwrap();
    drop(server_task);
}

#[smol_potat::test]
async fn test_nameless_payloads_are_rejected() {
    let (registry, server_addr, server_task) = start_server().await;

    let mut client = TestClient::connect(server_addr)
        .await
        .expect("Failed to connect client");

    let (data, error) = client
        .request(Action::AddConfig, json!({ "poll_frequency": 30 }))
        .await
        .unwrap();
    assert!(data.is_none());
    assert_eq!(error.unwrap().code, "validation");

    let (_, error) = client
        .request(Action::UpdateConfig, json!({ "display_domain": "a.example.com" }))
        .await
        .unwrap();
    assert_eq!(error.unwrap().code, "validation");

    // Nothing reached the store
    assert!(registry.list().await.unwrap().is_empty());

    client.close().await.unwrap();
    drop(server_task);
}

#[smol_potat::test]
async fn test_import_from_local_dump() {
    let (_registry, server_addr, server_task) = start_server().await;

    // Write a line-delimited dump the way another instance would export it
    let dir = tempfile::tempdir().unwrap();
    let dump_path = dir.path().join("dump.jsonl");
    let mut payload = String::new();
    for name in ["svc-a", "svc-b"] {
        payload.push_str(&serde_json::to_string(&ConfigRecord::new(name).unwrap()).unwrap());
        payload.push('\n');
    }
    async_fs::write(&dump_path, payload).await.unwrap();

    let mut client = TestClient::connect(server_addr)
        .await
        .expect("Failed to connect client");

    let imported = client
        .expect_data(
            Action::ImportConfigs,
            json!({ "source": dump_path.to_str().unwrap() }),
        )
        .await
        .unwrap();
    assert_eq!(imported["imported"], 2);

    let listed = client
        .expect_data(Action::ListConfigs, json!({}))
        .await
        .unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 2);

    client.close().await.unwrap();
    drop(server_task);
}
