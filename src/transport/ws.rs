use super::{Transport, TransportEvent, TransportPair, TransportSink};
use crate::types::{LinkError, Result, CLOSE_ABNORMAL, CLOSE_NORMAL};
use async_trait::async_trait;
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Production transport over tokio-tungstenite.
#[derive(Debug, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, endpoint: &str) -> Result<TransportPair> {
        tracing::debug!("Opening WebSocket connection to {}", endpoint);
        let (ws_stream, _response) = connect_async(endpoint).await?;
        let (write_half, read_half) = ws_stream.split();

        let stream = read_half
            .filter_map(|msg| async move {
                match msg {
                    Ok(Message::Text(text)) => {
                        Some(Ok(TransportEvent::Text(text.to_string())))
                    }
                    Ok(Message::Close(frame)) => {
                        let (code, reason) = frame
                            .map(|f| (u16::from(f.code), f.reason.to_string()))
                            .unwrap_or((CLOSE_ABNORMAL, String::new()));
                        Some(Ok(TransportEvent::Closed { code, reason }))
                    }
                    // Protocol-level keepalive; tungstenite answers pings itself
                    Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => None,
                    Ok(Message::Binary(data)) => {
                        tracing::warn!("Ignoring unexpected binary frame ({} bytes)", data.len());
                        None
                    }
                    Ok(Message::Frame(_)) => None,
                    Err(e) => Some(Err(LinkError::WebSocket(e))),
                }
            })
            .boxed();

        Ok(TransportPair {
            sink: Box::new(WsSink {
                inner: write_half,
            }),
            stream,
        })
    }
}

struct WsSink {
    inner: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
}

#[async_trait]
impl TransportSink for WsSink {
    async fn transmit(&mut self, text: &str) -> Result<()> {
        self.inner.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        tracing::debug!("Closing WebSocket (code {})", CLOSE_NORMAL);
        self.inner.close().await?;
        Ok(())
    }
}
