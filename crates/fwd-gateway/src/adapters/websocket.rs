//! WebSocket transport and listener.
//!
//! Accepts TCP connections, optionally wraps them in TLS, performs the
//! upgrade on the configured path and hands the split socket to the gateway.

use crate::adapters::tls::load_tls_acceptor;
use crate::domain::config::GatewayConfig;
use crate::domain::error::{GatewayError, TransportError};
use crate::ports::outbound::{FrameSink, FrameSource};
use crate::service::gateway::Gateway;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Receiving half of an upgraded socket.
pub struct WsSource<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

impl<S> WsSource<S> {
    pub fn new(stream: SplitStream<WebSocketStream<S>>) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> FrameSource for WsSource<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn recv_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            let message = match self.stream.next().await {
                None => return Err(TransportError::Closed),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(message)) => message,
            };

            match message {
                Message::Binary(data) => return Ok(data),
                Message::Text(text) => return Ok(text.into_bytes()),
                Message::Close(frame) => {
                    return match frame {
                        None => Err(TransportError::Closed),
                        Some(f) if f.code == CloseCode::Normal => Err(TransportError::Closed),
                        Some(f) => Err(TransportError::Io(format!(
                            "closed with code {}: {}",
                            u16::from(f.code),
                            f.reason
                        ))),
                    };
                }
                // Pings are answered by the protocol layer.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }
}

/// Sending half of an upgraded socket.
pub struct WsSink<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

impl<S> WsSink<S> {
    pub fn new(sink: SplitSink<WebSocketStream<S>, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl<S> FrameSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        self.sink.send(Message::Binary(frame)).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink.close().await?;
        Ok(())
    }
}

/// Accept loop serving WebSocket clients.
pub struct WebSocketListener {
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    ws_path: Arc<str>,
    gateway: Arc<Gateway>,
}

impl WebSocketListener {
    /// Bind the configured address and load TLS material if enabled.
    pub async fn bind(config: &GatewayConfig, gateway: Arc<Gateway>) -> Result<Self, GatewayError> {
        let tls = config.tls.as_ref().map(load_tls_acceptor).transpose()?;

        let addr = config.listen_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;

        Ok(Self {
            listener,
            tls,
            ws_path: Arc::from(config.listen.ws_path.as_str()),
            gateway,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` fires.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            addr = ?self.listener.local_addr().ok(),
            path = %self.ws_path,
            tls = self.tls.is_some(),
            "WebSocket listener started"
        );

        loop {
            let accepted = tokio::select! {
                () = shutdown.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    continue;
                }
            };

            let tls = self.tls.clone();
            let path = self.ws_path.clone();
            let gateway = self.gateway.clone();
            tokio::spawn(async move {
                serve_socket(stream, peer, tls, &path, gateway).await;
            });
        }

        info!("WebSocket listener stopped");
    }
}

async fn serve_socket(
    stream: TcpStream,
    peer: SocketAddr,
    tls: Option<TlsAcceptor>,
    path: &str,
    gateway: Arc<Gateway>,
) {
    match tls {
        Some(acceptor) => match acceptor.accept(stream).await {
            Ok(tls_stream) => upgrade(tls_stream, peer, path, gateway).await,
            Err(e) => warn!(%peer, error = %e, "TLS handshake failed"),
        },
        None => upgrade(stream, peer, path, gateway).await,
    }
}

async fn upgrade<S>(stream: S, peer: SocketAddr, path: &str, gateway: Arc<Gateway>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let check_path = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if request.uri().path() == path {
            return Ok(response);
        }
        debug!(%peer, path = request.uri().path(), "Rejecting upgrade on unknown path");
        let mut rejection = ErrorResponse::new(Some("not found".to_string()));
        *rejection.status_mut() = StatusCode::NOT_FOUND;
        Err(rejection)
    };

    match tokio_tungstenite::accept_hdr_async(stream, check_path).await {
        Ok(socket) => {
            let (sink, stream) = socket.split();
            // The gateway tracks both loops; shutdown waits on them there.
            let _ = gateway.accept(peer, WsSource::new(stream), WsSink::new(sink));
        }
        Err(e) => warn!(%peer, error = %e, "WebSocket upgrade failed"),
    }
}
