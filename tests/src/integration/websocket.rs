//! # WebSocket Transport
//!
//! A gateway runtime bound to a loopback port with TLS disabled, driven by a
//! real tokio-tungstenite client.

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};
    use std::time::Duration;

    use futures::{SinkExt, StreamExt};
    use tokio::net::TcpStream;
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::{self, Message};
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    use fwd_gateway::domain::{Request, Response};
    use fwd_gateway::{BincodeCodec, GatewayConfig};
    use gateway_runtime::GatewayRuntime;

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    const WAIT: Duration = Duration::from_secs(5);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn start_runtime() -> GatewayRuntime {
        let mut config = GatewayConfig {
            tls: None,
            ..GatewayConfig::default()
        };
        config.listen.host = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config.listen.port = 0;
        config.container_id = "ws-node".into();

        GatewayRuntime::start(config).await.unwrap()
    }

    async fn open(addr: SocketAddr) -> Client {
        let (client, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        client
    }

    async fn request(client: &mut Client, request: &Request) {
        let frame = BincodeCodec::new().encode_request(request).unwrap();
        client.send(Message::Binary(frame)).await.unwrap();
    }

    /// Next binary frame decoded as a response, skipping control frames.
    async fn response(client: &mut Client) -> Response {
        timeout(WAIT, async {
            loop {
                match client.next().await {
                    Some(Ok(Message::Binary(frame))) => {
                        return BincodeCodec::new().decode_response(&frame).unwrap();
                    }
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {other:?}"),
                }
            }
        })
        .await
        .unwrap()
    }

    /// Whether the server closes the socket within `WAIT`.
    async fn closed(client: &mut Client) -> bool {
        timeout(WAIT, async {
            loop {
                match client.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await
        .is_ok()
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_signup_and_login_over_websocket() {
        let runtime = start_runtime().await;
        let mut client = open(runtime.local_addr()).await;

        request(&mut client, &Request::signup("erin", "hunter2")).await;
        assert_eq!(
            response(&mut client).await,
            Response::signup(true, 10_000, "signup successful")
        );

        request(&mut client, &Request::login(10_000, "hunter2")).await;
        assert_eq!(
            response(&mut client).await,
            Response::login(true, 10_000, "login successful")
        );
        assert!(runtime.gateway().connections().contains("10000"));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unauthenticated_post_refused_over_websocket() {
        let runtime = start_runtime().await;
        let mut client = open(runtime.local_addr()).await;

        request(&mut client, &Request::post(1, b"hi".to_vec())).await;
        assert_eq!(response(&mut client).await, Response::refused());

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_logout_closes_websocket() {
        let runtime = start_runtime().await;
        let mut client = open(runtime.local_addr()).await;

        request(&mut client, &Request::logout()).await;
        assert!(closed(&mut client).await);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_login_closes_first_websocket() {
        let runtime = start_runtime().await;
        let mut first = open(runtime.local_addr()).await;
        let mut second = open(runtime.local_addr()).await;

        request(&mut first, &Request::signup("frank", "pw")).await;
        let _ = response(&mut first).await;

        request(&mut first, &Request::login(10_000, "pw")).await;
        let _ = response(&mut first).await;
        request(&mut second, &Request::login(10_000, "pw")).await;
        assert_eq!(
            response(&mut second).await,
            Response::login(true, 10_000, "login successful")
        );

        assert!(closed(&mut first).await);
        assert_eq!(runtime.gateway().connections().len(), 1);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_path_rejected_with_404() {
        let runtime = start_runtime().await;

        let err = connect_async(format!("ws://{}/other", runtime.local_addr()))
            .await
            .err()
            .unwrap();
        match err {
            tungstenite::Error::Http(response) => assert_eq!(response.status().as_u16(), 404),
            other => panic!("unexpected error: {other}"),
        }

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_pipelined_requests_answered_before_logout_close() {
        let runtime = start_runtime().await;
        let mut client = open(runtime.local_addr()).await;

        request(&mut client, &Request::signup("hank", "pw")).await;
        request(&mut client, &Request::post(1, b"too early".to_vec())).await;
        request(&mut client, &Request::logout()).await;

        assert_eq!(
            response(&mut client).await,
            Response::signup(true, 10_000, "signup successful")
        );
        assert_eq!(response(&mut client).await, Response::refused());
        assert!(closed(&mut client).await);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_live_connections() {
        let runtime = start_runtime().await;
        let mut client = open(runtime.local_addr()).await;

        request(&mut client, &Request::signup("gina", "pw")).await;
        let _ = response(&mut client).await;

        runtime.shutdown().await;
        assert!(closed(&mut client).await);
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_connection_teardown() {
        let runtime = start_runtime().await;
        let gateway = runtime.gateway().clone();
        let mut client = open(runtime.local_addr()).await;

        request(&mut client, &Request::signup("ivy", "pw")).await;
        let _ = response(&mut client).await;
        request(&mut client, &Request::login(10_000, "pw")).await;
        let _ = response(&mut client).await;
        assert!(gateway.connections().contains("10000"));

        runtime.shutdown().await;

        // Teardown has already run by the time shutdown returns.
        assert!(gateway.connections().is_empty());
        assert!(closed(&mut client).await);
    }
}
