//! # Session Flow
//!
//! One gateway instance driven end to end through in-memory sockets:
//! signup, login, forwarding between two users, direct sends and logout.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    use fwd_gateway::domain::{Request, Response};
    use fwd_gateway::testing::{gateway_with_handlers, socket_pair, ClientSocket, RecordingPublisher};
    use fwd_gateway::{
        ConnectionTasks, ContainerId, DistributedRegistry, Gateway, GatewayApi,
        InMemoryAccountStore, InMemoryConnectionRegistry, UserId,
    };

    const WAIT: Duration = Duration::from_secs(2);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct Instance {
        gateway: Arc<Gateway>,
        registry: Arc<InMemoryConnectionRegistry>,
    }

    fn instance(accounts: InMemoryAccountStore) -> Instance {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let gateway = gateway_with_handlers(
            "node-a",
            registry.clone(),
            Arc::new(RecordingPublisher::default()),
            Arc::new(accounts),
            None,
        );
        Instance { gateway, registry }
    }

    fn connect(gateway: &Arc<Gateway>, port: u16) -> (ConnectionTasks, ClientSocket) {
        let endpoint: SocketAddr = format!("10.0.0.1:{port}").parse().unwrap();
        let (source, sink, client) = socket_pair();
        (gateway.accept(endpoint, source, sink), client)
    }

    async fn login(client: &mut ClientSocket, user: i64, password: &str) {
        client.send_request(&Request::login(user, password));
        let response = client.next_response(WAIT).await.expect("login response");
        assert_eq!(response, Response::login(true, user, "login successful"));
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_signup_then_login_with_assigned_id() {
        let node = instance(InMemoryAccountStore::new());
        let (_tasks, mut client) = connect(&node.gateway, 5001);

        client.send_request(&Request::signup("carol", "secret"));
        let response = client.next_response(WAIT).await.unwrap();
        assert_eq!(response, Response::signup(true, 10_000, "signup successful"));

        login(&mut client, 10_000, "secret").await;

        assert!(node.gateway.connections().contains("10000"));
        assert_eq!(
            node.registry.owner(UserId::new(10_000)).await.unwrap(),
            Some(ContainerId::from("node-a"))
        );
    }

    #[tokio::test]
    async fn test_signup_sends_exactly_one_response() {
        let node = instance(InMemoryAccountStore::new());
        let (_tasks, mut client) = connect(&node.gateway, 5002);

        client.send_request(&Request::signup("dave", "pw"));
        assert!(client.next_response(WAIT).await.is_some());
        assert_eq!(client.next_response(Duration::from_millis(200)).await, None);

        assert!(node.gateway.connections().contains("10.0.0.1:5002"));
        assert!(node.registry.is_empty());
    }

    #[tokio::test]
    async fn test_post_forwarded_between_users() {
        let node = instance(
            InMemoryAccountStore::new()
                .with_account(42, "alice", "pw42")
                .with_account(43, "bob", "pw43"),
        );
        let (_alice_tasks, mut alice) = connect(&node.gateway, 5003);
        let (_bob_tasks, mut bob) = connect(&node.gateway, 5004);

        login(&mut alice, 42, "pw42").await;
        login(&mut bob, 43, "pw43").await;

        alice.send_request(&Request::post(43, b"hello bob".to_vec()));

        let delivered = bob.next_response(WAIT).await.unwrap();
        assert_eq!(delivered, Response::delivery(42, b"hello bob".to_vec()));
    }

    #[tokio::test]
    async fn test_post_before_login_is_refused() {
        let node = instance(InMemoryAccountStore::new().with_account(43, "bob", "pw43"));
        let (_bob_tasks, mut bob) = connect(&node.gateway, 5005);
        let (_tasks, mut stranger) = connect(&node.gateway, 5006);
        login(&mut bob, 43, "pw43").await;

        stranger.send_request(&Request::post(43, b"spam".to_vec()));

        assert_eq!(stranger.next_response(WAIT).await, Some(Response::refused()));
        assert_eq!(bob.next_response(Duration::from_millis(200)).await, None);
    }

    #[tokio::test]
    async fn test_send_message_reaches_logged_in_user() {
        let node = instance(InMemoryAccountStore::new().with_account(42, "alice", "pw42"));
        let (_tasks, mut client) = connect(&node.gateway, 5007);
        login(&mut client, 42, "pw42").await;

        node.gateway
            .send_message(UserId::new(42), b"server push".to_vec())
            .await
            .unwrap();

        let frame = timeout(WAIT, client.next_frame()).await.unwrap();
        assert_eq!(frame, Some(b"server push".to_vec()));
    }

    #[tokio::test]
    async fn test_logout_releases_ownership() {
        let node = instance(InMemoryAccountStore::new().with_account(42, "alice", "pw42"));
        let (tasks, mut client) = connect(&node.gateway, 5008);
        login(&mut client, 42, "pw42").await;

        client.send_request(&Request::logout());

        assert!(client.closed_within(WAIT).await);
        timeout(WAIT, tasks.join()).await.unwrap();
        assert!(node.gateway.connections().is_empty());
        assert_eq!(node.registry.owner(UserId::new(42)).await.unwrap(), None);
    }
}
