//! # Distributed Ownership
//!
//! Two gateway instances share one connection registry and one directive bus,
//! as they would through Redis. A user may hold a live connection on only one
//! of them; logging in elsewhere tears the old socket down.
//!
//! ## Flow Tested:
//!
//! 1. Login on `node-a` claims the user for `node-a`
//! 2. Login on `node-b` revokes the claim and publishes `DELETE USER <id>` on
//!    the `node-a` topic
//! 3. `node-a`'s directive listener stops the stale socket
//! 4. The stale teardown leaves `node-b`'s claim intact

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    use fwd_gateway::domain::{Request, Response};
    use fwd_gateway::testing::{gateway_with_handlers, socket_pair, ClientSocket};
    use fwd_gateway::{
        spawn_directive_listener, ConnectionTasks, ContainerId, DistributedRegistry, Gateway,
        InMemoryAccountStore, InMemoryConnectionRegistry, UserId,
    };
    use shared_bus::{Directive, DirectivePublisher, DirectiveSource, InMemoryDirectiveBus};

    const WAIT: Duration = Duration::from_secs(2);

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    /// Two instances wired to the same shared backends.
    struct Cluster {
        node_a: Arc<Gateway>,
        node_b: Arc<Gateway>,
        registry: Arc<InMemoryConnectionRegistry>,
        bus: Arc<InMemoryDirectiveBus>,
        shutdown: CancellationToken,
    }

    impl Cluster {
        fn new() -> Self {
            let registry = Arc::new(InMemoryConnectionRegistry::new());
            let bus = Arc::new(InMemoryDirectiveBus::new());
            let accounts = Arc::new(InMemoryAccountStore::new().with_account(42, "alice", "pw42"));
            let shutdown = CancellationToken::new();

            let start = |container: &str| {
                let gateway = gateway_with_handlers(
                    container,
                    registry.clone(),
                    bus.clone(),
                    accounts.clone(),
                    None,
                );
                spawn_directive_listener(gateway.clone(), bus.subscribe(container), shutdown.clone());
                gateway
            };
            let node_a = start("node-a");
            let node_b = start("node-b");

            Self {
                node_a,
                node_b,
                registry,
                bus,
                shutdown,
            }
        }

        async fn owner(&self) -> Option<ContainerId> {
            self.registry.owner(UserId::new(42)).await.unwrap()
        }
    }

    impl Drop for Cluster {
        fn drop(&mut self) {
            self.shutdown.cancel();
        }
    }

    fn connect(gateway: &Arc<Gateway>, port: u16) -> (ConnectionTasks, ClientSocket) {
        let endpoint: SocketAddr = format!("10.0.1.1:{port}").parse().unwrap();
        let (source, sink, client) = socket_pair();
        (gateway.accept(endpoint, source, sink), client)
    }

    async fn login(client: &mut ClientSocket) {
        client.send_request(&Request::login(42, "pw42"));
        let response = client.next_response(WAIT).await.expect("login response");
        assert_eq!(response, Response::login(true, 42, "login successful"));
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_login_elsewhere_closes_previous_socket() {
        let cluster = Cluster::new();

        let (first_tasks, mut first) = connect(&cluster.node_a, 6001);
        login(&mut first).await;
        assert_eq!(cluster.owner().await, Some(ContainerId::from("node-a")));

        let (_second_tasks, mut second) = connect(&cluster.node_b, 6002);
        login(&mut second).await;

        assert!(first.closed_within(WAIT).await);
        timeout(WAIT, first_tasks.join()).await.unwrap();

        assert!(cluster.node_a.connections().is_empty());
        assert!(cluster.node_b.connections().contains("42"));
        assert_eq!(cluster.owner().await, Some(ContainerId::from("node-b")));
    }

    #[tokio::test]
    async fn test_revocation_publishes_delete_directive() {
        let cluster = Cluster::new();
        let mut observer = cluster.bus.subscribe("node-a");

        let (_first_tasks, mut first) = connect(&cluster.node_a, 6011);
        login(&mut first).await;
        let (_second_tasks, mut second) = connect(&cluster.node_b, 6012);
        login(&mut second).await;

        let payload = timeout(WAIT, observer.next_payload()).await.unwrap().unwrap();
        assert_eq!(Directive::parse(&payload).unwrap(), Directive::DeleteUser(42));
        assert!(cluster.bus.published() >= 1);
    }

    #[tokio::test]
    async fn test_ownership_moves_back_and_forth() {
        let cluster = Cluster::new();

        let (_a1_tasks, mut a1) = connect(&cluster.node_a, 6021);
        login(&mut a1).await;
        let (_b_tasks, mut b) = connect(&cluster.node_b, 6022);
        login(&mut b).await;
        let (_a2_tasks, mut a2) = connect(&cluster.node_a, 6023);
        login(&mut a2).await;

        assert!(a1.closed_within(WAIT).await);
        assert!(b.closed_within(WAIT).await);
        assert_eq!(cluster.owner().await, Some(ContainerId::from("node-a")));
        assert!(cluster.node_a.connections().contains("42"));
        assert!(cluster.node_b.connections().is_empty());
    }

    #[tokio::test]
    async fn test_relogin_on_same_instance_replaces_connection() {
        let cluster = Cluster::new();
        let mut observer = cluster.bus.subscribe("node-a");

        let (_first_tasks, mut first) = connect(&cluster.node_a, 6031);
        login(&mut first).await;
        let (_second_tasks, mut second) = connect(&cluster.node_a, 6032);
        login(&mut second).await;

        assert!(first.closed_within(WAIT).await);
        assert_eq!(cluster.node_a.connections().len(), 1);
        assert_eq!(cluster.owner().await, Some(ContainerId::from("node-a")));

        // Local duplicates are closed directly, without a directive.
        assert!(timeout(Duration::from_millis(100), observer.next_payload())
            .await
            .is_err());

        second.send_request(&Request::post(42, b"still here".to_vec()));
        assert_eq!(
            second.next_response(WAIT).await,
            Some(Response::delivery(42, b"still here".to_vec()))
        );
    }

    #[tokio::test]
    async fn test_external_delete_directive_releases_user() {
        let cluster = Cluster::new();
        let (tasks, mut client) = connect(&cluster.node_a, 6041);
        login(&mut client).await;

        cluster
            .bus
            .publish(&Directive::DeleteUser(42).to_bytes(), "node-a")
            .await
            .unwrap();

        assert!(client.closed_within(WAIT).await);
        timeout(WAIT, tasks.join()).await.unwrap();
        assert!(cluster.node_a.connections().is_empty());
        assert_eq!(cluster.owner().await, None);
    }

    #[tokio::test]
    async fn test_directive_for_other_instance_is_ignored() {
        let cluster = Cluster::new();
        let (_tasks, mut client) = connect(&cluster.node_a, 6051);
        login(&mut client).await;

        cluster
            .bus
            .publish(&Directive::DeleteUser(42).to_bytes(), "node-b")
            .await
            .unwrap();

        assert!(!client.closed_within(Duration::from_millis(200)).await);
        assert!(cluster.node_a.connections().contains("42"));
    }
}
