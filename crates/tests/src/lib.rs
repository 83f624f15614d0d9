//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置合约测试
//! - 回环端到端测试（入站监听 -> 分发器 -> 路由）

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ConfigVersion, Protocol};

    #[test]
    fn test_blueprint_from_toml() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
            [inbound]
            protocol = "udp"
            address = "239.0.0.1:5000"
            interface = "lo"

            [[routes]]
            name = "live"
            protocol = "udp"
            address = "127.0.0.1:6000"

            [[routes]]
            name = "lagged"
            protocol = "tcp"
            address = "127.0.0.1:6001"
            delay_ms = 2000
            replay = true
            "#,
            ConfigFormat::Toml,
        )
        .unwrap();

        assert_eq!(blueprint.version, ConfigVersion::V1);
        assert_eq!(blueprint.inbound.protocol, Protocol::Udp);
        assert_eq!(blueprint.routes.len(), 2);
        assert_eq!(blueprint.delayed_routes().count(), 1);
        assert!(blueprint.route("lagged").unwrap().replay);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::{Duration, Instant};

    use contracts::{ContractError, InboundConfig, Protocol, RouteConfig};
    use dispatcher::{create_dispatcher, DispatcherError, WorkerState};
    use ingestion::InboundListener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream, UdpSocket};
    use tokio::time::{sleep, timeout};

    async fn udp_inbound() -> InboundListener {
        InboundListener::bind(&InboundConfig::new(Protocol::Udp, "127.0.0.1:0"))
            .await
            .unwrap()
    }

    async fn receiver() -> (UdpSocket, String) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap().to_string();
        (socket, addr)
    }

    async fn recv_n(socket: &UdpSocket, n: usize) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        let mut buf = [0u8; 2048];
        for _ in 0..n {
            let len = timeout(Duration::from_secs(5), socket.recv(&mut buf))
                .await
                .expect("datagram timed out")
                .unwrap();
            out.push(buf[..len].to_vec());
        }
        out
    }

    /// Resolves once the listener has read `n` chunks
    async fn reads_reached(metrics: std::sync::Arc<ingestion::IngestionMetrics>, n: u64) {
        while metrics.snapshot().reads < n {
            sleep(Duration::from_millis(5)).await;
        }
    }

    /// UDP inbound -> three UDP routes, one of which has no receiver
    ///
    /// The two live receivers get every datagram with its boundary intact and
    /// the unreachable route does not fail the relay.
    #[tokio::test]
    async fn test_udp_fanout_survives_unreachable_route() {
        let listener = udp_inbound().await;
        let inbound_addr = listener.local_addr().unwrap();
        let metrics = listener.metrics();

        let (a, a_addr) = receiver().await;
        let (b, b_addr) = receiver().await;
        let (gone, gone_addr) = receiver().await;
        drop(gone);

        let dispatcher = create_dispatcher(vec![
            RouteConfig::new("a", Protocol::Udp, a_addr),
            RouteConfig::new("gone", Protocol::Udp, gone_addr),
            RouteConfig::new("b", Protocol::Udp, b_addr),
        ])
        .unwrap();

        // Datagrams queue in the bound socket until the listener runs
        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        for i in 0..10u8 {
            client
                .send_to(&vec![i; 100 + i as usize], inbound_addr)
                .await
                .unwrap();
        }

        let mut fanout = dispatcher.fanout();
        let inbound = async move {
            tokio::select! {
                result = listener.run(&mut fanout) => result.map_err(ContractError::from),
                _ = reads_reached(metrics, 10) => Ok(()),
            }
        };
        let reports = dispatcher.wait(inbound).await.unwrap();

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].metrics.sent_count, 10);
        assert_eq!(reports[2].metrics.sent_count, 10);
        assert!(reports.iter().all(|r| r.metrics.state == WorkerState::Closed));

        for socket in [&a, &b] {
            let got = recv_n(socket, 10).await;
            for (i, datagram) in got.iter().enumerate() {
                assert_eq!(datagram.len(), 100 + i);
                assert!(datagram.iter().all(|&byte| byte == i as u8));
            }
        }
    }

    /// Single-shot TCP inbound -> delayed TCP route
    #[tokio::test]
    async fn test_tcp_stream_arrives_byte_identical_after_delay() {
        let delay = Duration::from_millis(150);
        let listener = InboundListener::bind(&InboundConfig::new(Protocol::Tcp, "127.0.0.1:0"))
            .await
            .unwrap();
        let inbound_addr = listener.local_addr().unwrap();

        let downstream = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let route =
            RouteConfig::new("lagged", Protocol::Tcp, downstream.local_addr().unwrap().to_string())
                .with_delay(delay);

        let payload: Vec<u8> = (0..256 * 1024).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        let reader = tokio::spawn(async move {
            let (mut stream, _) = downstream.accept().await.unwrap();
            let mut first = [0u8; 1];
            stream.read_exact(&mut first).await.unwrap();
            let first_at = Instant::now();
            let mut rest = Vec::new();
            stream.read_to_end(&mut rest).await.unwrap();
            let mut all = first.to_vec();
            all.extend(rest);
            (all, first_at)
        });

        let dispatcher = create_dispatcher(vec![route]).unwrap();
        let started = Instant::now();
        let writer = tokio::spawn(async move {
            let mut stream = TcpStream::connect(inbound_addr).await.unwrap();
            stream.write_all(&payload).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        let mut fanout = dispatcher.fanout();
        let inbound = async move { listener.run(&mut fanout).await.map_err(ContractError::from) };
        let reports = dispatcher.wait(inbound).await.unwrap();
        writer.await.unwrap();

        let (received, first_at) = reader.await.unwrap();
        assert_eq!(received.len(), expected.len());
        assert!(received == expected);
        assert!(first_at.duration_since(started) >= delay);
        assert_eq!(reports[0].metrics.sent_bytes, expected.len() as u64);
        assert_eq!(reports[0].metrics.dropped_count, 0);
    }

    /// A zero-delay route forwards immediately while its delayed sibling waits
    #[tokio::test]
    async fn test_pass_through_beats_delayed_route() {
        let delay = Duration::from_millis(200);
        let listener = udp_inbound().await;
        let inbound_addr = listener.local_addr().unwrap();
        let metrics = listener.metrics();

        let (live, live_addr) = receiver().await;
        let (lagged, lagged_addr) = receiver().await;
        let dispatcher = create_dispatcher(vec![
            RouteConfig::new("live", Protocol::Udp, live_addr),
            RouteConfig::new("lagged", Protocol::Udp, lagged_addr).with_delay(delay),
        ])
        .unwrap();

        let arrival = |socket: UdpSocket| {
            tokio::spawn(async move {
                let got = recv_n(&socket, 1).await;
                (got, Instant::now())
            })
        };
        let live_rx = arrival(live);
        let lagged_rx = arrival(lagged);

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sent_at = Instant::now();
        client.send_to(b"hello", inbound_addr).await.unwrap();

        let mut fanout = dispatcher.fanout();
        let inbound = async move {
            tokio::select! {
                result = listener.run(&mut fanout) => result.map_err(ContractError::from),
                _ = reads_reached(metrics, 1) => Ok(()),
            }
        };
        dispatcher.wait(inbound).await.unwrap();

        let (live_got, live_at) = live_rx.await.unwrap();
        let (lagged_got, lagged_at) = lagged_rx.await.unwrap();
        assert_eq!(live_got[0], b"hello");
        assert_eq!(lagged_got[0], b"hello");
        assert!(live_at < lagged_at);
        assert!(lagged_at.duration_since(sent_at) >= delay);
    }

    /// Replay mode reproduces the gap between accepted chunks
    #[tokio::test]
    async fn test_replay_preserves_gaps() {
        let gap = Duration::from_millis(150);
        let listener = udp_inbound().await;
        let inbound_addr = listener.local_addr().unwrap();
        let metrics = listener.metrics();

        let (downstream, addr) = receiver().await;
        let dispatcher = create_dispatcher(vec![RouteConfig::new("replay", Protocol::Udp, addr)
            .with_delay(Duration::from_millis(50))
            .with_replay(None)])
        .unwrap();

        let rx = tokio::spawn(async move {
            let mut at = Vec::new();
            for _ in 0..2 {
                recv_n(&downstream, 1).await;
                at.push(Instant::now());
            }
            at
        });
        let tx = tokio::spawn(async move {
            let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            sleep(Duration::from_millis(20)).await;
            client.send_to(b"one", inbound_addr).await.unwrap();
            sleep(gap).await;
            client.send_to(b"two", inbound_addr).await.unwrap();
        });

        let mut fanout = dispatcher.fanout();
        let inbound = async move {
            tokio::select! {
                result = listener.run(&mut fanout) => result.map_err(ContractError::from),
                _ = reads_reached(metrics, 2) => Ok(()),
            }
        };
        let reports = dispatcher.wait(inbound).await.unwrap();
        tx.await.unwrap();

        let at = rx.await.unwrap();
        assert!(at[1].duration_since(at[0]) >= gap - Duration::from_millis(30));
        assert_eq!(reports[0].metrics.sent_count, 2);
        assert_eq!(reports[0].emit_lag_ms.map(|s| s.count), Some(2));
    }

    /// A chunk larger than one route's storage is dropped there only
    #[tokio::test]
    async fn test_oversized_chunk_is_isolated_to_one_route() {
        let listener = udp_inbound().await;
        let inbound_addr = listener.local_addr().unwrap();
        let metrics = listener.metrics();

        let (live, live_addr) = receiver().await;
        let (small, small_addr) = receiver().await;
        let dispatcher = create_dispatcher(vec![
            RouteConfig::new("live", Protocol::Udp, live_addr),
            RouteConfig::new("small", Protocol::Udp, small_addr)
                .with_delay(Duration::from_millis(10))
                .with_capacity(64, 16),
        ])
        .unwrap();

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(&[7u8; 128], inbound_addr).await.unwrap();
        client.send_to(&[9u8; 16], inbound_addr).await.unwrap();

        let mut fanout = dispatcher.fanout();
        let inbound = async move {
            tokio::select! {
                result = listener.run(&mut fanout) => result.map_err(ContractError::from),
                _ = reads_reached(metrics, 2) => Ok(()),
            }
        };
        let reports = dispatcher.wait(inbound).await.unwrap();

        assert_eq!(reports[0].metrics.sent_count, 2);
        assert_eq!(reports[1].metrics.dropped_count, 1);
        assert_eq!(reports[1].metrics.sent_count, 1);

        let live_got = recv_n(&live, 2).await;
        assert_eq!(live_got[0].len(), 128);
        assert_eq!(recv_n(&small, 1).await[0], vec![9u8; 16]);
    }

    /// An unreachable TCP route ends the relay with an error
    #[tokio::test]
    async fn test_tcp_dial_failure_fails_relay() {
        let closed = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().to_string()
        };
        let (_live, live_addr) = receiver().await;
        let listener = udp_inbound().await;

        let dispatcher = create_dispatcher(vec![
            RouteConfig::new("live", Protocol::Udp, live_addr),
            RouteConfig::new("down", Protocol::Tcp, closed),
        ])
        .unwrap();

        let mut fanout = dispatcher.fanout();
        let inbound = async move { listener.run(&mut fanout).await.map_err(ContractError::from) };
        let err = timeout(Duration::from_secs(5), dispatcher.wait(inbound))
            .await
            .expect("relay did not stop")
            .unwrap_err();
        assert!(matches!(err, DispatcherError::Dial { ref route, .. } if route == "down"));
    }
}
