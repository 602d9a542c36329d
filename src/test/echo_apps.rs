use crate::app::{Application, ClientState, EchoClient, EchoClientConfig, EchoServer};
use crate::error::{ConfigError, RunError};
use crate::net::{NetConfig, NodeId};
use crate::runner::SimRunner;
use crate::sim::SimTime;
use crate::topo::{ChainOpts, build_chain};

fn chain_runner(routers: usize) -> (SimRunner, NodeId, NodeId) {
    let (topo, client, server) = build_chain(&ChainOpts {
        routers,
        ..ChainOpts::default()
    })
    .expect("chain");
    (SimRunner::new(topo, NetConfig::default()), client, server)
}

fn server_addr(runner: &SimRunner, server: NodeId) -> std::net::Ipv4Addr {
    runner.net().topology().addr_of(server).expect("server addr")
}

#[test]
fn client_and_server_complete_an_echo_exchange() {
    let (mut runner, client, server) = chain_runner(1);
    let remote = server_addr(&runner, server);
    let (sim, net) = runner.parts_mut();
    let srv = net
        .install_echo_server(server, 9, sim, SimTime::from_secs(1), None)
        .expect("server");
    let cfg = EchoClientConfig::new(remote, 9)
        .with_max_packets(3)
        .with_interval(SimTime::from_secs(1))
        .with_packet_size(256);
    let cli = net
        .install_echo_client(client, cfg, sim, SimTime::from_secs(2), None)
        .expect("client");
    runner.run().expect("run");

    let c = runner.net().app::<EchoClient>(cli).expect("client app");
    assert_eq!(c.sent(), 3);
    assert_eq!(c.replies(), 3);
    assert_eq!(c.state(), ClientState::Idle);
    // 286 字节 @ 10Mbps = 228.8us；往返 4 跳，每跳另加 1ms
    assert_eq!(c.rtts(), &[SimTime(4 * 1_228_800); 3]);

    let s = runner.net().app::<EchoServer>(srv).expect("server app");
    assert_eq!(s.received(), 3);
    assert_eq!(s.echoed(), 3);
    assert!(s.is_running());

    // 请求流 + 回包流
    let report = runner.report().expect("report");
    assert_eq!(report.len(), 2);
    assert_eq!(
        runner.sim().now(),
        SimTime::from_secs(4).saturating_add(SimTime(4 * 1_228_800))
    );
}

#[test]
fn stopping_the_client_cancels_pending_sends() {
    let (mut runner, client, server) = chain_runner(0);
    let remote = server_addr(&runner, server);
    let (sim, net) = runner.parts_mut();
    net.install_echo_server(server, 9, sim, SimTime::ZERO, None)
        .expect("server");
    let cfg = EchoClientConfig::new(remote, 9)
        .with_max_packets(10)
        .with_interval(SimTime::from_secs(1));
    let cli = net
        .install_echo_client(
            client,
            cfg,
            sim,
            SimTime::ZERO,
            Some(SimTime::from_millis(2_500)),
        )
        .expect("client");
    runner.run().expect("run");

    let c = runner.net().app::<EchoClient>(cli).expect("client app");
    assert_eq!(c.sent(), 3);
    assert_eq!(c.state(), ClientState::Idle);
    assert_eq!(runner.sim().skipped(), 1);
}

#[test]
fn stopped_server_ignores_requests() {
    let (mut runner, client, server) = chain_runner(0);
    let remote = server_addr(&runner, server);
    let (sim, net) = runner.parts_mut();
    let srv = net
        .install_echo_server(server, 9, sim, SimTime::ZERO, Some(SimTime::from_secs(1)))
        .expect("server");
    let cli = net
        .install_echo_client(
            client,
            EchoClientConfig::new(remote, 9),
            sim,
            SimTime::from_secs(2),
            None,
        )
        .expect("client");
    runner.run().expect("run");

    let s = runner.net().app::<EchoServer>(srv).expect("server app");
    assert!(!s.is_running());
    assert_eq!(s.received(), 0);
    assert_eq!(s.ignored(), 1);
    let c = runner.net().app::<EchoClient>(cli).expect("client app");
    assert_eq!(c.sent(), 1);
    assert_eq!(c.replies(), 0);
    assert!(matches!(c.state(), ClientState::WaitingResponse { remaining: Some(0) }));
}

#[test]
fn unlimited_client_keeps_sending_until_the_stop_time() {
    let (mut runner, client, server) = chain_runner(0);
    let remote = server_addr(&runner, server);
    let (sim, net) = runner.parts_mut();
    net.install_echo_server(server, 9, sim, SimTime::ZERO, None)
        .expect("server");
    let cfg = EchoClientConfig::new(remote, 9)
        .with_max_packets(0)
        .with_interval(SimTime::from_secs(1));
    let cli = net
        .install_echo_client(client, cfg, sim, SimTime::ZERO, None)
        .expect("client");
    runner.configure(1, SimTime::from_millis(5_500));
    runner.run().expect("run");

    let c = runner.net().app::<EchoClient>(cli).expect("client app");
    assert_eq!(c.sent(), 6);
    assert_eq!(c.replies(), 6);
    assert!(matches!(c.state(), ClientState::WaitingResponse { remaining: None }));
}

#[test]
fn clients_get_sequential_ephemeral_ports() {
    let (mut runner, client, server) = chain_runner(0);
    let remote = server_addr(&runner, server);
    let (sim, net) = runner.parts_mut();
    let a = net
        .install_echo_client(client, EchoClientConfig::new(remote, 9), sim, SimTime::ZERO, None)
        .expect("client a");
    let b = net
        .install_echo_client(client, EchoClientConfig::new(remote, 9), sim, SimTime::ZERO, None)
        .expect("client b");
    let pa = net.app::<EchoClient>(a).expect("a").port();
    let pb = net.app::<EchoClient>(b).expect("b").port();
    assert_eq!((pa, pb), (49153, 49154));
}

#[test]
fn install_rejects_invalid_applications() {
    let (mut runner, client, server) = chain_runner(0);
    let remote = server_addr(&runner, server);
    let (sim, net) = runner.parts_mut();

    net.install_echo_server(server, 9, sim, SimTime::ZERO, None)
        .expect("server");
    assert_eq!(
        net.install_echo_server(server, 9, sim, SimTime::ZERO, None),
        Err(ConfigError::PortInUse { node: server.0, port: 9 })
    );
    assert!(matches!(
        net.install_echo_server(NodeId(42), 9, sim, SimTime::ZERO, None),
        Err(ConfigError::UnknownNode(_))
    ));

    let zero = EchoClientConfig::new(remote, 9)
        .with_max_packets(5)
        .with_interval(SimTime::ZERO);
    assert_eq!(
        net.install_echo_client(client, zero, sim, SimTime::ZERO, None),
        Err(ConfigError::ZeroInterval)
    );
    let single = zero.with_max_packets(1);
    assert!(
        net.install_echo_client(client, single, sim, SimTime::ZERO, None)
            .is_ok()
    );

    assert!(matches!(
        net.install_echo_server(
            server,
            10,
            sim,
            SimTime::from_secs(5),
            Some(SimTime::from_secs(1))
        ),
        Err(ConfigError::StopBeforeStart { .. })
    ));
}

#[test]
fn report_is_only_available_after_the_run() {
    let (mut runner, _client, _server) = chain_runner(0);
    assert!(matches!(runner.report(), Err(RunError::NotFinished)));
    assert!(!runner.is_finished());
    runner.run().expect("run");
    assert!(runner.is_finished());
    assert!(runner.report().expect("report").is_empty());
    assert!(matches!(runner.run(), Err(RunError::AlreadyRun)));
}
