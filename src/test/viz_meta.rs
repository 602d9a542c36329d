use crate::app::EchoClientConfig;
use crate::net::{DropReason, NetConfig, NodeKind};
use crate::runner::SimRunner;
use crate::sim::SimTime;
use crate::topo::{ChainOpts, build_chain};
use crate::viz::{VizEventKind, VizLogger};

fn chain_with_viz(opts: &ChainOpts) -> SimRunner {
    let (topo, client, server) = build_chain(opts).expect("chain");
    let remote = topo.addr_of(server).expect("server addr");
    let mut runner = SimRunner::new(topo, NetConfig::default());
    runner.net_mut().viz = Some(VizLogger::default());
    let (sim, net) = runner.parts_mut();
    net.install_echo_server(server, 9, sim, SimTime::ZERO, None)
        .expect("server");
    net.install_echo_client(client, EchoClientConfig::new(remote, 9), sim, SimTime::ZERO, None)
        .expect("client");
    runner
}

#[test]
fn viz_meta_describes_nodes_and_links() {
    let mut runner = chain_with_viz(&ChainOpts {
        routers: 1,
        queue_pkts: 7,
        ..ChainOpts::default()
    });
    runner.run().expect("run");

    let events = &runner.net().viz.as_ref().expect("viz enabled").events;
    assert_eq!(events[0].t_ns, 0);
    assert_eq!(events[0].pkt_id, None);
    let (nodes, links) = match &events[0].kind {
        VizEventKind::Meta { nodes, links } => (nodes, links),
        _ => panic!("expected Meta event"),
    };

    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].name, "client");
    assert_eq!(nodes[1].kind, NodeKind::Router);
    assert_eq!(nodes[1].addrs, vec!["10.1.1.2", "10.1.2.1"]);
    assert_eq!(nodes[2].addrs, vec!["10.1.2.2"]);

    assert_eq!(links.len(), 2);
    assert_eq!((links[1].a, links[1].b), (1, 2));
    assert_eq!(links[0].bandwidth_bps, 10_000_000);
    assert_eq!(links[0].latency_ns, 1_000_000);
    assert_eq!(links[0].q_cap_pkts, 7);

    let json = serde_json::to_value(&events[0]).expect("json");
    assert_eq!(json["kind"], "meta");
    assert!(json["nodes"][0].get("position").is_none());
}

#[test]
fn viz_records_one_packet_hop_by_hop() {
    let mut runner = chain_with_viz(&ChainOpts {
        routers: 1,
        ..ChainOpts::default()
    });
    runner.run().expect("run");

    let events = &runner.net().viz.as_ref().expect("viz enabled").events;
    let request: Vec<&str> = events
        .iter()
        .filter(|e| e.pkt_id == Some(0))
        .map(|e| match &e.kind {
            VizEventKind::Send { .. } => "send",
            VizEventKind::Enqueue { .. } => "enqueue",
            VizEventKind::TxStart { .. } => "tx_start",
            VizEventKind::Forward { .. } => "forward",
            VizEventKind::Receive { .. } => "receive",
            VizEventKind::Drop { .. } => "drop",
            VizEventKind::Meta { .. } => "meta",
        })
        .collect();
    assert_eq!(
        request,
        vec![
            "send", "enqueue", "tx_start", "forward", "enqueue", "tx_start", "receive"
        ]
    );

    let tx = events
        .iter()
        .find_map(|e| match e.kind {
            VizEventKind::TxStart { depart_ns, arrive_ns, .. } => Some((e.t_ns, depart_ns, arrive_ns)),
            _ => None,
        })
        .expect("tx_start");
    // 1052 + 2 字节 @ 10Mbps
    assert_eq!(tx, (0, 843_200, 1_843_200));
    assert!(events.iter().any(|e| e.pkt_id == Some(1)), "reply recorded");
}

#[test]
fn viz_records_drop_reason() {
    let mut runner = chain_with_viz(&ChainOpts {
        routers: 0,
        error_rate: 1.0,
        ..ChainOpts::default()
    });
    runner.run().expect("run");

    let events = &runner.net().viz.as_ref().expect("viz enabled").events;
    let last = events.last().expect("events");
    assert!(matches!(
        last.kind,
        VizEventKind::Drop { node: 1, reason: DropReason::ErrorModel }
    ));
    let json = serde_json::to_value(last).expect("json");
    assert_eq!(json["reason"], "error_model");
}
