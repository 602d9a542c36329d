use std::net::Ipv4Addr;

use crate::flow::{FlowClassifier, FlowId, FlowMonitor};
use crate::net::{DropReason, FiveTuple, NodeId, Packet, PacketKind, PacketObserver, Protocol};
use crate::sim::SimTime;

fn tuple(dst_port: u16) -> FiveTuple {
    FiveTuple {
        src: Ipv4Addr::new(10, 1, 1, 1),
        dst: Ipv4Addr::new(10, 1, 5, 1),
        protocol: Protocol::Udp,
        src_port: 49153,
        dst_port,
    }
}

fn pkt(id: u64, t: FiveTuple) -> Packet {
    // 72 + 28 = 100 字节
    Packet::new(id, t, 72, SimTime::ZERO, PacketKind::EchoRequest { seq: id })
}

fn ms(v: u64) -> SimTime {
    SimTime::from_millis(v)
}

#[test]
fn classifier_assigns_ids_in_first_seen_order() {
    let mut c = FlowClassifier::default();
    assert!(c.is_empty());
    assert_eq!(c.classify(&tuple(9)), FlowId(1));
    assert_eq!(c.classify(&tuple(10)), FlowId(2));
    assert_eq!(c.classify(&tuple(9)), FlowId(1));
    assert_eq!(c.find(&tuple(11)), None);
    assert_eq!(c.tuple(FlowId(2)), Some(&tuple(10)));
    assert_eq!(c.tuple(FlowId(0)), None);
    assert_eq!(c.len(), 2);
}

#[test]
fn delay_jitter_and_throughput_come_from_observed_timestamps() {
    let mut m = FlowMonitor::default();
    let t = tuple(9);
    let n = NodeId(0);

    // 延迟分别为 10ms、14ms、12ms
    m.on_send(n, &pkt(1, t), ms(0));
    m.on_receive(n, &pkt(1, t), ms(10));
    m.on_send(n, &pkt(2, t), ms(100));
    m.on_forward(n, &pkt(2, t), ms(105));
    m.on_receive(n, &pkt(2, t), ms(114));
    m.on_send(n, &pkt(3, t), ms(200));
    m.on_receive(n, &pkt(3, t), ms(212));

    let report = m.report();
    let s = report.get(&t).expect("flow");
    assert_eq!(s.flow_id, FlowId(1));
    assert_eq!((s.tx_packets, s.rx_packets, s.lost_packets), (3, 3, 0));
    assert_eq!((s.tx_bytes, s.rx_bytes), (300, 300));
    assert_eq!(s.times_forwarded, 1);
    assert_eq!(s.first_tx, Some(ms(0)));
    assert_eq!(s.last_rx, Some(ms(212)));

    let delay = s.mean_delay_s.expect("delay");
    assert!((delay - 0.012).abs() < 1e-12, "delay = {delay}");
    // |14-10| + |12-14| = 6ms，两个间隔
    let jitter = s.mean_jitter_s.expect("jitter");
    assert!((jitter - 0.003).abs() < 1e-12, "jitter = {jitter}");
    // 300 字节 * 8 / 0.212s
    let thr = s.throughput_bps.expect("throughput");
    assert!((thr - 2400.0 / 0.212).abs() < 1e-6, "throughput = {thr}");
    assert_eq!(s.in_flight(), 0);
}

#[test]
fn drops_count_as_lost_never_as_received() {
    let mut m = FlowMonitor::default();
    let t = tuple(9);
    let n = NodeId(1);

    m.on_send(n, &pkt(1, t), ms(0));
    m.on_drop(n, &pkt(1, t), DropReason::QueueOverflow, ms(0));
    m.on_send(n, &pkt(2, t), ms(1));
    m.on_drop(n, &pkt(2, t), DropReason::ErrorModel, ms(3));
    // 同一个包不会被重复计数
    m.on_drop(n, &pkt(2, t), DropReason::ErrorModel, ms(3));
    m.on_receive(n, &pkt(2, t), ms(4));
    m.on_send(n, &pkt(3, t), ms(2));

    let report = m.report();
    let s = report.get(&t).expect("flow");
    assert_eq!((s.tx_packets, s.rx_packets, s.lost_packets), (3, 0, 2));
    assert_eq!(s.drops.get(&DropReason::QueueOverflow), Some(&1));
    assert_eq!(s.drops.get(&DropReason::ErrorModel), Some(&1));
    assert_eq!(s.throughput_bps, None);
    assert_eq!(s.mean_delay_s, None);
    assert_eq!(s.in_flight(), 1);
    assert_eq!(m.in_flight(), 1);
}

#[test]
fn lost_packet_check_expires_old_in_flight_packets() {
    let mut m = FlowMonitor::default();
    let t = tuple(9);
    let n = NodeId(0);
    m.on_send(n, &pkt(1, t), ms(0));
    m.on_send(n, &pkt(2, t), SimTime::from_secs(25));

    m.check_for_lost_packets(SimTime::from_secs(30), SimTime::from_secs(10));

    let report = m.report();
    let s = report.get(&t).expect("flow");
    assert_eq!(s.lost_packets, 1);
    assert_eq!(s.drops.get(&DropReason::Timeout), Some(&1));
    assert_eq!(m.in_flight(), 1);
}

#[test]
fn report_lists_flows_by_id_and_prints_reference_format() {
    let mut m = FlowMonitor::default();
    let fwd = tuple(9);
    let back = fwd.reversed();
    m.on_send(NodeId(0), &pkt(1, fwd), ms(0));
    m.on_send(NodeId(4), &pkt(2, back), ms(5));
    m.on_receive(NodeId(0), &pkt(2, back), ms(10));

    let report = m.report();
    let ids: Vec<FlowId> = report.flows.iter().map(|f| f.flow_id).collect();
    assert_eq!(ids, vec![FlowId(1), FlowId(2)]);
    assert_eq!(report.flow(FlowId(2)).map(|f| f.tuple), Some(back));
    assert_eq!(
        (report.total_tx(), report.total_rx(), report.total_lost()),
        (2, 1, 0)
    );

    let text = report.to_string();
    assert!(text.contains("Flow 1 (10.1.1.1:49153 -> 10.1.5.1:9)"));
    assert!(text.contains("  Tx Packets: 1"));
    assert!(text.contains("  Lost Packets: 0"));
    // 100 字节 / 5ms = 160000 bit/s，按 1024*1024 换算
    assert!(text.contains("  Throughput: 0.152588 Mbps"), "{text}");
    assert!(text.contains("End-to-End Delay: 0.005000000 seconds"));
}

#[test]
fn report_json_omits_undefined_metrics() {
    let mut m = FlowMonitor::default();
    m.on_send(NodeId(0), &pkt(1, tuple(9)), ms(0));
    let json = serde_json::to_value(m.report()).expect("json");
    let flow = &json["flows"][0];
    assert_eq!(flow["tx_packets"], 1);
    assert_eq!(flow["rx_packets"], 0);
    assert!(flow.get("throughput_bps").is_none());
    assert!(flow.get("mean_delay_s").is_none());
    assert_eq!(flow["first_tx"], "0s");
}
