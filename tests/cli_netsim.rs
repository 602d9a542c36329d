use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "netsim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

const SCENARIO: &str = r#"
{
    "schema_version": 1,
    "seed": 5,
    "stop_time": "30s",
    "topology": { "kind": "chain", "routers": 2, "data_rate": "1Mbps", "queue": "QUEUE" },
    "echo_servers": [ { "node": "server", "port": 9, "start": "1s" } ],
    "echo_clients": [
        { "node": "client", "remote": "server", "port": 9,
          "max_packets": 10, "interval": "1s", "packet_size": 1024, "start": "2s" }
    ]
}
"#;

fn run_netsim(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_netsim"))
        .args(args)
        .output()
        .expect("run netsim")
}

fn read_report(path: &PathBuf) -> Value {
    let raw = fs::read_to_string(path).expect("read report.json");
    serde_json::from_str(&raw).expect("parse report.json")
}

#[test]
fn netsim_prints_and_writes_flow_report() {
    let dir = unique_temp_dir("report");
    let scenario = write_file(&dir, "scenario.json", &SCENARIO.replace("QUEUE", "100"));
    let out_json = dir.join("report.json");

    let output = run_netsim(&[
        "--scenario",
        scenario.to_str().unwrap(),
        "--report-json",
        out_json.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "netsim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("=== Flow Statistics ==="), "stdout={stdout}");
    assert!(stdout.contains("Flow 1 (10.1.1.1:49153 -> 10.1.3.2:9)"));
    assert!(stdout.contains("Throughput:"));

    let v = read_report(&out_json);
    let flows = v["flows"].as_array().expect("flows array");
    assert_eq!(flows.len(), 2);
    assert_eq!(flows[0]["flow_id"], 1);
    assert_eq!(flows[0]["tx_packets"], 10);
    assert_eq!(flows[0]["rx_packets"], 10);
    assert_eq!(flows[0]["lost_packets"], 0);
    assert!(flows[0]["throughput_bps"].as_f64().unwrap_or(0.0) > 0.0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn netsim_zero_queue_loses_every_request() {
    let dir = unique_temp_dir("zero-queue");
    let scenario = write_file(&dir, "scenario.json", &SCENARIO.replace("QUEUE", "0"));
    let out_json = dir.join("report.json");

    let output = run_netsim(&[
        "--scenario",
        scenario.to_str().unwrap(),
        "--report-json",
        out_json.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let v = read_report(&out_json);
    let flows = v["flows"].as_array().expect("flows array");
    assert_eq!(flows.len(), 1);
    assert_eq!(flows[0]["tx_packets"], 10);
    assert_eq!(flows[0]["rx_packets"], 0);
    assert_eq!(flows[0]["lost_packets"], 10);
    assert!(flows[0].get("throughput_bps").is_none());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn netsim_preset_is_deterministic_for_a_seed() {
    let dir = unique_temp_dir("determinism");
    let a = dir.join("a.json");
    let b = dir.join("b.json");
    for out in [&a, &b] {
        let output = run_netsim(&[
            "--preset",
            "assignment",
            "--seed",
            "11",
            "--report-json",
            out.to_str().unwrap(),
        ]);
        assert!(output.status.success());
    }
    let raw_a = fs::read_to_string(&a).expect("read a");
    let raw_b = fs::read_to_string(&b).expect("read b");
    assert_eq!(raw_a, raw_b);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn netsim_writes_viz_json_with_meta_first() {
    let dir = unique_temp_dir("viz");
    let out_json = dir.join("viz.json");
    let output = run_netsim(&[
        "--preset",
        "chain",
        "--stop-s",
        "3",
        "--viz-json",
        out_json.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let raw = fs::read_to_string(&out_json).expect("read viz.json");
    let v: Value = serde_json::from_str(&raw).expect("parse viz.json");
    let arr = v.as_array().expect("viz.json must be a JSON array");
    assert_eq!(arr[0].get("kind").and_then(|k| k.as_str()), Some("meta"));
    assert!(arr.iter().any(|e| e["kind"] == "receive"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn netsim_rejects_unknown_nodes() {
    let dir = unique_temp_dir("bad");
    let scenario = write_file(
        &dir,
        "scenario.json",
        &SCENARIO
            .replace("QUEUE", "100")
            .replace(r#""node": "client""#, r#""node": "nobody""#),
    );
    let output = run_netsim(&["--scenario", scenario.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown node nobody"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn netsim_rejects_negative_or_nan_stop_time() {
    for stop in ["--stop-s=-1", "--stop-s=NaN"] {
        let output = run_netsim(&["--preset", "chain", stop]);
        assert_eq!(output.status.code(), Some(2), "{stop}");
        assert!(
            String::from_utf8_lossy(&output.stderr).contains("invalid time"),
            "{stop}: stderr={}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}
