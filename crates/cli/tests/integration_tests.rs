//! Integration tests for boardctl
//!
//! Commands that need the service run against a scripted stand-in listening
//! on a loopback port.

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const SERIAL: &str = "ABC123";

/// Stand-in service; records every write request it receives
struct FakeService {
    port: u16,
    writes: Arc<Mutex<Vec<Value>>>,
}

impl FakeService {
    fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let writes = Arc::new(Mutex::new(Vec::new()));

        let recorded = Arc::clone(&writes);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                serve_connection(stream, &recorded);
            }
        });
        Ok(Self { port, writes })
    }

    fn writes(&self) -> Vec<Value> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

fn reply_for(request: &Value) -> Value {
    let cmd = request.get("cmd").and_then(Value::as_u64).unwrap_or_default();
    let reqid = request.get("reqid").cloned().unwrap_or(Value::Null);
    let field = request.get("field").cloned().unwrap_or(Value::Null);

    match cmd {
        0x01 => json!({ "cmd": 1, "status": true, "reqid": reqid }),
        0x10 => json!({
            "cmd": 0x10,
            "status": true,
            "reqid": reqid,
            "devices": [{
                "product": { "vid": 0x1d50, "pid": 0x615e, "manufacturer": "hid:ergo", "product": "Bolt", "rev": 1 },
                "device": { "serial": SERIAL, "protocol": "usb" }
            }]
        }),
        0x41 => {
            let data = match field.as_u64() {
                Some(0x20) => "ff".repeat(64 * 11),
                Some(0x40) => "1e".to_string(),
                Some(0x41) => "0a".to_string(),
                Some(0x42) => "05".to_string(),
                Some(0x8001) => "0a00320003039600190000000403050500021900".to_string(),
                _ => String::new(),
            };
            json!({ "cmd": 0x41, "status": true, "reqid": reqid, "device": SERIAL, "field": field, "data": data })
        }
        0x40 => json!({ "cmd": 0x40, "status": true, "reqid": reqid, "device": SERIAL, "field": field }),
        other => json!({ "cmd": other, "status": false, "reqid": reqid }),
    }
}

fn serve_connection(stream: TcpStream, writes: &Arc<Mutex<Vec<Value>>>) {
    let Ok(reader) = stream.try_clone() else {
        return;
    };
    let mut writer = stream;
    let requests = serde_json::Deserializer::from_reader(reader).into_iter::<Value>();
    for request in requests.flatten() {
        if request.get("cmd").and_then(Value::as_u64) == Some(0x40) {
            if let Ok(mut w) = writes.lock() {
                w.push(request.clone());
            }
        }
        let reply = reply_for(&request).to_string();
        if writer.write_all(reply.as_bytes()).is_err() {
            return;
        }
    }
}

struct Harness {
    _dir: TempDir,
    config_path: PathBuf,
}

impl Harness {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let config_path = dir.path().join("boardctl.json");
        Ok(Self {
            _dir: dir,
            config_path,
        })
    }

    fn boardctl(&self, port: u16) -> Result<Command, Box<dyn std::error::Error>> {
        let mut cmd = Command::cargo_bin("boardctl")?;
        cmd.env_remove("BOARDCTL_ADDRESS")
            .env_remove("BOARDCTL_PORT")
            .arg("--config")
            .arg(&self.config_path)
            .arg("--port")
            .arg(port.to_string());
        Ok(cmd)
    }
}

fn unused_port() -> Result<u16, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[test]
fn test_cli_help() -> TestResult {
    Command::cargo_bin("boardctl")?
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("hid:ergo"));
    Ok(())
}

#[test]
fn test_cli_version() -> TestResult {
    Command::cargo_bin("boardctl")?
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("boardctl"));
    Ok(())
}

#[test]
fn test_completion_generation() -> TestResult {
    Command::cargo_bin("boardctl")?
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_boardctl"));
    Ok(())
}

#[test]
fn test_field_list_json_works_offline() -> TestResult {
    let output = Command::cargo_bin("boardctl")?
        .args(["--json", "field", "list"])
        .output()?;
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout)?;
    let fields = value.get("fields").and_then(Value::as_array).ok_or("no fields")?;
    assert_eq!(fields.len(), 12);
    let keymap = fields
        .iter()
        .find(|f| f.get("name") == Some(&json!("KEYMAP")))
        .ok_or("no KEYMAP entry")?;
    assert_eq!(keymap.get("id"), Some(&json!(0x20)));
    assert_eq!(keymap.get("persisted"), Some(&json!(true)));
    Ok(())
}

#[test]
fn test_service_unavailable_exit_code() -> TestResult {
    let harness = Harness::new()?;
    harness
        .boardctl(unused_port()?)?
        .args(["--json", "device", "list"])
        .assert()
        .code(5)
        .stdout(predicate::str::contains("ServiceUnavailable"));
    Ok(())
}

#[test]
fn test_invalid_payload_rejected_before_connecting() -> TestResult {
    let harness = Harness::new()?;
    harness
        .boardctl(unused_port()?)?
        .args(["config", "write", "mouse_sensitivity", "abc"])
        .assert()
        .code(4);
    Ok(())
}

#[test]
fn test_device_list_json() -> TestResult {
    let service = FakeService::start()?;
    let harness = Harness::new()?;

    let output = harness
        .boardctl(service.port)?
        .args(["--json", "device", "list"])
        .output()?;
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(value.get("success"), Some(&json!(true)));
    let device = value
        .get("devices")
        .and_then(Value::as_array)
        .and_then(|d| d.first())
        .ok_or("no device")?;
    assert_eq!(device.get("serial"), Some(&json!(SERIAL)));
    assert_eq!(device.get("selected"), Some(&json!(true)));
    Ok(())
}

#[test]
fn test_sensitivity_show() -> TestResult {
    let service = FakeService::start()?;
    let harness = Harness::new()?;

    let output = harness
        .boardctl(service.port)?
        .args(["--json", "sensitivity", "show"])
        .output()?;
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(
        value.get("sensitivity"),
        Some(&json!({ "mouse": 30, "scroll": 10, "pan": 5 }))
    );
    Ok(())
}

#[test]
fn test_keymap_set_writes_packed_table() -> TestResult {
    let service = FakeService::start()?;
    let harness = Harness::new()?;

    harness
        .boardctl(service.port)?
        .args(["keymap", "set", "13", "0", "KEY_PRESS", "0x70005"])
        .assert()
        .success();

    let writes = service.writes();
    let write = writes.first().ok_or("no write recorded")?;
    assert_eq!(write.get("field"), Some(&json!(0x20)));
    assert_eq!(write.get("save"), Some(&json!(true)));
    let data = write.get("data").and_then(Value::as_str).ok_or("no data")?;
    assert!(data.starts_with("d000060500070000000000"));
    assert_eq!(data.len(), 64 * 11 * 2);
    Ok(())
}

#[test]
fn test_trackpad_set_unknown_register() -> TestResult {
    let harness = Harness::new()?;
    harness
        .boardctl(unused_port()?)?
        .args(["trackpad", "set", "warp_speed", "3"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("tap_time"));
    Ok(())
}

#[test]
fn test_trackpad_set_no_save() -> TestResult {
    let service = FakeService::start()?;
    let harness = Harness::new()?;

    harness
        .boardctl(service.port)?
        .args(["trackpad", "set", "tap_time", "200", "--no-save"])
        .assert()
        .success();

    let writes = service.writes();
    let write = writes.first().ok_or("no write recorded")?;
    assert_eq!(write.get("field"), Some(&json!(0x8001)));
    assert_eq!(write.get("save"), Some(&json!(false)));
    assert_eq!(
        write.get("data"),
        Some(&json!("0a0032000303c800190000000403050500021900"))
    );
    Ok(())
}

#[test]
fn test_config_write_saves_custom_field() -> TestResult {
    let service = FakeService::start()?;
    let harness = Harness::new()?;
    let regs = "0a0032000303c800190000000403050500021900";

    harness
        .boardctl(service.port)?
        .args(["config", "write", "custom_iqs5xx_regs", regs])
        .assert()
        .success();
    harness
        .boardctl(service.port)?
        .args(["config", "write", "datetime", "0000000000000000"])
        .assert()
        .success();

    let writes = service.writes();
    let custom = writes.first().ok_or("no write recorded")?;
    assert_eq!(custom.get("field"), Some(&json!(0x8001)));
    assert_eq!(custom.get("save"), Some(&json!(true)));
    assert_eq!(custom.get("data"), Some(&json!(regs)));

    let clock = writes.get(1).ok_or("second write missing")?;
    assert_eq!(clock.get("field"), Some(&json!(0x4000)));
    assert_eq!(clock.get("save"), Some(&json!(false)));
    Ok(())
}

#[test]
fn test_device_select_persists_default() -> TestResult {
    let service = FakeService::start()?;
    let harness = Harness::new()?;

    harness
        .boardctl(service.port)?
        .args(["device", "select", "NOPE"])
        .assert()
        .code(2);

    harness
        .boardctl(service.port)?
        .args(["device", "select", SERIAL])
        .assert()
        .success();

    let saved: Value = serde_json::from_str(&std::fs::read_to_string(&harness.config_path)?)?;
    assert_eq!(saved.get("default_device"), Some(&json!(SERIAL)));
    assert_eq!(saved.get("schema_version"), Some(&json!("boardpilot.config/1")));
    Ok(())
}
