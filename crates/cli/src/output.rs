//! Output formatting for CLI responses

use anyhow::Error;
use boardpilot_codec::{Behavior, ConfigField, FieldValue, KeyDef, TrackpadRegisters, bytes_to_hex};
use boardpilot_ipc::{Device, DeviceUpdate};
use colored::*;
use serde_json::{Value, json};

use crate::error::CliError;

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format output as JSON: {}", e),
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<CliError>() {
        Some(CliError::DeviceNotFound(_)) => "DeviceNotFound",
        Some(CliError::NoDevice) => "NoDevice",
        Some(CliError::ValidationError(_)) => "ValidationError",
        Some(CliError::ServiceUnavailable(_)) => "ServiceUnavailable",
        Some(CliError::DeviceRejected(_)) => "DeviceRejected",
        Some(CliError::InvalidConfiguration(_)) => "InvalidConfiguration",
        Some(CliError::Ipc(_)) => "ServiceError",
        Some(CliError::IoError(_)) => "IoError",
        Some(CliError::JsonError(_)) => "JsonError",
        None => "Error",
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    print_json(&json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error)
        }
    }));
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

pub fn print_success(message: &str, json: bool) {
    if json {
        print_json(&json!({ "success": true, "message": message }));
    } else {
        println!("{} {}", "✓".green(), message);
    }
}

fn device_json(device: &Device, selected: bool) -> Value {
    let info = device.info();
    json!({
        "serial": device.serial(),
        "product": info.product.product,
        "manufacturer": info.product.manufacturer,
        "vid": info.product.vid,
        "pid": info.product.pid,
        "rev": info.product.rev,
        "protocol": info.device.protocol,
        "selected": selected,
    })
}

pub fn print_device_list(devices: &[Device], selected: Option<&Device>, json: bool, detailed: bool) {
    let is_selected = |device: &Device| selected.is_some_and(|s| s == device);

    if json {
        let list: Vec<Value> = devices
            .iter()
            .map(|device| device_json(device, is_selected(device)))
            .collect();
        print_json(&json!({ "success": true, "devices": list }));
        return;
    }

    if devices.is_empty() {
        println!("{}", "No devices found".yellow());
        return;
    }

    println!("{}", "Connected Devices:".bold());
    for device in devices {
        let info = device.info();
        let marker = if is_selected(device) {
            "●".green()
        } else {
            "○".normal()
        };
        println!(
            "  {} {} ({})",
            marker,
            info.product.product.bold(),
            device.serial().dimmed()
        );
        if detailed {
            println!("    Manufacturer: {}", info.product.manufacturer);
            println!(
                "    USB id: {:04x}:{:04x} rev {}",
                info.product.vid, info.product.pid, info.product.rev
            );
            println!("    Connection: {}", info.device.protocol);
        }
    }
}

pub fn print_device_update(update: &DeviceUpdate, json: bool) {
    match update {
        DeviceUpdate::Single(device) => {
            if json {
                print_json(&json!({ "event": "connected", "device": device_json(device, false) }));
            } else {
                println!(
                    "{} {} ({})",
                    "+".green(),
                    device.product_name(),
                    device.serial()
                );
            }
        }
        DeviceUpdate::List(devices) => {
            if json {
                let list: Vec<Value> = devices.iter().map(|d| device_json(d, false)).collect();
                print_json(&json!({ "event": "list", "devices": list }));
            } else {
                println!("{} {} device(s) connected", "~".yellow(), devices.len());
            }
        }
    }
}

pub fn print_field_list(json: bool) {
    if json {
        let list: Vec<Value> = ConfigField::KNOWN
            .iter()
            .map(|field| {
                json!({
                    "name": field.name(),
                    "id": field.id(),
                    "range": field.range(),
                    "persisted": field.is_persisted(),
                })
            })
            .collect();
        print_json(&json!({ "success": true, "fields": list }));
        return;
    }

    println!("{}", "Config Fields:".bold());
    for field in ConfigField::KNOWN {
        let storage = if field.is_persisted() {
            "persisted".green()
        } else {
            "transient".yellow()
        };
        println!(
            "  0x{:04x}  {:<26} {}",
            field.id(),
            field.name().unwrap_or_default(),
            storage
        );
    }
}

pub fn print_field_value(field: ConfigField, value: &FieldValue, json: bool) {
    if json {
        print_json(&json!({ "success": true, "field": field.to_string(), "value": value }));
        return;
    }

    println!("{} {}", "Field:".bold(), field);
    match value {
        FieldValue::Keymap(defs) => print_key_defs_human(defs),
        FieldValue::TrackpadRegisters(regs) => print_trackpad_human(regs),
        FieldValue::Sensitivity(v) | FieldValue::ScrollDirection(v) | FieldValue::ClickType(v) => {
            println!("  Value: {}", v)
        }
        FieldValue::SleepTimeout(v) => println!("  Value: {} s", v),
        FieldValue::DateTime(dt) => println!(
            "  Timestamp: {} (UTC offset {} s)",
            dt.unix_timestamp, dt.utc_offset_secs
        ),
        FieldValue::Raw(bytes) => println!("  Data: {}", bytes_to_hex(bytes)),
    }
}

pub fn print_raw(field: ConfigField, data: &[u8], json: bool) {
    if json {
        print_json(&json!({ "success": true, "field": field.to_string(), "data": bytes_to_hex(data) }));
    } else {
        println!("{}", bytes_to_hex(data));
    }
}

fn behavior_label(def: &KeyDef) -> String {
    def.behavior()
        .map(Behavior::name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("#{}", def.device))
}

fn print_key_defs_human(defs: &[KeyDef]) {
    if defs.is_empty() {
        println!("  {}", "No rebinds".yellow());
        return;
    }
    println!("  {:>5} {:>5}  {:<16} {:>10} {:>10}", "key", "layer", "behavior", "param1", "param2");
    for def in defs {
        println!(
            "  {:>5} {:>5}  {:<16} {:>#10x} {:>#10x}",
            def.key,
            def.layer,
            behavior_label(def),
            def.param1,
            def.param2
        );
    }
}

pub fn print_keymap(defs: &[KeyDef], json: bool) {
    if json {
        let list: Vec<Value> = defs
            .iter()
            .map(|def| {
                json!({
                    "key": def.key,
                    "layer": def.layer,
                    "behavior": def.behavior().map(Behavior::name),
                    "behavior_id": def.device,
                    "param1": def.param1,
                    "param2": def.param2,
                })
            })
            .collect();
        print_json(&json!({ "success": true, "keymap": list }));
    } else {
        println!("{} ({} rebinds)", "Keymap:".bold(), defs.len());
        print_key_defs_human(defs);
    }
}

fn print_trackpad_human(regs: &TrackpadRegisters) {
    let labels = |list: Vec<&'static str>| {
        if list.is_empty() {
            "none".dimmed().to_string()
        } else {
            list.join(", ")
        }
    };
    println!("  Active refresh rate: {} ms", regs.active_refresh_rate);
    println!("  Idle refresh rate: {} ms", regs.idle_refresh_rate);
    println!("  Single finger gestures: {}", labels(regs.single_finger_labels()));
    println!("  Multi finger gestures: {}", labels(regs.multi_finger_labels()));
    println!("  Tap time: {} ms", regs.tap_time);
    println!("  Tap distance: {}", regs.tap_distance);
    println!("  Touch multiplier: {}", regs.touch_multiplier);
    println!("  Debounce: {}", regs.debounce);
    println!("  I2C timeout: {}", regs.i2c_timeout);
    println!("  Filters: {}", labels(regs.filter_labels()));
    println!(
        "  Dynamic filter: beta {} speed {}..{}",
        regs.filter_dyn_bottom_beta, regs.filter_dyn_lower_speed, regs.filter_dyn_upper_speed
    );
    println!("  Initial scroll distance: {}", regs.init_scroll_distance);
}

pub fn print_trackpad(regs: &TrackpadRegisters, json: bool) {
    if json {
        print_json(&json!({
            "success": true,
            "registers": regs,
            "single_finger_gestures": regs.single_finger_labels(),
            "multi_finger_gestures": regs.multi_finger_labels(),
            "filters": regs.filter_labels(),
        }));
    } else {
        println!("{}", "Trackpad Registers:".bold());
        print_trackpad_human(regs);
    }
}

pub fn print_sensitivities(values: &[(&'static str, u8)], json: bool) {
    if json {
        let map: serde_json::Map<String, Value> = values
            .iter()
            .map(|(label, value)| ((*label).to_string(), json!(value)))
            .collect();
        print_json(&json!({ "success": true, "sensitivity": map }));
    } else {
        println!("{}", "Sensitivity:".bold());
        for (label, value) in values {
            println!("  {:<7} {}", label, value);
        }
    }
}
