use anyhow::Result;
use bmumon_lib::{BatteryMonitor, BatterySnapshot, Clock, Transport};
use log::{error, info};
use serde_json::json;
use std::time::Duration;

/// Uptime as `HH:MM:SS`; hours keep counting past a day.
pub fn format_uptime(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

pub fn render_text(snapshot: &BatterySnapshot) -> String {
    if !snapshot.is_valid() {
        return format!("error: {}", snapshot.error);
    }
    [
        format!("status: {:?}", snapshot.status),
        format!("serial: {}", snapshot.serial),
        format!(
            "capacity: {}% {} mAh remaining, {} mAh actual, {} mAh factory",
            snapshot.remaining_capacity_percent,
            snapshot.remaining_capacity,
            snapshot.actual_capacity,
            snapshot.factory_capacity
        ),
        format!("state of health: {}%", snapshot.state_of_health()),
        format!(
            "voltage: {:.2} V current: {:.2} A power: {:.2} W",
            snapshot.voltage, snapshot.current, snapshot.power
        ),
        format!(
            "temperatures: {} °C {} °C",
            snapshot.temperatures[0], snapshot.temperatures[1]
        ),
        format!("cells: {:?} mV", snapshot.cell_voltages),
        format!("uptime: {}", format_uptime(snapshot.uptime)),
    ]
    .join("\n")
}

pub fn render_json(snapshot: &BatterySnapshot) -> Result<String> {
    let value = json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "state_of_health": snapshot.state_of_health(),
        "snapshot": serde_json::to_value(snapshot)?,
    });
    Ok(serde_json::to_string(&value)?)
}

pub fn run<T: Transport, C: Clock>(
    mut monitor: BatteryMonitor<T, C>,
    interval: Duration,
    json: bool,
) -> Result<()> {
    info!("Starting daemon mode: interval={interval:?}, json={json}");
    loop {
        let snapshot = monitor.poll();
        if !snapshot.is_valid() {
            error!("Error reading snapshot: {}", snapshot.error);
        }
        if json {
            match render_json(&snapshot) {
                Ok(line) => println!("{line}"),
                Err(e) => error!("Failed to serialize snapshot: {e}"),
            }
        } else {
            println!("--- Data at {} ---", chrono::Local::now().to_rfc3339());
            println!("{}", render_text(&snapshot));
            println!("--------------------------");
        }
        std::thread::sleep(interval);
    }
}
