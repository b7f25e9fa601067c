use serde_json::{json, Value};
use serialport::{SerialPortInfo, SerialPortType};

use crate::modbus::UnitAddress;
use crate::services::ScanResult;
use crate::utils::error::ChangeFailure;

pub trait ReportFormatter: Send + Sync {
    fn format_scan(&self, result: &ScanResult) -> String;
    fn format_change(
        &self,
        current: UnitAddress,
        new: UnitAddress,
        outcome: &Result<(), ChangeFailure>,
    ) -> String;
    fn format_ports(&self, ports: &[SerialPortInfo]) -> String;
}

fn join(units: &[UnitAddress]) -> String {
    units.iter().map(|u| u.to_string()).collect::<Vec<_>>().join(", ")
}

pub struct ConsoleFormatter;

impl ReportFormatter for ConsoleFormatter {
    fn format_scan(&self, result: &ScanResult) -> String {
        let mut output = if result.is_empty() {
            String::from("❌ No devices found.\n")
        } else {
            format!(
                "✅ Found {} device(s) at addresses: {}\n",
                result.len(),
                join(result.present())
            )
        };

        if !result.inconclusive().is_empty() {
            output.push_str(&format!(
                "⚠️  Echo-like replies, not counted: {}\n",
                join(result.inconclusive())
            ));
        }
        for (unit, code) in result.exceptions() {
            output.push_str(&format!("   📵 Unit {} answered with {}\n", unit, code));
        }
        output
    }

    fn format_change(
        &self,
        current: UnitAddress,
        new: UnitAddress,
        outcome: &Result<(), ChangeFailure>,
    ) -> String {
        match outcome {
            Ok(()) => format!("✅ Address {} successfully changed to {}.\n", current, new),
            Err(e) => format!("❌ Failed to change device address: {}\n", e),
        }
    }

    fn format_ports(&self, ports: &[SerialPortInfo]) -> String {
        let mut output = String::from("📡 Available Serial Ports:\n");
        if ports.is_empty() {
            output.push_str("   ⚠️  No serial ports found\n");
            return output;
        }

        for (index, port) in ports.iter().enumerate() {
            output.push_str(&format!("   {}. {}\n", index + 1, port.port_name));
            if let SerialPortType::UsbPort(usb_info) = &port.port_type {
                if let Some(manufacturer) = &usb_info.manufacturer {
                    output.push_str(&format!("      📱 Manufacturer: {}\n", manufacturer));
                }
                if let Some(serial_number) = &usb_info.serial_number {
                    output.push_str(&format!("      🔢 Serial Number: {}\n", serial_number));
                }
            }
        }
        output
    }
}

pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format_scan(&self, result: &ScanResult) -> String {
        let exceptions: Vec<Value> = result
            .exceptions()
            .iter()
            .map(|(unit, code)| json!({ "unit": unit.get(), "exception_code": code.code() }))
            .collect();

        let json_data = json!({
            "present": result.present().iter().map(|u| u.get()).collect::<Vec<_>>(),
            "inconclusive": result.inconclusive().iter().map(|u| u.get()).collect::<Vec<_>>(),
            "exceptions": exceptions,
            "probes": result.probes(),
        });
        format!("{}\n", serde_json::to_string_pretty(&json_data).unwrap_or_default())
    }

    fn format_change(
        &self,
        current: UnitAddress,
        new: UnitAddress,
        outcome: &Result<(), ChangeFailure>,
    ) -> String {
        let json_data = json!({
            "current": current.get(),
            "new": new.get(),
            "success": outcome.is_ok(),
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        });
        format!("{}\n", serde_json::to_string_pretty(&json_data).unwrap_or_default())
    }

    fn format_ports(&self, ports: &[SerialPortInfo]) -> String {
        let ports: Vec<Value> = ports
            .iter()
            .map(|port| {
                let kind = match &port.port_type {
                    SerialPortType::UsbPort(_) => "usb",
                    SerialPortType::PciPort => "pci",
                    SerialPortType::BluetoothPort => "bluetooth",
                    SerialPortType::Unknown => "unknown",
                };
                json!({ "name": port.port_name, "type": kind })
            })
            .collect();
        format!("{}\n", serde_json::to_string_pretty(&ports).unwrap_or_default())
    }
}
