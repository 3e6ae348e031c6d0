//! Serial port discovery by description substring.

use serialport::SerialPortType;
use tracing::{debug, info};

use crate::error::{DeviceError, DeviceResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    pub port_name: String,
    /// Human-readable description (USB manufacturer/product where known).
    pub description: String,
}

/// Enumerate the serial ports present on this machine.
pub fn list_ports() -> DeviceResult<Vec<PortDescriptor>> {
    let ports = serialport::available_ports()?;
    let ports: Vec<PortDescriptor> = ports
        .into_iter()
        .map(|info| PortDescriptor {
            description: describe(&info.port_type),
            port_name: info.port_name,
        })
        .collect();
    debug!(count = ports.len(), "enumerated serial ports");
    Ok(ports)
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut parts: Vec<String> = Vec::new();
            if let Some(manufacturer) = &usb.manufacturer {
                parts.push(manufacturer.clone());
            }
            if let Some(product) = &usb.product {
                parts.push(product.clone());
            }
            parts.push(format!("[{:04x}:{:04x}]", usb.vid, usb.pid));
            parts.join(" ")
        }
        SerialPortType::PciPort => "PCI serial port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

/// First port whose description contains `pattern`, ignoring case.
pub fn find_port<'a>(ports: &'a [PortDescriptor], pattern: &str) -> Option<&'a PortDescriptor> {
    let needle = pattern.to_lowercase();
    ports
        .iter()
        .find(|p| p.description.to_lowercase().contains(&needle))
}

/// Resolve `pattern` to a port name on this machine.
pub fn select_port(pattern: &str) -> DeviceResult<String> {
    let ports = list_ports()?;
    match find_port(&ports, pattern) {
        Some(port) => {
            info!(port = %port.port_name, description = %port.description, pattern, "serial port selected");
            Ok(port.port_name.clone())
        }
        None => Err(DeviceError::NotFound {
            pattern: pattern.to_string(),
        }),
    }
}
