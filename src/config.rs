//! Gateway configuration.
//!
//! A builder in the same shape as the upstream client's `Config<RST, DTR>`:
//! a `Default`-backed struct assembled through chained `with_*` calls, held
//! by the top-level [`crate::gateway::Gateway`] for the lifetime of the
//! process.

use std::time::Duration;

/// APN credentials for the PDP context the modem brings up before MQTT can
/// connect.
#[derive(Debug, Clone, Default)]
pub struct Apn {
    pub name: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub(crate) serial_device: String,
    pub(crate) baud_rate: u32,
    pub(crate) apn: Apn,
    pub(crate) broker_host: String,
    pub(crate) broker_port: u16,
    pub(crate) command_timeout: Duration,
    pub(crate) flow_control: bool,
    pub(crate) low_power_mode: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            serial_device: "/dev/ttyUSB0".into(),
            baud_rate: 115_200,
            apn: Apn::default(),
            broker_host: String::new(),
            broker_port: 1883,
            command_timeout: Duration::from_secs(8),
            flow_control: false,
            low_power_mode: false,
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_serial_device<S: Into<String>>(self, device: S) -> Self {
        GatewayConfig {
            serial_device: device.into(),
            ..self
        }
    }

    pub fn baud_rate<B: Into<u32>>(self, baud_rate: B) -> Self {
        GatewayConfig {
            baud_rate: baud_rate.into(),
            ..self
        }
    }

    pub fn with_apn<S: Into<String>>(self, name: S, username: Option<S>, password: Option<S>) -> Self {
        GatewayConfig {
            apn: Apn {
                name: name.into(),
                username: username.map(Into::into),
                password: password.map(Into::into),
            },
            ..self
        }
    }

    pub fn with_broker<S: Into<String>>(self, host: S, port: u16) -> Self {
        GatewayConfig {
            broker_host: host.into(),
            broker_port: port,
            ..self
        }
    }

    pub fn with_command_timeout(self, timeout: Duration) -> Self {
        GatewayConfig {
            command_timeout: timeout,
            ..self
        }
    }

    pub fn with_flow_control(self) -> Self {
        GatewayConfig {
            flow_control: true,
            ..self
        }
    }

    pub fn low_power_mode(self) -> Self {
        GatewayConfig {
            low_power_mode: true,
            ..self
        }
    }

    pub fn serial_device(&self) -> &str {
        &self.serial_device
    }

    pub fn baud_rate_value(&self) -> u32 {
        self.baud_rate
    }

    pub fn flow_control_enabled(&self) -> bool {
        self.flow_control
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_chains_independently_of_order() {
        let cfg = GatewayConfig::new()
            .with_serial_device("/dev/ttyS3")
            .baud_rate(9600u32)
            .with_broker("mqtt.example.com", 8883)
            .with_flow_control();

        assert_eq!(cfg.serial_device, "/dev/ttyS3");
        assert_eq!(cfg.baud_rate, 9600);
        assert_eq!(cfg.broker_host, "mqtt.example.com");
        assert_eq!(cfg.broker_port, 8883);
        assert!(cfg.flow_control);
        assert!(!cfg.low_power_mode);
    }
}
