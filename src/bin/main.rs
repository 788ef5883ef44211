//! Process entry point: loads settings from a JSON file next to the binary,
//! opens the configured serial device, brings the modem up and runs the
//! gateway forever.

use std::path::PathBuf;
use std::sync::Arc;

use boat_iot_gateway::config::GatewayConfig;
use boat_iot_gateway::error::{Error, Result};
use boat_iot_gateway::gateway::{Collaborators, Gateway};
use boat_iot_gateway::settings::{Settings, SettingsStore};

struct FileSettingsStore {
    path: PathBuf,
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| Error::Settings(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let contents = serde_json::to_string_pretty(settings).map_err(|e| Error::Settings(e.to_string()))?;
        std::fs::write(&self.path, contents).map_err(Error::Io)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let settings_path = std::env::var("GATEWAY_SETTINGS_PATH")
        .unwrap_or_else(|_| "gateway-settings.json".to_string());
    let settings_store: Arc<dyn SettingsStore> = Arc::new(FileSettingsStore {
        path: PathBuf::from(settings_path),
    });
    let settings = settings_store.load()?;

    let serial_device = std::env::var("GATEWAY_SERIAL_DEVICE").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let imei = std::env::var("GATEWAY_IMEI").unwrap_or_else(|_| "000000000000000".to_string());
    let hashed_imei = boat_iot_gateway::settings::hash_djb2(&imei);

    let config = GatewayConfig::new()
        .with_serial_device(serial_device.clone())
        .baud_rate(115_200u32)
        .with_apn(
            settings.apn_name.clone(),
            Some(settings.apn_username.clone()),
            Some(settings.apn_password.clone()),
        )
        .with_broker(settings.broker_host.clone(), settings.broker_port);

    let transport = boat_iot_gateway::serial::open(&serial_device, config.baud_rate_value(), config.flow_control_enabled())
        .map_err(Error::Io)?;

    let (gateway, mut urc_rx) = Gateway::new(config, transport, settings_store, hashed_imei, Collaborators::default());
    let gateway = Arc::new(gateway);

    let urc_gateway = gateway.clone();
    tokio::spawn(async move {
        while let Some(urc) = urc_rx.recv().await {
            match urc {
                boat_iot_gateway::modem::Urc::SmsReceived { index } => {
                    urc_gateway.handle_sms_notification(index).await;
                }
                other => log::debug!("urc: {other:?}"),
            }
        }
    });

    gateway.connect().await?;
    gateway.run().await;
    Ok(())
}
