//! External collaborator boundaries: hardware and subsystem interfaces this
//! gateway depends on but does not implement itself. Each is a small async
//! trait with no hardware backend in this crate — only fakes for tests —
//! mirroring how the upstream client keeps `CellularConfig`'s reset/power
//! pins as a generic parameter rather than hard-wiring a board.

use crate::error::Result;

/// World Magnetic Model lookup: converts true heading/position to magnetic
/// variation. The source firmware recalculates this hourly
/// ([`crate::boatdata::windows::WMM_VALIDITY_MS`]) rather than per-fix.
pub trait MagneticModel: Send + Sync {
    fn variation_deg(&self, latitude_deg: f32, longitude_deg: f32, altitude_m: f32) -> Result<f32>;
}

/// Barometric pressure sensor.
pub trait PressureSensor: Send + Sync {
    async fn read_hpa(&self) -> Result<f32>;
}

/// Status LED, flashed on a successful publish.
pub trait StatusLed: Send + Sync {
    fn flash(&self, duration_ms: u32);
}

/// SMS PDU encode/decode, separated from the modem engine because the PDU
/// wire format (7-bit GSM packing, SMSC address, TP-DA) is independent of
/// the AT command transport carrying it.
pub trait SmsCodec: Send + Sync {
    fn encode_pdu(&self, phone_number: &str, text: &str) -> Result<Vec<u8>>;
    fn decode_pdu(&self, pdu: &[u8]) -> Result<(String, String)>;
}

/// Bluetooth SPP link used for local diagnostics/configuration, kept
/// separate from the cellular uplink.
pub trait BluetoothSpp: Send + Sync {
    async fn write(&self, data: &[u8]) -> Result<()>;
    async fn read(&self) -> Result<Vec<u8>>;
}

/// NMEA-2000 (CAN) bus bridge, an alternate instrument source alongside the
/// NMEA-0183 serial ports.
pub trait N2kBus: Send + Sync {
    async fn recv_frame(&self) -> Result<Vec<u8>>;
}
