//! Drives a handful of raw NMEA-0183 sentences through decode, ingestion
//! into the boat-data snapshot, and composition of the telemetry frame the
//! publisher would hand to MQTT — the seam between the three modules that no
//! single unit test covers.

use std::sync::Arc;

use boat_iot_gateway::boatdata::BoatData;
use boat_iot_gateway::bus::Ingestor;
use boat_iot_gateway::error::Result;
use boat_iot_gateway::nmea::decode::{decode_dpt, decode_mtw, decode_rmc};
use boat_iot_gateway::nmea::sentence::{self, parse};
use boat_iot_gateway::publisher::Publisher;
use boat_iot_gateway::settings::{Settings, SettingsStore};

struct MemoryStore(std::sync::Mutex<Settings>);

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<Settings> {
        Ok(self.0.lock().unwrap().clone())
    }
    fn save(&self, settings: &Settings) -> Result<()> {
        *self.0.lock().unwrap() = settings.clone();
        Ok(())
    }
}

fn checksummed(body: &str) -> String {
    let sum = sentence::checksum(body.as_bytes());
    format!("${body}*{sum:02X}")
}

#[test]
fn decoded_sentences_feed_the_telemetry_frame() {
    let boat_data = Arc::new(BoatData::new());
    let ingestor = Ingestor::new(boat_data.clone());

    let rmc = checksummed("GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W");
    let (_, rmc_fields) = parse(&rmc).unwrap();
    ingestor.ingest_rmc(&decode_rmc(&rmc_fields).unwrap());

    let mtw = checksummed("IIMTW,17.2,C");
    let (_, mtw_fields) = parse(&mtw).unwrap();
    ingestor.ingest_mtw(&decode_mtw(&mtw_fields).unwrap());

    let dpt = checksummed("SDDPT,12.3,0.5");
    let (_, dpt_fields) = parse(&dpt).unwrap();
    ingestor.ingest_dpt(&decode_dpt(&dpt_fields).unwrap());

    let publisher = Publisher::new(
        boat_data.clone(),
        Arc::new(MemoryStore(std::sync::Mutex::new(Settings::default()))),
        0x1234_5678,
    );

    let t_ms = boat_iot_gateway::timebase::now_ms();
    let frame = publisher.compose_frame(18, t_ms, 60);
    let parts: Vec<&str> = frame.split(',').collect();

    // signal,cog,temp,sog,boatspeed,log,trip,heading,depth,tws,twa,aws,awa,lat,lon,pressure,period
    assert_eq!(parts.len(), 17);
    assert_eq!(parts[0], "18");
    assert_eq!(parts[2], "17.2"); // seawater temperature, from MTW
    assert_eq!(parts[3], "22.4"); // speed over ground, from RMC
    assert_eq!(parts[8], "12.3"); // depth, from DPT
    assert_eq!(parts.last().unwrap(), &"60");
}
