//! Instrument ingestion (C7): takes a decoded NMEA sentence off a receive
//! port and writes the fields it carries into the shared [`BoatData`]
//! snapshot, stamping each write with the current monotonic time. Kept
//! separate from the NMEA decode step itself so a future `N2kBus`-backed
//! ingestor can feed the same snapshot without going through sentence text
//! at all.

use std::sync::Arc;

use crate::boatdata::BoatData;
use crate::nmea::types::*;
use crate::timebase::now_ms;

pub struct Ingestor {
    boat_data: Arc<BoatData>,
}

impl Ingestor {
    pub fn new(boat_data: Arc<BoatData>) -> Self {
        Ingestor { boat_data }
    }

    pub fn ingest_gga(&self, data: &GgaData) {
        let t = now_ms();
        if data.data_available & gga_flags::LATITUDE != 0 {
            self.boat_data.latitude_deg.set(data.latitude_deg, t);
        }
        if data.data_available & gga_flags::LONGITUDE != 0 {
            self.boat_data.longitude_deg.set(data.longitude_deg, t);
        }
    }

    pub fn ingest_rmc(&self, data: &RmcData) {
        let t = now_ms();
        if data.data_available & rmc_flags::LATITUDE != 0 {
            self.boat_data.latitude_deg.set(data.latitude_deg, t);
        }
        if data.data_available & rmc_flags::LONGITUDE != 0 {
            self.boat_data.longitude_deg.set(data.longitude_deg, t);
        }
        if data.data_available & rmc_flags::SOG != 0 {
            self.boat_data.speed_over_ground_kts.set(data.sog_kts, t);
        }
        if data.data_available & rmc_flags::COG != 0 {
            self.boat_data.course_over_ground_deg.set(data.cog_deg as i16, t);
        }
        if data.data_available & rmc_flags::MAG_VARIATION != 0 {
            let signed = if data.magnetic_variation_direction == 'W' {
                -data.magnetic_variation_deg
            } else {
                data.magnetic_variation_deg
            };
            self.boat_data.magnetic_variation_deg.set(signed, t);
        }
        if data.data_available & rmc_flags::UTC != 0 {
            self.boat_data.set_gmt(
                crate::boatdata::GmtTime {
                    hours: data.utc.hours,
                    minutes: data.utc.minutes,
                    seconds: data.utc.seconds as u8,
                },
                t,
            );
        }
        if data.data_available & rmc_flags::DATE != 0
            && chrono::NaiveDate::from_ymd_opt(data.date.year as i32, data.date.month as u32, data.date.day as u32)
                .is_some()
        {
            self.boat_data.set_date(
                crate::boatdata::CalendarDate {
                    day: data.date.day,
                    month: data.date.month,
                    year: data.date.year,
                },
                t,
            );
        }
    }

    pub fn ingest_vhw(&self, data: &VhwData) {
        let t = now_ms();
        if data.data_available & vhw_flags::HEADING_TRUE != 0 {
            self.boat_data.heading_true_deg.set(data.heading_true_deg, t);
        }
        if data.data_available & vhw_flags::WATER_SPEED_KTS != 0 {
            self.boat_data.boat_speed_kts.set(data.water_speed_kts, t);
        }
    }

    pub fn ingest_hdt(&self, data: &HdtData) {
        if data.data_available & hdt_flags::TRUE_HEADING != 0 {
            self.boat_data.heading_true_deg.set(data.true_heading_deg, now_ms());
        }
    }

    pub fn ingest_mtw(&self, data: &MtwData) {
        if data.data_available & mtw_flags::WATER_TEMPERATURE != 0 {
            self.boat_data
                .seawater_temperature_c
                .set(data.water_temperature_c, now_ms());
        }
    }

    pub fn ingest_dpt(&self, data: &DptData) {
        if data.data_available & dpt_flags::DEPTH != 0 {
            self.boat_data.depth_m.set(data.depth_m, now_ms());
        }
    }

    pub fn ingest_mwv(&self, data: &MwvData) {
        let t = now_ms();
        if data.data_available & (mwv_flags::WIND_ANGLE | mwv_flags::WIND_SPEED) == 0 {
            return;
        }
        match data.reference {
            WindReference::Relative => {
                self.boat_data.apparent_wind_angle_deg.set(data.wind_angle_deg, t);
                self.boat_data.apparent_wind_speed_kts.set(data.wind_speed, t);
            }
            WindReference::Theoretical => {
                self.boat_data.true_wind_angle_deg.set(data.wind_angle_deg, t);
                self.boat_data.true_wind_speed_kts.set(data.wind_speed, t);
            }
        }
    }

    pub fn ingest_mwd(&self, data: &MwdData) {
        let t = now_ms();
        if data.data_available & mwd_flags::WIND_DIRECTION_TRUE != 0 {
            self.boat_data.wind_direction_true_deg.set(data.wind_direction_true_deg, t);
        }
        if data.data_available & mwd_flags::WIND_DIRECTION_MAGNETIC != 0 {
            self.boat_data
                .wind_direction_magnetic_deg
                .set(data.wind_direction_magnetic_deg, t);
        }
    }

    pub fn ingest_vlw(&self, data: &VlwData) {
        let t = now_ms();
        if data.data_available & vlw_flags::TRIP_WATER_DISTANCE != 0 {
            self.boat_data.trip_nm.set(data.trip_water_distance_nm, t);
        }
        if data.data_available & vlw_flags::TOTAL_WATER_DISTANCE != 0 {
            self.boat_data.total_distance_nm.set(data.total_water_distance_nm, t);
        }
    }

    pub fn ingest_pressure_hpa(&self, hpa: f32) {
        self.boat_data.pressure_hpa.set(hpa, now_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boatdata::windows;

    #[test]
    fn rmc_ingest_writes_position_and_sog() {
        let bd = Arc::new(BoatData::new());
        let ingestor = Ingestor::new(bd.clone());
        let data = RmcData {
            data_available: rmc_flags::LATITUDE | rmc_flags::LONGITUDE | rmc_flags::SOG,
            latitude_deg: 10.0,
            longitude_deg: -20.0,
            sog_kts: 6.5,
            ..Default::default()
        };
        ingestor.ingest_rmc(&data);
        let t = crate::timebase::now_ms();
        assert_eq!(bd.latitude_deg.fresh_value(t, windows::POSITION_MOTION_WIND_HEADING_MS), Some(10.0));
        assert_eq!(bd.speed_over_ground_kts.fresh_value(t, windows::POSITION_MOTION_WIND_HEADING_MS), Some(6.5));
    }

    #[test]
    fn mwv_routes_by_reference() {
        let bd = Arc::new(BoatData::new());
        let ingestor = Ingestor::new(bd.clone());
        ingestor.ingest_mwv(&MwvData {
            data_available: mwv_flags::WIND_ANGLE | mwv_flags::WIND_SPEED,
            wind_angle_deg: 45.0,
            wind_speed: 12.0,
            reference: WindReference::Theoretical,
            ..Default::default()
        });
        let t = crate::timebase::now_ms();
        assert_eq!(bd.true_wind_angle_deg.fresh_value(t, windows::POSITION_MOTION_WIND_HEADING_MS), Some(45.0));
        assert_eq!(bd.apparent_wind_angle_deg.fresh_value(t, windows::POSITION_MOTION_WIND_HEADING_MS), None);
    }
}
