//! Per-sentence data structures and `data_available` bitmasks, matching the
//! `nmea_message_data_*_t` structs and `NMEA_*_PRESENT` constants in
//! `nmea.h`. Each struct's `data_available` field records which of its
//! fields were actually present in the sentence that produced it (a
//! receiver does not need to re-validate optional fields itself) or which
//! fields a transmitter should include (a sender can compose a partial
//! sentence when not every instrument value is fresh).

/// Which sentence type a transmit/receive registration entry is for,
/// matching `nmea_message_type_t`. `Min`/`Max` are omitted since they exist
/// in the source only as loop bounds, not as sentences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Apb,
    Dpt,
    Hdt,
    Hdm,
    Gga,
    Mwd,
    Mwv,
    Mtw,
    Rmb,
    Rmc,
    Vdm,
    Vhw,
    Vlw,
    Xdr,
    Mda,
}

impl MessageType {
    pub fn talker_code(self) -> &'static str {
        match self {
            MessageType::Apb => "APB",
            MessageType::Dpt => "DPT",
            MessageType::Hdt => "HDT",
            MessageType::Hdm => "HDM",
            MessageType::Gga => "GGA",
            MessageType::Mwd => "MWD",
            MessageType::Mwv => "MWV",
            MessageType::Mtw => "MTW",
            MessageType::Rmb => "RMB",
            MessageType::Rmc => "RMC",
            MessageType::Vdm => "VDM",
            MessageType::Vhw => "VHW",
            MessageType::Vlw => "VLW",
            MessageType::Xdr => "XDR",
            MessageType::Mda => "MDA",
        }
    }
}

pub mod dpt_flags {
    pub const DEPTH: u32 = 0x0000_0001;
    pub const DEPTH_OFFSET: u32 = 0x0000_0002;
    pub const DEPTH_MAX_RANGE: u32 = 0x0000_0004;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DptData {
    pub data_available: u32,
    pub depth_m: f32,
    pub depth_offset_m: f32,
    pub depth_max_range_m: f32,
}

pub mod gga_flags {
    pub const UTC: u32 = 0x0000_0001;
    pub const LATITUDE: u32 = 0x0000_0002;
    pub const LONGITUDE: u32 = 0x0000_0004;
    pub const QUALITY_INDICATOR: u32 = 0x0000_0008;
    pub const SATELLITES_IN_USE: u32 = 0x0000_0010;
    pub const HDOP: u32 = 0x0000_0020;
    pub const ALTITUDE: u32 = 0x0000_0040;
    pub const GEOIDAL_SEPARATION: u32 = 0x0000_0080;
    pub const DGPS_AGE: u32 = 0x0000_0100;
    pub const DGPS_STATION_ID: u32 = 0x0000_0200;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UtcTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GgaData {
    pub data_available: u32,
    pub utc: UtcTime,
    pub latitude_deg: f32,
    pub longitude_deg: f32,
    pub quality_indicator: u8,
    pub satellites_in_use: u8,
    pub hdop: f32,
    pub altitude_m: f32,
    pub geoidal_separation_m: f32,
    pub dgps_age_s: f32,
    pub dgps_station_id: u16,
}

pub mod hdm_flags {
    pub const MAGNETIC_HEADING: u32 = 0x0000_0001;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HdmData {
    pub data_available: u32,
    pub magnetic_heading_deg: f32,
}

pub mod hdt_flags {
    pub const TRUE_HEADING: u32 = 0x0000_0001;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HdtData {
    pub data_available: u32,
    pub true_heading_deg: f32,
}

pub mod mtw_flags {
    pub const WATER_TEMPERATURE: u32 = 0x0000_0001;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MtwData {
    pub data_available: u32,
    pub water_temperature_c: f32,
}

pub mod mwd_flags {
    pub const WIND_DIRECTION_TRUE: u32 = 0x0000_0001;
    pub const WIND_DIRECTION_MAGNETIC: u32 = 0x0000_0002;
    pub const WIND_SPEED_KTS: u32 = 0x0000_0004;
    pub const WIND_SPEED_MPS: u32 = 0x0000_0008;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MwdData {
    pub data_available: u32,
    pub wind_direction_true_deg: f32,
    pub wind_direction_magnetic_deg: f32,
    pub wind_speed_kts: f32,
    pub wind_speed_mps: f32,
}

pub mod mwv_flags {
    pub const WIND_ANGLE: u32 = 0x0000_0001;
    pub const REFERENCE: u32 = 0x0000_0002;
    pub const WIND_SPEED: u32 = 0x0000_0004;
    pub const WIND_SPEED_UNITS: u32 = 0x0000_0008;
    pub const STATUS: u32 = 0x0000_0010;
}

/// `R` (relative/apparent) or `T` (theoretical/true), matching the source's
/// single-character `reference` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindReference {
    Relative,
    Theoretical,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MwvData {
    pub data_available: u32,
    pub wind_angle_deg: f32,
    pub reference: WindReference,
    pub wind_speed: f32,
    pub wind_speed_units: char,
    pub status_valid: bool,
}

impl Default for MwvData {
    fn default() -> Self {
        MwvData {
            data_available: 0,
            wind_angle_deg: 0.0,
            reference: WindReference::Relative,
            wind_speed: 0.0,
            wind_speed_units: 'N',
            status_valid: false,
        }
    }
}

pub mod rmc_flags {
    pub const UTC: u32 = 0x0000_0001;
    pub const STATUS: u32 = 0x0000_0002;
    pub const LATITUDE: u32 = 0x0000_0004;
    pub const LONGITUDE: u32 = 0x0000_0008;
    pub const SOG: u32 = 0x0000_0010;
    pub const COG: u32 = 0x0000_0020;
    pub const DATE: u32 = 0x0000_0040;
    pub const MAG_VARIATION: u32 = 0x0000_0080;
    pub const MAG_DIRECTION: u32 = 0x0000_0100;
    pub const MODE: u32 = 0x0000_0200;
    pub const NAV_STATUS: u32 = 0x0000_0400;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NmeaDate {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RmcData {
    pub data_available: u32,
    pub utc: UtcTime,
    pub status_valid: bool,
    pub latitude_deg: f32,
    pub longitude_deg: f32,
    pub sog_kts: f32,
    pub cog_deg: f32,
    pub date: NmeaDate,
    pub magnetic_variation_deg: f32,
    pub magnetic_variation_direction: char,
    pub mode: char,
    pub navigation_status: char,
}

impl Default for RmcData {
    fn default() -> Self {
        RmcData {
            data_available: 0,
            utc: UtcTime::default(),
            status_valid: false,
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            sog_kts: 0.0,
            cog_deg: 0.0,
            date: NmeaDate::default(),
            magnetic_variation_deg: 0.0,
            magnetic_variation_direction: 'E',
            mode: 'A',
            navigation_status: 'V',
        }
    }
}

pub mod vhw_flags {
    pub const HEADING_TRUE: u32 = 0x0000_0001;
    pub const HEADING_MAG: u32 = 0x0000_0002;
    pub const WATER_SPEED_KTS: u32 = 0x0000_0004;
    pub const WATER_SPEED_KMPH: u32 = 0x0000_0008;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VhwData {
    pub data_available: u32,
    pub heading_true_deg: f32,
    pub heading_magnetic_deg: f32,
    pub water_speed_kts: f32,
    pub water_speed_kmph: f32,
}

pub mod vlw_flags {
    pub const TOTAL_WATER_DISTANCE: u32 = 0x0000_0001;
    pub const TRIP_WATER_DISTANCE: u32 = 0x0000_0002;
    pub const TOTAL_GROUND_DISTANCE: u32 = 0x0000_0004;
    pub const TRIP_GROUND_DISTANCE: u32 = 0x0000_0008;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VlwData {
    pub data_available: u32,
    pub total_water_distance_nm: f32,
    pub trip_water_distance_nm: f32,
    pub total_ground_distance_nm: f32,
    pub trip_ground_distance_nm: f32,
}

// APB, RMB, VDM, XDR and MDA keep only their `data_available` bitmask
// constants from the source firmware; this gateway has no waypoint/autopilot
// (APB/RMB), AIS (VDM) or extended weather-station (XDR/MDA) instrument
// feeding it, so their decode/encode tables are not registered. See
// DESIGN.md.
pub mod apb_flags {
    pub const STATUS1: u32 = 0x0000_0001;
    pub const STATUS2: u32 = 0x0000_0002;
    pub const CROSS_TRACK_ERROR: u32 = 0x0000_0004;
    pub const DIRECTION_TO_STEER: u32 = 0x0000_0008;
    pub const ARRIVAL_CIRCLE_ENTERED: u32 = 0x0000_0010;
    pub const PERPENDICULAR_PASSED: u32 = 0x0000_0020;
    pub const BEARING_ORIG_TO_DEST: u32 = 0x0000_0040;
    pub const BEARING_MAG_OR_TRUE: u32 = 0x0000_0080;
    pub const DEST_WAYPOINT_ID: u32 = 0x0000_0100;
    pub const BEARING_POS_TO_DEST: u32 = 0x0000_0200;
    pub const BEARING_POS_TO_DEST_MAG_OR_TRUE: u32 = 0x0000_0400;
    pub const HEADING_TO_STEER: u32 = 0x0000_0800;
    pub const HEADING_TO_STEER_MAG_OR_TRUE: u32 = 0x0000_1000;
    pub const MODE: u32 = 0x0000_2000;
}

pub mod rmb_flags {
    pub const STATUS: u32 = 0x0000_0001;
    pub const CROSS_TRACK_ERROR: u32 = 0x0000_0002;
    pub const DIR_TO_STEER: u32 = 0x0000_0004;
    pub const ORIG_WAYPOINT_ID: u32 = 0x0000_0008;
    pub const DEST_WAYPOINT_ID: u32 = 0x0000_0010;
    pub const LATITUDE: u32 = 0x0000_0020;
    pub const LONGITUDE: u32 = 0x0000_0040;
    pub const RANGE_TO_DEST: u32 = 0x0000_0080;
    pub const BEARING_TRUE: u32 = 0x0000_0100;
    pub const VELOCITY: u32 = 0x0000_0200;
    pub const ARRIVAL_STATUS: u32 = 0x0000_0400;
    pub const MODE: u32 = 0x0000_0800;
}

pub mod vdm_flags {
    pub const FRAGMENT_COUNT: u32 = 0x0000_0001;
    pub const FRAGMENT_NUMBER: u32 = 0x0000_0002;
    pub const MESSAGE_IDENTIFIER: u32 = 0x0000_0004;
    pub const CHANNEL_CODE: u32 = 0x0000_0008;
    pub const DATA: u32 = 0x0000_0010;
    pub const FILL_BITS: u32 = 0x0000_0020;
}

pub mod xdr_flags {
    pub const MEASUREMENT_1: u32 = 0x0000_0001;
    pub const MEASUREMENT_2: u32 = 0x0000_0002;
    pub const MEASUREMENT_3: u32 = 0x0000_0004;
    pub const MEASUREMENT_4: u32 = 0x0000_0008;
    pub const MEASUREMENT_5: u32 = 0x0000_0010;
    pub const MEASUREMENT_6: u32 = 0x0000_0020;
}

pub mod mda_flags {
    pub const PRESSURE_INCHES: u32 = 0x0000_0001;
    pub const PRESSURE_BARS: u32 = 0x0000_0002;
    pub const AIR_TEMPERATURE: u32 = 0x0000_0004;
    pub const WATER_TEMPERATURE: u32 = 0x0000_0008;
    pub const RELATIVE_HUMIDITY: u32 = 0x0000_0010;
    pub const ABSOLUTE_HUMIDITY: u32 = 0x0000_0020;
    pub const DEW_POINT: u32 = 0x0000_0040;
    pub const WIND_DIRECTION_TRUE: u32 = 0x0000_0080;
    pub const WIND_DIRECTION_MAGNETIC: u32 = 0x0000_0100;
    pub const WINDSPEED_KNOTS: u32 = 0x0000_0200;
    pub const WINDSPEED_MPS: u32 = 0x0000_0400;
}

/// Counts set bits in `n` within the window `[start_bit, start_bit+length)`,
/// matching `nmea_count_set_bits` (used by the source to size its per-field
/// encode loops; kept here for parity and reused by a couple of encoders
/// below that emit a variable number of optional trailing fields).
pub fn count_set_bits(n: u32, start_bit: u32, length: u32) -> u32 {
    let mask = if length >= 32 {
        u32::MAX
    } else {
        ((1u32 << length) - 1) << start_bit
    };
    (n & mask).count_ones()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_set_bits_counts_within_window() {
        assert_eq!(count_set_bits(0b1111, 0, 2), 2);
        assert_eq!(count_set_bits(0b1111, 2, 2), 2);
        assert_eq!(count_set_bits(0b0000, 0, 4), 0);
    }
}
