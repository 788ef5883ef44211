//! Decoders for the receive-side sentence set: GGA, RMC, VHW, MWV, MTW, DPT,
//! HDT, HDM, MWD, VLW. Each takes the comma-separated field list already
//! split out by [`super::sentence::parse`] and fills in only the fields
//! that were actually present, recording which in `data_available` — an
//! empty field between two commas is absent data, not zero, matching the
//! source firmware's field-by-field `data_available` bookkeeping.

use super::sentence::NmeaError;
use super::types::*;

fn field(fields: &[String], i: usize) -> Option<&str> {
    fields.get(i).map(|s| s.as_str()).filter(|s| !s.is_empty())
}

fn parse_f32(fields: &[String], i: usize) -> Option<f32> {
    field(fields, i)?.parse().ok()
}

fn parse_utc(fields: &[String], i: usize) -> Option<UtcTime> {
    let raw = field(fields, i)?;
    if raw.len() < 6 {
        return None;
    }
    let hours = raw.get(0..2)?.parse().ok()?;
    let minutes = raw.get(2..4)?.parse().ok()?;
    let seconds = raw.get(4..)?.parse().ok()?;
    Some(UtcTime { hours, minutes, seconds })
}

/// Applies a north/south or east/west hemisphere letter to a magnitude,
/// producing a signed decimal degrees value.
fn signed_by_hemisphere(magnitude: f32, hemisphere: Option<&str>, negative: &str) -> f32 {
    if hemisphere == Some(negative) {
        -magnitude
    } else {
        magnitude
    }
}

/// Parses NMEA's `ddmm.mmmm` (or `dddmm.mmmm` for longitude) into decimal
/// degrees.
fn parse_coordinate(raw: &str, degree_digits: usize) -> Option<f32> {
    if raw.len() < degree_digits {
        return None;
    }
    let degrees: f32 = raw.get(..degree_digits)?.parse().ok()?;
    let minutes: f32 = raw.get(degree_digits..)?.parse().ok()?;
    Some(degrees + minutes / 60.0)
}

pub fn decode_gga(fields: &[String]) -> Result<GgaData, NmeaError> {
    let mut out = GgaData::default();
    if let Some(utc) = parse_utc(fields, 0) {
        out.utc = utc;
        out.data_available |= gga_flags::UTC;
    }
    if let (Some(raw), hemi) = (field(fields, 1), field(fields, 2)) {
        if let Some(mag) = parse_coordinate(raw, 2) {
            out.latitude_deg = signed_by_hemisphere(mag, hemi, "S");
            out.data_available |= gga_flags::LATITUDE;
        }
    }
    if let (Some(raw), hemi) = (field(fields, 3), field(fields, 4)) {
        if let Some(mag) = parse_coordinate(raw, 3) {
            out.longitude_deg = signed_by_hemisphere(mag, hemi, "W");
            out.data_available |= gga_flags::LONGITUDE;
        }
    }
    if let Some(q) = field(fields, 5).and_then(|s| s.parse().ok()) {
        out.quality_indicator = q;
        out.data_available |= gga_flags::QUALITY_INDICATOR;
    }
    if let Some(sats) = field(fields, 6).and_then(|s| s.parse().ok()) {
        out.satellites_in_use = sats;
        out.data_available |= gga_flags::SATELLITES_IN_USE;
    }
    if let Some(hdop) = parse_f32(fields, 7) {
        out.hdop = hdop;
        out.data_available |= gga_flags::HDOP;
    }
    if let Some(alt) = parse_f32(fields, 8) {
        out.altitude_m = alt;
        out.data_available |= gga_flags::ALTITUDE;
    }
    if let Some(sep) = parse_f32(fields, 10) {
        out.geoidal_separation_m = sep;
        out.data_available |= gga_flags::GEOIDAL_SEPARATION;
    }
    if let Some(age) = parse_f32(fields, 12) {
        out.dgps_age_s = age;
        out.data_available |= gga_flags::DGPS_AGE;
    }
    if let Some(id) = field(fields, 13).and_then(|s| s.parse().ok()) {
        out.dgps_station_id = id;
        out.data_available |= gga_flags::DGPS_STATION_ID;
    }
    Ok(out)
}

pub fn decode_rmc(fields: &[String]) -> Result<RmcData, NmeaError> {
    let mut out = RmcData::default();
    if let Some(utc) = parse_utc(fields, 0) {
        out.utc = utc;
        out.data_available |= rmc_flags::UTC;
    }
    if let Some(status) = field(fields, 1) {
        out.status_valid = status == "A";
        out.data_available |= rmc_flags::STATUS;
    }
    if let (Some(raw), hemi) = (field(fields, 2), field(fields, 3)) {
        if let Some(mag) = parse_coordinate(raw, 2) {
            out.latitude_deg = signed_by_hemisphere(mag, hemi, "S");
            out.data_available |= rmc_flags::LATITUDE;
        }
    }
    if let (Some(raw), hemi) = (field(fields, 4), field(fields, 5)) {
        if let Some(mag) = parse_coordinate(raw, 3) {
            out.longitude_deg = signed_by_hemisphere(mag, hemi, "W");
            out.data_available |= rmc_flags::LONGITUDE;
        }
    }
    if let Some(sog) = parse_f32(fields, 6) {
        out.sog_kts = sog;
        out.data_available |= rmc_flags::SOG;
    }
    if let Some(cog) = parse_f32(fields, 7) {
        out.cog_deg = cog;
        out.data_available |= rmc_flags::COG;
    }
    if let Some(raw) = field(fields, 8) {
        if raw.len() == 6 {
            if let (Ok(day), Ok(month), Ok(year)) = (
                raw[0..2].parse(),
                raw[2..4].parse(),
                raw[4..6].parse::<u16>(),
            ) {
                out.date = NmeaDate { day, month, year: 2000 + year };
                out.data_available |= rmc_flags::DATE;
            }
        }
    }
    if let Some(var) = parse_f32(fields, 9) {
        out.magnetic_variation_deg = var;
        out.data_available |= rmc_flags::MAG_VARIATION;
    }
    if let Some(dir) = field(fields, 10).and_then(|s| s.chars().next()) {
        out.magnetic_variation_direction = dir;
        out.data_available |= rmc_flags::MAG_DIRECTION;
    }
    if let Some(mode) = field(fields, 11).and_then(|s| s.chars().next()) {
        out.mode = mode;
        out.data_available |= rmc_flags::MODE;
    }
    Ok(out)
}

pub fn decode_vhw(fields: &[String]) -> Result<VhwData, NmeaError> {
    let mut out = VhwData::default();
    if let Some(v) = parse_f32(fields, 0) {
        out.heading_true_deg = v;
        out.data_available |= vhw_flags::HEADING_TRUE;
    }
    if let Some(v) = parse_f32(fields, 2) {
        out.heading_magnetic_deg = v;
        out.data_available |= vhw_flags::HEADING_MAG;
    }
    if let Some(v) = parse_f32(fields, 4) {
        out.water_speed_kts = v;
        out.data_available |= vhw_flags::WATER_SPEED_KTS;
    }
    if let Some(v) = parse_f32(fields, 6) {
        out.water_speed_kmph = v;
        out.data_available |= vhw_flags::WATER_SPEED_KMPH;
    }
    Ok(out)
}

pub fn decode_mwv(fields: &[String]) -> Result<MwvData, NmeaError> {
    let mut out = MwvData::default();
    if let Some(angle) = parse_f32(fields, 0) {
        out.wind_angle_deg = angle;
        out.data_available |= mwv_flags::WIND_ANGLE;
    }
    if let Some(reference) = field(fields, 1) {
        out.reference = if reference == "T" {
            WindReference::Theoretical
        } else {
            WindReference::Relative
        };
        out.data_available |= mwv_flags::REFERENCE;
    }
    if let Some(speed) = parse_f32(fields, 2) {
        out.wind_speed = speed;
        out.data_available |= mwv_flags::WIND_SPEED;
    }
    if let Some(units) = field(fields, 3).and_then(|s| s.chars().next()) {
        out.wind_speed_units = units;
        out.data_available |= mwv_flags::WIND_SPEED_UNITS;
    }
    if let Some(status) = field(fields, 4) {
        out.status_valid = status == "A";
        out.data_available |= mwv_flags::STATUS;
    }
    Ok(out)
}

pub fn decode_mtw(fields: &[String]) -> Result<MtwData, NmeaError> {
    let mut out = MtwData::default();
    if let Some(v) = parse_f32(fields, 0) {
        out.water_temperature_c = v;
        out.data_available |= mtw_flags::WATER_TEMPERATURE;
    }
    Ok(out)
}

pub fn decode_dpt(fields: &[String]) -> Result<DptData, NmeaError> {
    let mut out = DptData::default();
    if let Some(v) = parse_f32(fields, 0) {
        out.depth_m = v;
        out.data_available |= dpt_flags::DEPTH;
    }
    if let Some(v) = parse_f32(fields, 1) {
        out.depth_offset_m = v;
        out.data_available |= dpt_flags::DEPTH_OFFSET;
    }
    if let Some(v) = parse_f32(fields, 2) {
        out.depth_max_range_m = v;
        out.data_available |= dpt_flags::DEPTH_MAX_RANGE;
    }
    Ok(out)
}

pub fn decode_hdt(fields: &[String]) -> Result<HdtData, NmeaError> {
    let mut out = HdtData::default();
    if let Some(v) = parse_f32(fields, 0) {
        out.true_heading_deg = v;
        out.data_available |= hdt_flags::TRUE_HEADING;
    }
    Ok(out)
}

pub fn decode_hdm(fields: &[String]) -> Result<HdmData, NmeaError> {
    let mut out = HdmData::default();
    if let Some(v) = parse_f32(fields, 0) {
        out.magnetic_heading_deg = v;
        out.data_available |= hdm_flags::MAGNETIC_HEADING;
    }
    Ok(out)
}

pub fn decode_mwd(fields: &[String]) -> Result<MwdData, NmeaError> {
    let mut out = MwdData::default();
    if let Some(v) = parse_f32(fields, 0) {
        out.wind_direction_true_deg = v;
        out.data_available |= mwd_flags::WIND_DIRECTION_TRUE;
    }
    if let Some(v) = parse_f32(fields, 2) {
        out.wind_direction_magnetic_deg = v;
        out.data_available |= mwd_flags::WIND_DIRECTION_MAGNETIC;
    }
    if let Some(v) = parse_f32(fields, 4) {
        out.wind_speed_kts = v;
        out.data_available |= mwd_flags::WIND_SPEED_KTS;
    }
    if let Some(v) = parse_f32(fields, 6) {
        out.wind_speed_mps = v;
        out.data_available |= mwd_flags::WIND_SPEED_MPS;
    }
    Ok(out)
}

pub fn decode_vlw(fields: &[String]) -> Result<VlwData, NmeaError> {
    let mut out = VlwData::default();
    if let Some(v) = parse_f32(fields, 0) {
        out.total_water_distance_nm = v;
        out.data_available |= vlw_flags::TOTAL_WATER_DISTANCE;
    }
    if let Some(v) = parse_f32(fields, 2) {
        out.trip_water_distance_nm = v;
        out.data_available |= vlw_flags::TRIP_WATER_DISTANCE;
    }
    if let Some(v) = parse_f32(fields, 4) {
        out.total_ground_distance_nm = v;
        out.data_available |= vlw_flags::TOTAL_GROUND_DISTANCE;
    }
    if let Some(v) = parse_f32(fields, 6) {
        out.trip_ground_distance_nm = v;
        out.data_available |= vlw_flags::TRIP_GROUND_DISTANCE;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::sentence::parse;

    #[test]
    fn decodes_gga_position_and_fix() {
        let sum = super::super::sentence::checksum(
            b"GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,",
        );
        let sentence = format!(
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*{sum:02X}"
        );
        let (_, fields) = parse(&sentence).unwrap();
        let gga = decode_gga(&fields).unwrap();
        assert!(gga.data_available & gga_flags::LATITUDE != 0);
        assert!((gga.latitude_deg - 48.1173).abs() < 1e-3);
        assert!((gga.longitude_deg - 11.5166_7).abs() < 1e-3);
        assert_eq!(gga.quality_indicator, 1);
    }

    #[test]
    fn decodes_rmc_with_southern_western_hemisphere() {
        let body = "GPRMC,123519,A,4807.038,S,01131.000,W,022.4,084.4,230394,003.1,W";
        let sum = super::super::sentence::checksum(body.as_bytes());
        let sentence = format!("${body}*{sum:02X}");
        let (_, fields) = parse(&sentence).unwrap();
        let rmc = decode_rmc(&fields).unwrap();
        assert!(rmc.latitude_deg < 0.0);
        assert!(rmc.longitude_deg < 0.0);
        assert!(rmc.status_valid);
        assert_eq!(rmc.date, NmeaDate { day: 23, month: 3, year: 2094 });
    }

    #[test]
    fn decodes_mwv_apparent_wind() {
        let body = "WIMWV,045.0,R,12.5,N,A";
        let sum = super::super::sentence::checksum(body.as_bytes());
        let sentence = format!("${body}*{sum:02X}");
        let (_, fields) = parse(&sentence).unwrap();
        let mwv = decode_mwv(&fields).unwrap();
        assert_eq!(mwv.reference, WindReference::Relative);
        assert!(mwv.status_valid);
        assert!((mwv.wind_speed - 12.5).abs() < 1e-6);
    }

    #[test]
    fn missing_fields_leave_data_available_bit_clear() {
        let body = "IIVHW,,,,,05.5,N,,";
        let sum = super::super::sentence::checksum(body.as_bytes());
        let sentence = format!("${body}*{sum:02X}");
        let (_, fields) = parse(&sentence).unwrap();
        let vhw = decode_vhw(&fields).unwrap();
        assert_eq!(vhw.data_available, vhw_flags::WATER_SPEED_KTS);
    }
}
