//! Encoders for the transmit-side sentence set, mirroring `nmea_encode_*` in
//! the source firmware. Each takes the data struct and talker id (the two
//! letters identifying the instrument type, e.g. `"GP"` for a GPS source,
//! `"II"` for integrated instrumentation) and produces a full `$...*HH\r\n`
//! line via [`super::sentence::build`].

use super::sentence::build;
use super::types::*;

fn fmt_opt(value: f32, present: bool, decimals: usize) -> String {
    if present {
        format!("{value:.decimals$}")
    } else {
        String::new()
    }
}

fn coordinate_to_nmea(value_deg: f32, degree_digits: usize) -> (String, f32) {
    let magnitude = value_deg.abs();
    let degrees = magnitude.trunc();
    let minutes = (magnitude - degrees) * 60.0;
    (format!("{degrees:0width$}", width = degree_digits), minutes)
}

pub fn encode_gga(talker: &str, data: &GgaData) -> String {
    let (lat_deg, lat_min) = coordinate_to_nmea(data.latitude_deg, 2);
    let (lon_deg, lon_min) = coordinate_to_nmea(data.longitude_deg, 3);
    let fields = vec![
        format!(
            "{:02}{:02}{:05.2}",
            data.utc.hours, data.utc.minutes, data.utc.seconds
        ),
        format!("{lat_deg}{lat_min:07.4}"),
        if data.latitude_deg >= 0.0 { "N".into() } else { "S".into() },
        format!("{lon_deg}{lon_min:07.4}"),
        if data.longitude_deg >= 0.0 { "E".into() } else { "W".into() },
        data.quality_indicator.to_string(),
        data.satellites_in_use.to_string(),
        fmt_opt(data.hdop, data.data_available & gga_flags::HDOP != 0, 1),
        fmt_opt(data.altitude_m, data.data_available & gga_flags::ALTITUDE != 0, 1),
        "M".into(),
        fmt_opt(
            data.geoidal_separation_m,
            data.data_available & gga_flags::GEOIDAL_SEPARATION != 0,
            1,
        ),
        "M".into(),
        fmt_opt(data.dgps_age_s, data.data_available & gga_flags::DGPS_AGE != 0, 1),
        if data.data_available & gga_flags::DGPS_STATION_ID != 0 {
            data.dgps_station_id.to_string()
        } else {
            String::new()
        },
    ];
    build('$', &format!("{talker}GGA"), &fields)
}

pub fn encode_hdm(talker: &str, data: &HdmData) -> String {
    build(
        '$',
        &format!("{talker}HDM"),
        &[format!("{:.1}", data.magnetic_heading_deg), "M".into()],
    )
}

pub fn encode_hdt(talker: &str, data: &HdtData) -> String {
    build(
        '$',
        &format!("{talker}HDT"),
        &[format!("{:.1}", data.true_heading_deg), "T".into()],
    )
}

pub fn encode_mtw(talker: &str, data: &MtwData) -> String {
    build(
        '$',
        &format!("{talker}MTW"),
        &[format!("{:.1}", data.water_temperature_c), "C".into()],
    )
}

pub fn encode_dpt(talker: &str, data: &DptData) -> String {
    build(
        '$',
        &format!("{talker}DPT"),
        &[
            format!("{:.1}", data.depth_m),
            format!("{:.1}", data.depth_offset_m),
            fmt_opt(
                data.depth_max_range_m,
                data.data_available & dpt_flags::DEPTH_MAX_RANGE != 0,
                1,
            ),
        ],
    )
}

pub fn encode_mwd(talker: &str, data: &MwdData) -> String {
    build(
        '$',
        &format!("{talker}MWD"),
        &[
            format!("{:.1}", data.wind_direction_true_deg),
            "T".into(),
            format!("{:.1}", data.wind_direction_magnetic_deg),
            "M".into(),
            format!("{:.1}", data.wind_speed_kts),
            "N".into(),
            format!("{:.1}", data.wind_speed_mps),
            "M".into(),
        ],
    )
}

pub fn encode_mwv(talker: &str, data: &MwvData) -> String {
    build(
        '$',
        &format!("{talker}MWV"),
        &[
            format!("{:.1}", data.wind_angle_deg),
            match data.reference {
                WindReference::Relative => "R".into(),
                WindReference::Theoretical => "T".into(),
            },
            format!("{:.1}", data.wind_speed),
            data.wind_speed_units.to_string(),
            if data.status_valid { "A".into() } else { "V".into() },
        ],
    )
}

pub fn encode_rmc(talker: &str, data: &RmcData) -> String {
    let (lat_deg, lat_min) = coordinate_to_nmea(data.latitude_deg, 2);
    let (lon_deg, lon_min) = coordinate_to_nmea(data.longitude_deg, 3);
    build(
        '$',
        &format!("{talker}RMC"),
        &[
            format!(
                "{:02}{:02}{:05.2}",
                data.utc.hours, data.utc.minutes, data.utc.seconds
            ),
            if data.status_valid { "A".into() } else { "V".into() },
            format!("{lat_deg}{lat_min:07.4}"),
            if data.latitude_deg >= 0.0 { "N".into() } else { "S".into() },
            format!("{lon_deg}{lon_min:07.4}"),
            if data.longitude_deg >= 0.0 { "E".into() } else { "W".into() },
            format!("{:.1}", data.sog_kts),
            format!("{:.1}", data.cog_deg),
            format!("{:02}{:02}{:02}", data.date.day, data.date.month, data.date.year % 100),
            fmt_opt(
                data.magnetic_variation_deg,
                data.data_available & rmc_flags::MAG_VARIATION != 0,
                1,
            ),
            if data.data_available & rmc_flags::MAG_DIRECTION != 0 {
                data.magnetic_variation_direction.to_string()
            } else {
                String::new()
            },
        ],
    )
}

pub fn encode_vhw(talker: &str, data: &VhwData) -> String {
    build(
        '$',
        &format!("{talker}VHW"),
        &[
            format!("{:.1}", data.heading_true_deg),
            "T".into(),
            format!("{:.1}", data.heading_magnetic_deg),
            "M".into(),
            format!("{:.1}", data.water_speed_kts),
            "N".into(),
            format!("{:.1}", data.water_speed_kmph),
            "K".into(),
        ],
    )
}

pub fn encode_vlw(talker: &str, data: &VlwData) -> String {
    build(
        '$',
        &format!("{talker}VLW"),
        &[
            format!("{:.1}", data.total_water_distance_nm),
            "N".into(),
            format!("{:.1}", data.trip_water_distance_nm),
            "N".into(),
            format!("{:.1}", data.total_ground_distance_nm),
            "N".into(),
            format!("{:.1}", data.trip_ground_distance_nm),
            "N".into(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::sentence::parse;

    #[test]
    fn encode_mtw_roundtrips_through_decode() {
        let data = MtwData {
            data_available: mtw_flags::WATER_TEMPERATURE,
            water_temperature_c: 18.4,
        };
        let sentence = encode_mtw("II", &data);
        let trimmed = sentence.trim_end_matches("\r\n");
        let (header, fields) = parse(trimmed).unwrap();
        assert_eq!(header, "IIMTW");
        let decoded = super::super::decode::decode_mtw(&fields).unwrap();
        assert!((decoded.water_temperature_c - 18.4).abs() < 1e-3);
    }

    #[test]
    fn encode_rmc_roundtrips_hemisphere_signs() {
        let data = RmcData {
            latitude_deg: -33.5,
            longitude_deg: 151.25,
            status_valid: true,
            sog_kts: 5.2,
            cog_deg: 270.0,
            date: NmeaDate { day: 1, month: 6, year: 2024 },
            ..Default::default()
        };
        let sentence = encode_rmc("GP", &data);
        let trimmed = sentence.trim_end_matches("\r\n");
        let (_, fields) = parse(trimmed).unwrap();
        let decoded = super::super::decode::decode_rmc(&fields).unwrap();
        assert!(decoded.latitude_deg < 0.0);
        assert!(decoded.longitude_deg > 0.0);
        assert!(decoded.status_valid);
    }
}
