//! Boat-data freshness layer (C6).
//!
//! A flat, process-wide snapshot of instrument measurements. Each field is a
//! `{value, observed_at_ms}` pair with field-level atomicity: writers (the
//! bus ingestor, the NMEA receive callbacks, the 1 s GMT decay) update one
//! field at a time, readers (the NMEA transmit callbacks, the publisher's
//! frame composer, the SMS command handlers) read a field as a consistent
//! pair. There is no cross-field consistency guarantee, matching §3/§9 of
//! the specification: this is deliberately not a single process-wide lock,
//! so writers never serialize against unrelated readers.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

/// Sentinel timestamp a field is initialized with so that it reads as stale
/// until a real observation is written. Chosen far enough from any real
/// monotonic timestamp that both halves of the freshness predicate below
/// evaluate false at process start, regardless of how long the process has
/// been running (the source firmware's 32-bit-tick-counter equivalent is an
/// all-0x7F byte pattern; the invariant it encodes — "reads as stale until
/// written" — is what we reproduce here, not the literal bit pattern, since
/// this crate's clock is a 64-bit millisecond counter that does not wrap in
/// any realistic process lifetime).
pub const LONG_AGO_MS: i64 = i64::MIN / 2;

/// A single timestamped measurement, stored as two atomics so that readers
/// never see a value half-written.
#[derive(Debug)]
pub struct Field<T> {
    bits: AtomicU32,
    observed_at_ms: AtomicI64,
    _marker: std::marker::PhantomData<T>,
}

/// Types that can be bit-cast to/from the 32-bit storage cell of a [`Field`].
pub trait FieldValue: Copy {
    fn to_bits(self) -> u32;
    fn from_bits(bits: u32) -> Self;
    fn zero() -> Self;
}

impl FieldValue for f32 {
    fn to_bits(self) -> u32 {
        f32::to_bits(self)
    }
    fn from_bits(bits: u32) -> Self {
        f32::from_bits(bits)
    }
    fn zero() -> Self {
        0.0
    }
}

impl FieldValue for i16 {
    fn to_bits(self) -> u32 {
        self as u16 as u32
    }
    fn from_bits(bits: u32) -> Self {
        bits as u16 as i16
    }
    fn zero() -> Self {
        0
    }
}

impl<T: FieldValue> Field<T> {
    pub fn new() -> Self {
        Field {
            bits: AtomicU32::new(T::zero().to_bits()),
            observed_at_ms: AtomicI64::new(LONG_AGO_MS),
            _marker: std::marker::PhantomData,
        }
    }

    /// Invariant I1: `observed_at_ms` is only ever assigned from the current
    /// monotonic clock, which is the only constructor callers are given
    /// (`crate::timebase::now_ms`) for this parameter.
    pub fn set(&self, value: T, observed_at_ms: i64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
        self.observed_at_ms.store(observed_at_ms, Ordering::Release);
    }

    /// Reads the pair. Because the value is stored before the timestamp on
    /// write (release) and the timestamp is read before the value here
    /// (acquire), a reader that sees a fresh timestamp is guaranteed to see
    /// its matching value, never a stale value with a fresh stamp.
    pub fn get(&self) -> (T, i64) {
        let observed_at_ms = self.observed_at_ms.load(Ordering::Acquire);
        let value = T::from_bits(self.bits.load(Ordering::Relaxed));
        (value, observed_at_ms)
    }

    pub fn observed_at_ms(&self) -> i64 {
        self.observed_at_ms.load(Ordering::Acquire)
    }

    /// Freshness predicate (§3, required invariant): fresh with respect to a
    /// window `w_ms` at time `t_ms` when either the normal case holds or the
    /// observation is timestamped in the future relative to `t_ms` (wrap
    /// tolerance). Exercised by every consumer in this crate.
    pub fn is_fresh(&self, t_ms: i64, w_ms: i64) -> bool {
        is_fresh(self.observed_at_ms(), t_ms, w_ms)
    }

    /// Value if fresh, else `None`.
    pub fn fresh_value(&self, t_ms: i64, w_ms: i64) -> Option<T> {
        let (value, observed_at_ms) = self.get();
        is_fresh(observed_at_ms, t_ms, w_ms).then_some(value)
    }
}

impl<T: FieldValue> Default for Field<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Free-standing form of the freshness predicate, used directly where a
/// field isn't convenient to wrap (e.g. composite date/time fields below).
pub fn is_fresh(observed_at_ms: i64, t_ms: i64, w_ms: i64) -> bool {
    (t_ms - observed_at_ms) < w_ms || observed_at_ms > t_ms
}

/// Wall-clock GMT time-of-day, decayed by the orchestrator's 1 s timer when
/// no fresher observation has arrived (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GmtTime {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl GmtTime {
    pub const MIDNIGHT: GmtTime = GmtTime {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    /// Advances by one second, saturating at 23:59:59 rather than rolling
    /// over to the next day without a fresh date observation (§4.6).
    pub fn advance_one_second_saturating(self) -> GmtTime {
        if self == (GmtTime { hours: 23, minutes: 59, seconds: 59 }) {
            return self;
        }
        let mut s = self.seconds + 1;
        let mut m = self.minutes;
        let mut h = self.hours;
        if s == 60 {
            s = 0;
            m += 1;
        }
        if m == 60 {
            m = 0;
            h += 1;
        }
        GmtTime { hours: h, minutes: m, seconds: s }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalendarDate {
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

/// Maximum-age windows, in milliseconds (§3). A static map from field to its
/// window.
pub mod windows {
    pub const POSITION_MOTION_WIND_HEADING_MS: i64 = 4_000;
    pub const TRIP_LOG_MS: i64 = 8_000;
    pub const TIME_OF_DAY_MS: i64 = 12_000;
    pub const DATE_MS: i64 = 12_000;
    pub const PRESSURE_MS: i64 = 30_000;
    pub const WMM_VALIDITY_MS: i64 = 3_600_000;
}

/// The full process-wide measurement snapshot (C6).
pub struct BoatData {
    pub speed_over_ground_kts: Field<f32>,
    pub course_over_ground_deg: Field<i16>,
    pub latitude_deg: Field<f32>,
    pub longitude_deg: Field<f32>,
    pub boat_speed_kts: Field<f32>,
    pub seawater_temperature_c: Field<f32>,
    pub depth_m: Field<f32>,
    pub heading_true_deg: Field<f32>,
    pub trip_nm: Field<f32>,
    pub total_distance_nm: Field<f32>,
    pub true_wind_speed_kts: Field<f32>,
    pub true_wind_angle_deg: Field<f32>,
    pub apparent_wind_speed_kts: Field<f32>,
    pub apparent_wind_angle_deg: Field<f32>,
    pub wind_direction_true_deg: Field<f32>,
    pub wind_direction_magnetic_deg: Field<f32>,
    pub pressure_hpa: Field<f32>,
    pub magnetic_variation_deg: Field<f32>,

    gmt: std::sync::Mutex<(GmtTime, i64)>,
    date: std::sync::Mutex<(CalendarDate, i64)>,
    wmm_calculated_at_ms: AtomicI64,
}

impl BoatData {
    pub fn new() -> Self {
        BoatData {
            speed_over_ground_kts: Field::new(),
            course_over_ground_deg: Field::new(),
            latitude_deg: Field::new(),
            longitude_deg: Field::new(),
            boat_speed_kts: Field::new(),
            seawater_temperature_c: Field::new(),
            depth_m: Field::new(),
            heading_true_deg: Field::new(),
            trip_nm: Field::new(),
            total_distance_nm: Field::new(),
            true_wind_speed_kts: Field::new(),
            true_wind_angle_deg: Field::new(),
            apparent_wind_speed_kts: Field::new(),
            apparent_wind_angle_deg: Field::new(),
            wind_direction_true_deg: Field::new(),
            wind_direction_magnetic_deg: Field::new(),
            pressure_hpa: Field::new(),
            magnetic_variation_deg: Field::new(),
            gmt: std::sync::Mutex::new((GmtTime::MIDNIGHT, LONG_AGO_MS)),
            date: std::sync::Mutex::new((
                CalendarDate { day: 1, month: 1, year: 1970 },
                LONG_AGO_MS,
            )),
            wmm_calculated_at_ms: AtomicI64::new(LONG_AGO_MS),
        }
    }

    pub fn set_gmt(&self, value: GmtTime, observed_at_ms: i64) {
        *self.gmt.lock().unwrap() = (value, observed_at_ms);
    }

    pub fn gmt(&self) -> (GmtTime, i64) {
        *self.gmt.lock().unwrap()
    }

    /// Decays GMT forward by one second if no fresher observation arrived
    /// since the last decay or write (§4.6, 1 s timer).
    pub fn decay_gmt_one_second(&self, t_ms: i64) {
        let mut guard = self.gmt.lock().unwrap();
        let (value, observed_at_ms) = *guard;
        *guard = (value.advance_one_second_saturating(), observed_at_ms.max(t_ms - 1));
    }

    pub fn set_date(&self, value: CalendarDate, observed_at_ms: i64) {
        *self.date.lock().unwrap() = (value, observed_at_ms);
    }

    pub fn date(&self) -> (CalendarDate, i64) {
        *self.date.lock().unwrap()
    }

    pub fn wmm_calculated_at_ms(&self) -> i64 {
        self.wmm_calculated_at_ms.load(Ordering::Acquire)
    }

    pub fn mark_wmm_calculated(&self, t_ms: i64) {
        self.wmm_calculated_at_ms.store(t_ms, Ordering::Release);
    }
}

impl Default for BoatData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_field_reads_stale_before_first_write() {
        let f: Field<f32> = Field::new();
        assert!(!f.is_fresh(1_000, windows::POSITION_MOTION_WIND_HEADING_MS));
    }

    #[test]
    fn freshness_normal_case() {
        let f: Field<f32> = Field::new();
        f.set(12.3, 1_000);
        assert!(f.is_fresh(1_500, 4_000));
        assert!(!f.is_fresh(5_001, 4_000));
    }

    #[test]
    fn freshness_wraparound_tolerance() {
        // An observation timestamped ahead of "now" is always fresh until
        // the clock catches up, per the dual predicate in §3.
        let f: Field<f32> = Field::new();
        f.set(1.0, 10_000);
        assert!(f.is_fresh(5_000, 4_000));
        assert!(!f.is_fresh(10_001, 4_000));
    }

    #[test]
    fn gmt_advances_and_saturates() {
        let t = GmtTime { hours: 23, minutes: 59, seconds: 59 };
        assert_eq!(t.advance_one_second_saturating(), t);
        let t2 = GmtTime { hours: 1, minutes: 2, seconds: 59 };
        assert_eq!(
            t2.advance_one_second_saturating(),
            GmtTime { hours: 1, minutes: 3, seconds: 0 }
        );
    }
}
