//! Sun position and the solar sampling schedule.
//!
//! Angles are radians. Azimuth is measured from south and increases toward west, which
//! pairs with [`SunPosition::direction`]:
//! `x = sin(az)·cos(alt)`, `y = −cos(az)·cos(alt)`, `z = sin(alt)` (north = +y, up = +z).
use std::f64::consts::PI;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod schedule;

pub use schedule::{SolarWindow, SunSample};

const RAD: f64 = PI / 180.0;
const DAY_MS: f64 = 1000.0 * 60.0 * 60.0 * 24.0;
const JULIAN_1970: f64 = 2_440_588.0;
const JULIAN_2000: f64 = 2_451_545.0;
/// Obliquity of the ecliptic.
const OBLIQUITY: f64 = RAD * 23.4397;

/// Geographic site of the analysis.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteLocation {
    /// Latitude in degrees, north positive.
    pub latitude: f64,
    /// Longitude in degrees, east positive.
    pub longitude: f64,
    /// Offset of the site's civil clock from UTC.
    #[cfg_attr(feature = "serde", serde(with = "offset_seconds"))]
    pub utc_offset: FixedOffset,
}

impl Default for SiteLocation {
    fn default() -> Self {
        Self::new(51.5074, -0.1278)
    }
}

impl SiteLocation {
    /// Creates a site whose clock offset is the nearest whole hour to solar time.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        let hours = if longitude.is_finite() {
            (longitude / 15.0).round() as i32
        } else {
            0
        };
        Self {
            latitude,
            longitude,
            utc_offset: FixedOffset::east_opt(hours.saturating_mul(3600))
                .unwrap_or_else(|| Utc.fix()),
        }
    }

    /// Overrides the clock offset.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

/// Serializes a [`FixedOffset`] as seconds east of UTC.
#[cfg(feature = "serde")]
mod offset_seconds {
    use chrono::FixedOffset;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(offset: &FixedOffset, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i32(offset.local_minus_utc())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<FixedOffset, D::Error> {
        let secs = i32::deserialize(d)?;
        FixedOffset::east_opt(secs)
            .ok_or_else(|| D::Error::custom(format!("UTC offset out of range: {secs}s")))
    }
}

/// Sun azimuth and altitude in radians.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    pub azimuth: f64,
    pub altitude: f64,
}

impl SunPosition {
    /// Unit vector pointing from the ground toward the sun.
    pub fn direction(&self) -> Vec3 {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_alt, cos_alt) = self.altitude.sin_cos();
        Vec3::new(
            (sin_az * cos_alt) as f32,
            (-cos_az * cos_alt) as f32,
            sin_alt as f32,
        )
    }

    /// Whether the sun is above the horizon.
    #[inline]
    pub fn is_above_horizon(&self) -> bool {
        self.altitude > 0.0
    }
}

/// Sun position for `timestamp` as seen from (`latitude`, `longitude`) in degrees.
///
/// Low-precision solar ephemeris (about a minute of arc), adequate for shading studies.
/// Always returns a value; the sun may be below the horizon.
pub fn sun_position(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> SunPosition {
    let lw = RAD * -longitude;
    let phi = RAD * latitude;
    let d = days_since_j2000(timestamp);

    let (dec, ra) = sun_coordinates(d);
    let h = sidereal_time(d, lw) - ra;

    let azimuth = h.sin().atan2(h.cos() * phi.sin() - dec.tan() * phi.cos());
    let altitude = (phi.sin() * dec.sin() + phi.cos() * dec.cos() * h.cos()).asin();
    SunPosition { azimuth, altitude }
}

fn days_since_j2000(timestamp: DateTime<Utc>) -> f64 {
    let julian = timestamp.timestamp_millis() as f64 / DAY_MS - 0.5 + JULIAN_1970;
    julian - JULIAN_2000
}

fn solar_mean_anomaly(d: f64) -> f64 {
    RAD * (357.5291 + 0.985_600_28 * d)
}

fn ecliptic_longitude(m: f64) -> f64 {
    let center = RAD * (1.9148 * m.sin() + 0.02 * (2.0 * m).sin() + 0.0003 * (3.0 * m).sin());
    let perihelion = RAD * 102.9372;
    m + center + perihelion + PI
}

/// (declination, right ascension) of the sun.
fn sun_coordinates(d: f64) -> (f64, f64) {
    let l = ecliptic_longitude(solar_mean_anomaly(d));
    let declination = (OBLIQUITY.sin() * l.sin()).asin();
    let right_ascension = (l.sin() * OBLIQUITY.cos()).atan2(l.cos());
    (declination, right_ascension)
}

fn sidereal_time(d: f64, lw: f64) -> f64 {
    RAD * (280.16 + 360.985_623_5 * d) - lw
}
