//! Sun samples over a local-time daylight window.
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::solar::{sun_position, SiteLocation, SunPosition};

/// A sun position at one instant of the sampling window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunSample {
    pub timestamp: DateTime<Utc>,
    pub position: SunPosition,
    /// Unit vector toward the sun.
    pub direction: Vec3,
}

impl SunSample {
    /// Only samples with the sun above the horizon take part in aggregation.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.position.is_above_horizon()
    }
}

/// Local-time window whose sun positions represent "a day of sun".
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolarWindow {
    /// First sample, in local hours.
    pub start_hour: f32,
    /// Last sample, in local hours.
    pub end_hour: f32,
    /// Number of evenly spaced samples, both ends included.
    pub samples: usize,
}

impl Default for SolarWindow {
    fn default() -> Self {
        Self {
            start_hour: 8.0,
            end_hour: 16.0,
            samples: 5,
        }
    }
}

impl SolarWindow {
    pub fn new(start_hour: f32, end_hour: f32, samples: usize) -> Self {
        Self {
            start_hour,
            end_hour,
            samples,
        }
    }

    /// Nominal hours of daylight represented by the window.
    pub fn window_hours(&self) -> f32 {
        self.end_hour - self.start_hour
    }

    /// Local clock hours at which the sun is sampled.
    pub fn local_hours(&self) -> Vec<f32> {
        match self.samples {
            0 => Vec::new(),
            1 => vec![(self.start_hour + self.end_hour) * 0.5],
            n => {
                let step = self.window_hours() / (n - 1) as f32;
                (0..n).map(|i| self.start_hour + step * i as f32).collect()
            }
        }
    }

    /// Sun samples on the site-local calendar day containing `reference`.
    pub fn sun_samples(&self, reference: DateTime<Utc>, site: &SiteLocation) -> Vec<SunSample> {
        let offset = site.utc_offset;
        let local_midnight = reference
            .with_timezone(&offset)
            .date_naive()
            .and_time(NaiveTime::MIN);
        let to_utc = TimeDelta::seconds(i64::from(offset.local_minus_utc()));

        self.local_hours()
            .into_iter()
            .map(|hour| {
                let local = local_midnight + TimeDelta::seconds((hour * 3600.0).round() as i64);
                let timestamp = (local - to_utc).and_utc();
                let position = sun_position(timestamp, site.latitude, site.longitude);
                SunSample {
                    timestamp,
                    position,
                    direction: position.direction(),
                }
            })
            .collect()
    }
}
