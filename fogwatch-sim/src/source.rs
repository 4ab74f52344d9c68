//! Simulated Edge Devices
//!
//! ## Overview
//!
//! An edge device is a camera or sensor unit posted at one location,
//! producing one [`Reading`] per request. The simulation draws field values
//! from a per-device profile so each junction has its own character: a
//! highway exit floods earlier than an industrial gate.
//!
//! The core treats a device purely as a supplier: the [`ReadingSource`]
//! trait is the whole contract, and the only promise a device makes is a
//! non-negative vehicle count (guaranteed here by construction: counts are
//! unsigned draws from the profile range).

use std::sync::Arc;

use rand::Rng;
use serde::Serialize;

use fogwatch_core::time::Clock;
use fogwatch_core::Reading;

/// Supplier of raw telemetry readings
pub trait ReadingSource: Send + Sync {
    /// Produce one reading
    fn generate(&self) -> Reading;
}

/// Static character of one simulated device
#[derive(Debug, Clone, Serialize)]
pub struct DeviceProfile {
    /// Device identifier (e.g. "CAM_001")
    pub device_id: String,
    /// Monitored location
    pub location: String,
    /// Inclusive vehicle count range this device observes
    pub vehicle_range: (u32, u32),
    /// Inclusive speed range in km/h, for devices that measure speed
    pub speed_range: Option<(f32, f32)>,
}

/// One simulated edge device
pub struct EdgeDevice {
    profile: DeviceProfile,
    clock: Arc<dyn Clock>,
}

impl EdgeDevice {
    /// Create a device with the given profile, stamping readings via `clock`
    pub fn new(profile: DeviceProfile, clock: Arc<dyn Clock>) -> Self {
        Self { profile, clock }
    }

    /// Device identifier
    pub fn device_id(&self) -> &str {
        &self.profile.device_id
    }

    /// Profile snapshot for stats assembly
    pub fn info(&self) -> DeviceProfile {
        self.profile.clone()
    }
}

impl ReadingSource for EdgeDevice {
    fn generate(&self) -> Reading {
        let mut rng = rand::thread_rng();

        let (min_count, max_count) = self.profile.vehicle_range;
        let vehicle_count = rng.gen_range(min_count..=max_count);

        let average_speed = self
            .profile
            .speed_range
            .map(|(min_speed, max_speed)| rng.gen_range(min_speed..=max_speed));

        Reading {
            device_id: self.profile.device_id.clone(),
            location: self.profile.location.clone(),
            vehicle_count,
            average_speed,
            generated_at: self.clock.now(),
        }
    }
}

/// The default pool of five junction devices
pub fn sample_devices(clock: Arc<dyn Clock>) -> Vec<Arc<EdgeDevice>> {
    let profiles = [
        DeviceProfile {
            device_id: "CAM_001".into(),
            location: "Main Street Junction".into(),
            vehicle_range: (5, 100),
            speed_range: Some((10.0, 60.0)),
        },
        DeviceProfile {
            device_id: "CAM_002".into(),
            location: "Highway Exit 12".into(),
            vehicle_range: (20, 120),
            speed_range: Some((40.0, 110.0)),
        },
        DeviceProfile {
            device_id: "CAM_003".into(),
            location: "Downtown Square".into(),
            vehicle_range: (10, 90),
            speed_range: Some((5.0, 45.0)),
        },
        DeviceProfile {
            device_id: "CAM_004".into(),
            location: "Airport Road".into(),
            vehicle_range: (15, 110),
            speed_range: Some((30.0, 90.0)),
        },
        DeviceProfile {
            device_id: "CAM_005".into(),
            location: "Industrial Park Gate".into(),
            vehicle_range: (0, 60),
            speed_range: None,
        },
    ];

    profiles
        .into_iter()
        .map(|profile| Arc::new(EdgeDevice::new(profile, Arc::clone(&clock))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fogwatch_core::time::FixedClock;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(7_000))
    }

    #[test]
    fn readings_respect_the_profile() {
        let device = EdgeDevice::new(
            DeviceProfile {
                device_id: "CAM_TEST".into(),
                location: "Test Junction".into(),
                vehicle_range: (40, 45),
                speed_range: Some((10.0, 20.0)),
            },
            clock(),
        );

        for _ in 0..100 {
            let reading = device.generate();
            assert_eq!(reading.device_id, "CAM_TEST");
            assert!((40..=45).contains(&reading.vehicle_count));
            let speed = reading.average_speed.unwrap();
            assert!((10.0..=20.0).contains(&speed));
            assert_eq!(reading.generated_at, 7_000);
        }
    }

    #[test]
    fn speedless_profile_yields_no_speed() {
        let device = EdgeDevice::new(
            DeviceProfile {
                device_id: "CAM_TEST".into(),
                location: "Test Gate".into(),
                vehicle_range: (0, 10),
                speed_range: None,
            },
            clock(),
        );

        assert!(device.generate().average_speed.is_none());
    }

    #[test]
    fn sample_pool_has_five_distinct_devices() {
        let devices = sample_devices(clock());
        assert_eq!(devices.len(), 5);

        let mut ids: Vec<&str> = devices.iter().map(|d| d.device_id()).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }
}
