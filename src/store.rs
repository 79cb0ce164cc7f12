//! ==============================================================================
//! store.rs - in-memory sensor state
//! ==============================================================================
//!
//! purpose:
//!     holds the current reading and the append-only history of every reading
//!     a station has posted. this is the only mutable state in the process.
//!
//! relationships:
//!     - owned by: main.rs (created once, handed to the router as state)
//!     - used by: api.rs (sensor endpoints write/read, ai endpoints read)
//!
//! concurrency:
//!     current + history live behind ONE rwlock, so a record is a single
//!     critical section: the reading that becomes current is always the last
//!     history entry. readers never observe one without the other.
//!
//! ==============================================================================

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::{SensorInput, SensorReading};

#[derive(Default)]
struct StoreState {
    current: Option<SensorReading>,
    history: Vec<SensorReading>,
}

/// Clone-able handle to the shared sensor state.
#[derive(Clone)]
pub struct SensorStore {
    state: Arc<RwLock<StoreState>>,
    fallback: Option<Arc<SensorInput>>,
}

impl SensorStore {
    pub fn new(fallback: Option<SensorInput>) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            fallback: fallback.map(Arc::new),
        }
    }

    pub fn fallback(&self) -> Option<&SensorInput> {
        self.fallback.as_deref()
    }

    /// Stamp a partial reading, make it current and append it to history.
    /// Also returns the history length right after the append.
    pub async fn record(&self, input: SensorInput) -> (SensorReading, usize) {
        let fb = self.fallback();
        // stamp under the lock so history stays ordered by acceptance time
        let mut state = self.state.write().await;
        let reading = SensorReading {
            timestamp: Utc::now(),
            station_id: input.station_id.or_else(|| fb.and_then(|f| f.station_id.clone())),
            station_name: input.station_name.or_else(|| fb.and_then(|f| f.station_name.clone())),
            temperature: input.temperature.or(fb.and_then(|f| f.temperature)),
            humidity: input.humidity.or(fb.and_then(|f| f.humidity)),
            ph: input.ph.or(fb.and_then(|f| f.ph)),
            co2_ppm: input.co2_ppm.or(fb.and_then(|f| f.co2_ppm)),
            light_intensity: input.light_intensity.or(fb.and_then(|f| f.light_intensity)),
            water_level: input.water_level.or(fb.and_then(|f| f.water_level)),
            latitude: input.latitude.or(fb.and_then(|f| f.latitude)),
            longitude: input.longitude.or(fb.and_then(|f| f.longitude)),
            accuracy: input.accuracy.or(fb.and_then(|f| f.accuracy)),
            satellites: input.satellites.or(fb.and_then(|f| f.satellites)),
            altitude: input.altitude.or(fb.and_then(|f| f.altitude)),
            gps_valid: input.gps_valid.or(fb.and_then(|f| f.gps_valid)).unwrap_or(false),
        };

        state.history.push(reading.clone());
        state.current = Some(reading.clone());
        (reading, state.history.len())
    }

    /// `None` until the first reading arrives.
    pub async fn current(&self) -> Option<SensorReading> {
        self.state.read().await.current.clone()
    }

    /// Every reading ever recorded, oldest first.
    pub async fn history(&self) -> Vec<SensorReading> {
        self.state.read().await.history.clone()
    }
}

// ==============================================================================
// field resolution
// ==============================================================================

/// Where a prompt value comes from, highest precedence first:
/// request override, then the current reading, then the fallback profile.
///
/// Returns `Err(NoSensorData)` only when there is neither a current reading nor a
/// fallback profile; a field that is merely null everywhere resolves to `Ok(None)`.
pub fn resolve<T: Clone>(
    override_value: Option<T>,
    current: Option<&SensorReading>,
    fallback: Option<&SensorInput>,
    current_field: impl Fn(&SensorReading) -> Option<T>,
    fallback_field: impl Fn(&SensorInput) -> Option<T>,
) -> Result<Option<T>, NoSensorData> {
    if override_value.is_some() {
        return Ok(override_value);
    }
    if current.is_none() && fallback.is_none() {
        return Err(NoSensorData);
    }
    Ok(current
        .and_then(|c| current_field(c))
        .or_else(|| fallback.and_then(|f| fallback_field(f))))
}

/// nothing to resolve a value from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoSensorData;
