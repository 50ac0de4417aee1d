use crate::events::{BloodPressure, Reading, Vector3};
use crate::ingestion::{FetchFuture, ReadingSource};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// What a synthetic source generates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticKind {
    /// Headline vitals plus motion vectors
    Vitals,
    /// Motion vectors only, for the fast tick
    MotionOnly,
}

/// Generator of plausible readings used when the live feed is unavailable
///
/// Vitals are whole numbers inside the normal range (heart rate 60-90 BPM,
/// blood pressure 110-129/70-79 mmHg, blood sugar 80-110 mg/dL, SpO2
/// 95-100%), so fallback data never raises an alert on its own. Gyroscope
/// components lie in [-1, 1] and accelerometer components in [-5, 5], both
/// rounded to two decimals.
pub struct SyntheticReadingSource {
    rng: Mutex<StdRng>,
    kind: SyntheticKind,
}

impl SyntheticReadingSource {
    /// Create a vitals generator seeded from the OS
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy(), SyntheticKind::Vitals)
    }

    /// Create a vitals generator with a fixed seed for reproducible output
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), SyntheticKind::Vitals)
    }

    fn with_rng(rng: StdRng, kind: SyntheticKind) -> Self {
        Self {
            rng: Mutex::new(rng),
            kind,
        }
    }

    /// Switch this generator to motion-only readings
    pub fn motion_only(mut self) -> Self {
        self.kind = SyntheticKind::MotionOnly;
        self
    }

    pub fn kind(&self) -> SyntheticKind {
        self.kind
    }

    /// Generate a reading stamped with the current time
    pub fn generate(&self) -> Reading {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);

        let gyroscope = random_vector(&mut *rng, 1.0);
        let accelerometer = random_vector(&mut *rng, 5.0);
        let reading = Reading::empty(Utc::now()).with_motion(gyroscope, accelerometer);

        match self.kind {
            SyntheticKind::MotionOnly => reading,
            SyntheticKind::Vitals => Reading {
                heart_rate: Some(f64::from(rng.gen_range(60..=90u32))),
                blood_pressure: Some(BloodPressure::new(
                    f64::from(rng.gen_range(110..=129u32)),
                    f64::from(rng.gen_range(70..=79u32)),
                )),
                blood_sugar: Some(f64::from(rng.gen_range(80..=110u32))),
                spo2: Some(f64::from(rng.gen_range(95..=100u32))),
                ..reading
            },
        }
    }
}

impl Default for SyntheticReadingSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Vector with each component uniform in [-bound, bound], two decimals
fn random_vector<R: Rng>(rng: &mut R, bound: f64) -> Vector3 {
    let mut component = || (rng.gen_range(-bound..=bound) * 100.0).round() / 100.0;
    Vector3::new(component(), component(), component())
}

impl ReadingSource for SyntheticReadingSource {
    fn fetch<'a>(&'a self) -> FetchFuture<'a> {
        Box::pin(async move { Ok(self.generate()) })
    }

    fn name(&self) -> &str {
        match self.kind {
            SyntheticKind::Vitals => "synthetic",
            SyntheticKind::MotionOnly => "synthetic-motion",
        }
    }
}
