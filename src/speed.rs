//! Speed smoothing.
//!
//! A single-state Kalman filter over instantaneous speed samples. GPS
//! speed jitters by several km/h between fixes; the filter keeps the
//! speed readout from flickering.

/// One-dimensional Kalman filter for speed in km/h.
#[derive(Debug, Clone)]
pub struct SpeedFilter {
    process_noise: f64,
    measurement_noise: f64,
    estimate_variance: f64,
    estimate: f64,
}

impl SpeedFilter {
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate_variance: 1.0,
            estimate: 0.0,
        }
    }

    /// Feed one speed sample in km/h and return the smoothed estimate.
    ///
    /// Non-finite samples are ignored and the current estimate is returned.
    pub fn update(&mut self, measurement: f64) -> f64 {
        if !measurement.is_finite() {
            return self.estimate;
        }

        let predicted_variance = self.estimate_variance + self.process_noise;
        let gain = predicted_variance / (predicted_variance + self.measurement_noise);
        self.estimate += gain * (measurement - self.estimate);
        self.estimate_variance = (1.0 - gain) * predicted_variance;
        self.estimate
    }

    /// Feed a sample in m/s, as reported by location providers.
    pub fn update_mps(&mut self, speed_mps: f64) -> f64 {
        self.update(speed_mps * 3.6)
    }

    /// Current estimate in km/h.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }
}
