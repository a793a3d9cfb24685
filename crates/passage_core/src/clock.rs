use tracing::warn;

/// Monotonic frame clock driven by the host's per-frame delta.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameClock {
    elapsed_s: f32,
    frame: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances by `dt_s` and returns the new elapsed time.
    pub fn advance(&mut self, dt_s: f32) -> f32 {
        if dt_s.is_finite() && dt_s > 0.0 {
            self.elapsed_s += dt_s;
        } else if dt_s != 0.0 {
            warn!("Ignoring non-positive frame delta {dt_s}");
        }
        self.frame += 1;
        self.elapsed_s
    }

    pub fn elapsed_s(&self) -> f32 {
        self.elapsed_s
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}
