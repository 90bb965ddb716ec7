use std::time::Duration;

/// Delay inserted between a failed attempt and the next retry.
///
/// `attempt` is the 0-based index of the attempt that just failed, so the
/// first retry waits `delay(0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffPolicy {
    /// Retry immediately.
    None,

    /// `base * (attempt + 1)`. Used by the transaction executor.
    Linear { base: Duration },

    /// `min(base * multiplier^attempt, max)`.
    Exponential {
        base: Duration,
        multiplier: f64,
        max: Duration,
    },
}

impl BackoffPolicy {
    pub fn linear(base: Duration) -> Self {
        Self::Linear { base }
    }

    pub fn exponential(base: Duration, multiplier: f64, max: Duration) -> Self {
        Self::Exponential {
            base,
            multiplier,
            max,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffPolicy::None => Duration::ZERO,
            BackoffPolicy::Linear { base } => base.saturating_mul(attempt.saturating_add(1)),
            BackoffPolicy::Exponential {
                base,
                multiplier,
                max,
            } => {
                // Multipliers below 1.0 would make delays shrink.
                let factor = multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
                let scaled = base.as_secs_f64() * factor;
                if !scaled.is_finite() || scaled >= max.as_secs_f64() {
                    max
                } else {
                    Duration::from_secs_f64(scaled).min(max)
                }
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::linear(Duration::from_millis(100))
    }
}
