//! Fixed-step clock.
//!
//! Rendering frames arrive at arbitrary intervals. The clock scales each
//! frame delta by the selected speed and banks it in two accumulators, which
//! are drained in whole fast and slow ticks. The tick sizes never change, so
//! the same total scaled time always yields the same tick sequence.

use serde::{Deserialize, Serialize};

use crate::config::ClockConfig;
use crate::math::{fixed_serde, Fixed};

/// Speed multipliers selectable by index. Index 0 pauses.
pub const SPEED_TABLE: [u32; 5] = [0, 1, 2, 4, 8];

/// Frame-to-tick converter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    #[serde(with = "fixed_serde")]
    fast_accumulator: Fixed,
    #[serde(with = "fixed_serde")]
    slow_accumulator: Fixed,
    speed_index: usize,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Clock at normal speed with empty accumulators.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fast_accumulator: Fixed::ZERO,
            slow_accumulator: Fixed::ZERO,
            speed_index: 1,
        }
    }

    /// Select a speed from [`SPEED_TABLE`]; out-of-range indices clamp to the
    /// fastest speed.
    pub fn set_speed_index(&mut self, index: usize) {
        self.speed_index = index.min(SPEED_TABLE.len() - 1);
    }

    /// Current speed index.
    #[must_use]
    pub const fn speed_index(&self) -> usize {
        self.speed_index
    }

    /// Current speed multiplier.
    #[must_use]
    pub const fn speed(&self) -> u32 {
        SPEED_TABLE[self.speed_index]
    }

    /// Whether the clock is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.speed() == 0
    }

    /// Bank a frame delta.
    pub fn accumulate(&mut self, frame_delta_ms: Fixed, config: &ClockConfig) {
        let clamped = frame_delta_ms.clamp(Fixed::ZERO, config.max_frame_delta_ms.max(Fixed::ZERO));
        let scaled = clamped.saturating_mul(Fixed::from_num(self.speed()));
        self.fast_accumulator = self.fast_accumulator.saturating_add(scaled);
        self.slow_accumulator = self.slow_accumulator.saturating_add(scaled);
    }

    /// Withdraw one fast tick if enough time is banked.
    pub fn take_fast_tick(&mut self, config: &ClockConfig) -> bool {
        take(&mut self.fast_accumulator, config.fast_tick_ms)
    }

    /// Withdraw one slow tick if enough time is banked.
    pub fn take_slow_tick(&mut self, config: &ClockConfig) -> bool {
        take(&mut self.slow_accumulator, config.slow_tick_ms)
    }

    /// Time banked toward the next fast tick.
    #[must_use]
    pub const fn fast_accumulator(&self) -> Fixed {
        self.fast_accumulator
    }
}

fn take(accumulator: &mut Fixed, tick_ms: Fixed) -> bool {
    if tick_ms > Fixed::ZERO && *accumulator >= tick_ms {
        *accumulator -= tick_ms;
        true
    } else {
        false
    }
}
