// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::time::Duration;

/// Multipliers of the base interval, indexed by consecutive failures.
pub const FIBONACCI: [u32; 6] = [1, 1, 2, 3, 5, 8];

/// Consecutive-failure position inside [`FIBONACCI`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RetryState {
    index: usize,
}

impl RetryState {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn delay(&self, base: Duration) -> Duration {
        base * FIBONACCI[self.index]
    }

    /// One more failure; sticks at the last multiplier.
    pub fn increment(&mut self) {
        self.index = (self.index + 1).min(FIBONACCI.len() - 1);
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}
