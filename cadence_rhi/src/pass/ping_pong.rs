/// Ping-pong selection between two resources
///
/// One resource is read while the other is written. `advance` counts one tick
/// and swaps the roles after every `cadence`-th tick (ticks cadence, 2*cadence, ...),
/// so 120 ticks at a cadence of 60 swap exactly twice. A cadence of 0 never swaps.
/// Callers advance between passes, never while one is open.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingPongSelector<T> {
    resources: [T; 2],
    read_index: usize,
    cadence: u32,
    ticks: u64,
    generation: u64,
}

impl<T: Copy + PartialEq> PingPongSelector<T> {
    /// `first` starts as the read side, `second` as the write side
    pub fn new(first: T, second: T, cadence: u32) -> Result<Self> {
        if first == second {
            return Err(Error::InvalidState(
                "ping-pong selector needs two distinct resources".to_string(),
            ));
        }
        Ok(Self {
            resources: [first, second],
            read_index: 0,
            cadence,
            ticks: 0,
            generation: 0,
        })
    }

    /// Current read side
    pub fn read(&self) -> T {
        self.resources[self.read_index]
    }

    /// Current write side
    pub fn write(&self) -> T {
        self.resources[1 - self.read_index]
    }

    /// Count one tick; returns true when the roles were swapped
    pub fn advance(&mut self) -> bool {
        self.ticks += 1;
        if self.cadence > 0 && self.ticks % self.cadence as u64 == 0 {
            self.swap();
            true
        } else {
            false
        }
    }

    /// Swap roles immediately
    pub fn swap(&mut self) {
        self.read_index = 1 - self.read_index;
        self.generation += 1;
    }

    /// Number of swaps so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn cadence(&self) -> u32 {
        self.cadence
    }

    /// Both resources, in construction order
    pub fn resources(&self) -> [T; 2] {
        self.resources
    }
}

#[cfg(test)]
#[path = "ping_pong_tests.rs"]
mod tests;
