//! Gapless scheduling of assistant audio on the output clock.
//!
//! Buffers are placed back-to-back on the clock's timeline: each one starts
//! at `max(cursor, clock.now())` and pushes the cursor forward by its
//! duration. Every scheduled buffer stays in the live set until the clock
//! reports it finished or an interruption halts it.

use super::backend::{AudioBuffer, OutputClock};
use crate::error::Result;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Where a buffer landed on the output timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledBuffer {
    pub id: u64,
    pub start_at: f64,
    pub duration: f64,
}

pub struct PlaybackScheduler {
    clock: Box<dyn OutputClock>,
    next_start_time: f64,
    live: BTreeSet<u64>,
    next_id: u64,
}

impl PlaybackScheduler {
    pub fn new(clock: Box<dyn OutputClock>) -> Self {
        Self {
            clock,
            next_start_time: 0.0,
            live: BTreeSet::new(),
            next_id: 0,
        }
    }

    /// Schedule a decoded buffer right after everything already queued
    pub fn enqueue(&mut self, buffer: &AudioBuffer) -> Result<ScheduledBuffer> {
        let start_at = self.next_start_time.max(self.clock.current_time());
        let duration = buffer.duration();
        let id = self.next_id;
        self.next_id += 1;

        self.clock.start_buffer(id, buffer, start_at)?;
        self.next_start_time = start_at + duration;
        self.live.insert(id);

        debug!(
            "Scheduled buffer {} at {:.3}s ({:.3}s, {} live)",
            id,
            start_at,
            duration,
            self.live.len()
        );

        Ok(ScheduledBuffer {
            id,
            start_at,
            duration,
        })
    }

    /// Record that a buffer finished playing
    ///
    /// Returns whether anything is still speaking. Unknown ids (buffers
    /// already halted by an interruption) are ignored.
    pub fn on_ended(&mut self, id: u64) -> bool {
        self.live.remove(&id);
        self.is_speaking()
    }

    /// Halt every live buffer and rewind the cursor
    pub fn interrupt(&mut self) {
        let halted = self.live.len();
        for id in std::mem::take(&mut self.live) {
            self.clock.stop_buffer(id);
        }
        self.next_start_time = 0.0;

        if halted > 0 {
            info!("Playback interrupted: halted {} buffers", halted);
        }
    }

    /// Halt playback and release the output clock
    pub fn close(&mut self) -> Result<()> {
        self.interrupt();
        if !self.clock.is_closed() {
            self.clock.close()?;
        }
        Ok(())
    }

    /// True while at least one buffer is scheduled or playing
    pub fn is_speaking(&self) -> bool {
        !self.live.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn next_start_time(&self) -> f64 {
        self.next_start_time
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }
}
