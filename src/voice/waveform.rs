use std::collections::VecDeque;

/// Tallest bar the composer draws
pub const MAX_BAR_HEIGHT: u8 = 20;

/// Rolling amplitude bars shown while recording
///
/// Purely cosmetic: one bar per refresh, derived from the latest input level
/// the recording engine reported.
#[derive(Debug, Clone)]
pub struct Waveform {
    bars: VecDeque<u8>,
    capacity: usize,
    level: f32,
}

impl Waveform {
    pub fn new(capacity: usize) -> Self {
        Self {
            bars: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            level: 0.0,
        }
    }

    pub fn set_level(&mut self, level: f32) {
        self.level = level.clamp(0.0, 1.0);
    }

    /// Append a bar for the current level
    pub fn refresh(&mut self) {
        // sqrt lifts quiet speech off the floor
        let height = (self.level.sqrt() * MAX_BAR_HEIGHT as f32).round() as u8;
        self.bars.push_back(height.max(1));
        while self.bars.len() > self.capacity {
            self.bars.pop_front();
        }
    }

    pub fn samples(&self) -> Vec<u8> {
        self.bars.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.bars.clear();
        self.level = 0.0;
    }
}
