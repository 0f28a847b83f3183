// Rolling window of speed samples used for the rate-of-change estimate
use std::collections::VecDeque;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    samples: VecDeque<(f64, Instant)>,
    capacity: usize,
}

impl SmoothingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity. Shrinking drops the oldest samples; growing lets
    /// the window fill up over the next pushes.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    /// Append a sample and return the derivative in km/h per second between
    /// the oldest and newest samples in the window.
    pub fn push(&mut self, speed_kmh: f64, at: Instant) -> f64 {
        self.samples.push_back((speed_kmh, at));
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
        self.derivative()
    }

    pub fn derivative(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let (Some(&(oldest, t0)), Some(&(newest, t1))) = (self.samples.front(), self.samples.back())
        else {
            return 0.0;
        };

        let elapsed = t1.saturating_duration_since(t0).as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        (newest - oldest) / elapsed
    }
}

#[cfg(test)]
impl SmoothingWindow {
    fn len(&self) -> usize {
        self.samples.len()
    }
}
