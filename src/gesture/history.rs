//! Fixed-capacity ring buffer of thumb-index distances.
//!
//! Only used for smoothing; the raw distance remains the control input.

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceHistory {
    data: Vec<f32>,
    capacity: usize,
    // Next slot to write once the buffer is full
    write_index: usize,
}

impl DistanceHistory {
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            write_index: 0,
        }
    }

    /// O(1) push, evicting the oldest sample once full
    pub fn push(&mut self, distance: f32) {
        if self.data.len() < self.capacity {
            self.data.push(distance);
        } else {
            self.data[self.write_index] = distance;
        }
        self.write_index = (self.write_index + 1) % self.capacity;
    }

    pub fn mean(&self) -> Option<f32> {
        if self.data.is_empty() {
            None
        } else {
            Some(self.data.iter().sum::<f32>() / self.data.len() as f32)
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for DistanceHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
