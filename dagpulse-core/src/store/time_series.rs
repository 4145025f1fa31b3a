//! Bounded drop-oldest buffer for hashrate samples.

use std::collections::VecDeque;

use crate::types::TimeSeriesPoint;

/// Fixed-capacity ring of time-series points, oldest first.
///
/// Pushing past capacity evicts from the front, so the buffer always holds
/// the newest `capacity` points in insertion order.
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    points: VecDeque<TimeSeriesPoint>,
    capacity: usize,
}

impl TimeSeriesBuffer {
    /// Creates an empty buffer holding at most `capacity` points.
    ///
    /// A zero capacity is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a point, returning the evicted point if the buffer was full.
    pub fn push(&mut self, point: TimeSeriesPoint) -> Option<TimeSeriesPoint> {
        let evicted = if self.points.len() == self.capacity {
            self.points.pop_front()
        } else {
            None
        };
        self.points.push_back(point);
        evicted
    }

    /// Returns the newest `limit` points, oldest first.
    pub fn latest(&self, limit: usize) -> Vec<TimeSeriesPoint> {
        let skip = self.points.len().saturating_sub(limit);
        self.points.iter().skip(skip).copied().collect()
    }

    /// Returns the most recent point.
    pub fn last(&self) -> Option<&TimeSeriesPoint> {
        self.points.back()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copies all points out, oldest first.
    pub fn to_vec(&self) -> Vec<TimeSeriesPoint> {
        self.points.iter().copied().collect()
    }
}
