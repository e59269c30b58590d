//! Bounded path buffer and circle fit.

use std::collections::VecDeque;

use crate::sample::{Point, centroid};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    pub center: Point,
    /// Mean distance from the centroid.
    pub radius: f32,
    /// Coefficient of variation of the distances (stddev / mean).
    pub deviation: f32,
}

#[derive(Debug, Clone)]
pub struct CirclePathBuffer {
    points: VecDeque<Point>,
    capacity: usize,
    min_points: usize,
}

impl CirclePathBuffer {
    pub fn new(capacity: usize, min_points: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
            min_points: min_points.clamp(1, capacity),
        }
    }

    /// Appends a point, evicting the oldest once full.
    pub fn push(&mut self, p: Point) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(p);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// `None` until enough points were collected or when all points coincide.
    pub fn fit(&self) -> Option<CircleFit> {
        if self.points.len() < self.min_points {
            return None;
        }
        let pts: Vec<Point> = self.points.iter().copied().collect();
        let center = centroid(&pts)?;
        let dists: Vec<f32> = pts.iter().map(|p| center.distance_to(*p)).collect();
        let n = dists.len() as f32;
        let mean = dists.iter().sum::<f32>() / n;
        if mean <= f32::EPSILON {
            return None;
        }
        let var = dists.iter().map(|d| (d - mean) * (d - mean)).sum::<f32>() / n;
        Some(CircleFit {
            center,
            radius: mean,
            deviation: var.sqrt() / mean,
        })
    }
}
