//! Record of the planes the user has visited

use serde::{Deserialize, Serialize};

use crate::coord::PlaneCoord;
use crate::direction::Direction;

/// Ordered, append-only sequence of visited planes.
///
/// The full history is kept for the lifetime of the viewer session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationHistory {
    visits: Vec<PlaneCoord>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a visit, even if it repeats the previous one.
    pub fn record_visit(&mut self, coord: PlaneCoord) {
        tracing::trace!(coord = %coord, visits = self.visits.len() + 1, "Recorded visit");
        self.visits.push(coord);
    }

    /// Direction through the two most recent distinct visits.
    ///
    /// Scans backward from the latest visit for the first different plane;
    /// repeated visits to the same plane therefore never change the direction.
    pub fn current_direction(&self) -> Option<Direction> {
        let (latest, earlier) = self.visits.split_last()?;
        let previous = earlier.iter().rev().find(|coord| *coord != latest)?;
        Direction::through(previous, latest)
    }

    pub fn last_visit(&self) -> Option<PlaneCoord> {
        self.visits.last().copied()
    }

    pub fn visits(&self) -> &[PlaneCoord] {
        &self.visits
    }

    pub fn len(&self) -> usize {
        self.visits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }

    /// The next `count` planes along the current direction, nearest first.
    ///
    /// Stops early at the edge of the index range; empty if no direction is
    /// defined.
    pub fn predict_next(&self, count: usize) -> Vec<PlaneCoord> {
        let Some(direction) = self.current_direction() else {
            return Vec::new();
        };
        (1..=count as i64)
            .map_while(|k| direction.project(k))
            .collect()
    }
}
