//! Per-frame traffic statistics.

use crate::heading::{Axis, Heading};
use crate::network::RoadNetwork;
use crate::vehicle::Vehicle;
use crate::IntersectionId;
use cgmath::prelude::*;
use std::collections::BTreeMap;

/// A summary of the vehicles in the simulation at the end of a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Telemetry {
    /// The number of live vehicles.
    pub count: usize,
    /// The mean speed of the live vehicles, or 0 if there are none.
    pub avg_speed: f64,
    /// The number of vehicles queued on each approach.
    pub queues: QueueMap,
}

/// The number of vehicles near each intersection, keyed by the
/// intersection and the heading they approach it in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueMap(BTreeMap<(IntersectionId, Heading), usize>);

impl QueueMap {
    /// The number of vehicles approaching `id` in `heading`.
    pub fn get(&self, id: IntersectionId, heading: Heading) -> usize {
        self.0.get(&(id, heading)).copied().unwrap_or(0)
    }

    /// The non-empty queues.
    pub fn iter(&self) -> impl Iterator<Item = (IntersectionId, Heading, usize)> + '_ {
        self.0.iter().map(|((id, heading), count)| (*id, *heading, *count))
    }

    /// The total queued on both approaches along an axis.
    pub fn axis_total(&self, id: IntersectionId, axis: Axis) -> usize {
        Heading::ALL
            .into_iter()
            .filter(|heading| heading.axis() == axis)
            .map(|heading| self.get(id, heading))
            .sum()
    }

    /// The total queued on every approach.
    pub fn total(&self, id: IntersectionId) -> usize {
        Heading::ALL.into_iter().map(|heading| self.get(id, heading)).sum()
    }

    /// The intersection with the most queued vehicles, if any are queued.
    pub fn most_congested(&self) -> Option<(IntersectionId, usize)> {
        let mut totals = BTreeMap::<IntersectionId, usize>::new();
        for ((id, _), count) in &self.0 {
            *totals.entry(*id).or_default() += count;
        }
        totals.into_iter().max_by_key(|(_, total)| *total)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn increment(&mut self, id: IntersectionId, heading: Heading) {
        *self.0.entry((id, heading)).or_default() += 1;
    }
}

/// Summarises a set of vehicles.
///
/// A vehicle counts towards a queue if it's within `radius` of its target
/// intersection's centre.
pub fn aggregate<'a>(
    vehicles: impl IntoIterator<Item = &'a Vehicle>,
    network: &RoadNetwork,
    radius: f64,
) -> Telemetry {
    let mut count = 0;
    let mut total_speed = 0.0;
    let mut queues = QueueMap::default();

    for vehicle in vehicles {
        count += 1;
        total_speed += vehicle.speed();

        let centre = vehicle.target().and_then(|id| Some((id, network.centre(id)?)));
        if let Some((id, centre)) = centre {
            if (vehicle.position() - centre).magnitude() < radius {
                queues.increment(id, vehicle.heading());
            }
        }
    }

    Telemetry {
        count,
        avg_speed: if count > 0 {
            total_speed / count as f64
        } else {
            0.0
        },
        queues,
    }
}
