use crate::math::Point2d;
use crate::network::{RoadNetwork, SegmentId};
use crate::vehicle::{Vehicle, VehicleClass};
use crate::{IncidentId, VehicleId, VehicleSet};
use rand::seq::SliceRandom;
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Something on the road network which needs attention.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Incident {
    pub(crate) id: IncidentId,
    /// What happened.
    pub kind: IncidentKind,
    /// Where it happened, in world space.
    pub location: Point2d,
    pub description: String,
    pub severity: Severity,
    /// The frame in which the incident was recorded.
    pub created: usize,
    /// The road segment closed by the incident.
    pub blocks: Option<SegmentId>,
    /// The vehicle disabled by the incident.
    pub vehicle: Option<VehicleId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IncidentKind {
    Breakdown,
    Collision,
    Roadwork,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Incident {
    pub fn id(&self) -> IncidentId {
        self.id
    }
}

/// Randomly breaks down vehicles.
///
/// At most one broken down vehicle is on the road at any time.
#[derive(Clone, Debug)]
pub(crate) struct BreakdownInjector {
    /// A breakdown is considered once every this many frames.
    interval: usize,
    /// The chance that a considered breakdown happens.
    probability: f64,
    /// Breakdowns only happen while more than this many vehicles are live.
    min_population: usize,
}

impl BreakdownInjector {
    pub fn new(interval: u32, probability: f64, min_population: usize) -> Self {
        Self {
            interval: interval.max(1) as usize,
            probability,
            min_population,
        }
    }

    /// Picks a vehicle to break down this frame, if one should.
    pub fn pick(
        &self,
        frame: usize,
        vehicles: &VehicleSet,
        rng: &mut impl Rng,
    ) -> Option<VehicleId> {
        if frame % self.interval != 0 || vehicles.len() <= self.min_population {
            return None;
        }
        if vehicles.values().any(Vehicle::is_broken_down) {
            return None;
        }
        if !rng.gen_bool(self.probability) {
            return None;
        }
        let eligible = vehicles
            .values()
            .filter(|v| v.class() != VehicleClass::Police && !v.is_broken_down())
            .map(Vehicle::id)
            .collect::<Vec<_>>();
        eligible.choose(rng).copied()
    }
}

/// The segment a vehicle is travelling along: the one between the
/// intersection behind it and its target.
pub(crate) fn occupied_segment(vehicle: &Vehicle, network: &RoadNetwork) -> Option<SegmentId> {
    let target = vehicle.target()?;
    let behind = network
        .intersection(target)?
        .coord()
        .step(vehicle.heading().reverse());
    Some(SegmentId::new(network.at(behind)?, target))
}

/// Records the breakdown of a vehicle.
pub(crate) fn breakdown(
    id: IncidentId,
    vehicle: &Vehicle,
    network: &RoadNetwork,
    frame: usize,
) -> Incident {
    let blocks = occupied_segment(vehicle, network);
    let road = blocks
        .and_then(|id| network.segment(id))
        .map_or("an unknown road", |segment| segment.name());
    let class = match vehicle.class() {
        VehicleClass::Car => "car",
        VehicleClass::Auto => "auto rickshaw",
        VehicleClass::Bus => "bus",
        VehicleClass::Police => "police vehicle",
    };
    Incident {
        id,
        kind: IncidentKind::Breakdown,
        location: vehicle.position(),
        description: format!("A {} has broken down on {}, causing a major blockage.", class, road),
        severity: Severity::Medium,
        created: frame,
        blocks,
        vehicle: Some(vehicle.id()),
    }
}
