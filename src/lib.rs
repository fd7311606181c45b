pub use cgmath;
pub use config::{KinematicAttributes, SimulationConfig};
pub use error::BuildError;
pub use heading::{Axis, Heading, Turn};
pub use incident::{Incident, IncidentKind, Severity};
pub use light::{LightState, SignalOverride, TrafficLight};
pub use network::{GridCoord, Intersection, NetworkAttributes, RoadNetwork, Segment, SegmentId};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use telemetry::{aggregate, QueueMap, Telemetry};
pub use util::Interval;
pub use vehicle::{Mission, MotionState, Vehicle, VehicleClass};

mod config;
mod error;
mod heading;
mod incident;
mod light;
pub mod math;
mod network;
mod simulation;
mod spawn;
mod telemetry;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of an [Intersection].
    pub struct IntersectionId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of an [Incident].
    pub struct IncidentId;
}

type IntersectionSet = SlotMap<IntersectionId, Intersection>;
type VehicleSet = SlotMap<VehicleId, Vehicle>;
type IncidentSet = SlotMap<IncidentId, Incident>;
