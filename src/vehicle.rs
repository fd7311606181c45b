use crate::heading::Heading;
use crate::math::Point2d;
use crate::{IncidentId, IntersectionId, VehicleId};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub(crate) use kinematics::{KinematicModel, Motion};
pub(crate) use routing::Arrival;

mod kinematics;
pub(crate) mod routing;

/// A simulated vehicle.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// The kind of vehicle.
    class: VehicleClass,
    /// The vehicle's length.
    length: f64,
    /// The vehicle's width.
    width: f64,
    /// The world space coordinates of the centre of the vehicle.
    pos: Point2d,
    /// The direction of travel.
    heading: Heading,
    /// The speed in units per frame.
    speed: f64,
    /// What the vehicle did during the last frame.
    state: MotionState,
    /// The next intersection on the vehicle's path, if it is still within the grid.
    target: Option<IntersectionId>,
    /// Whether the vehicle has broken down.
    broken_down: bool,
    /// The current objective of a police vehicle.
    mission: Option<Mission>,
}

/// The kinds of vehicle on the road.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VehicleClass {
    Car,
    /// An auto rickshaw.
    Auto,
    Bus,
    Police,
}

/// What a vehicle did during the last frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MotionState {
    Accelerating,
    Moving,
    Stopped,
}

/// The objective of a police vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Mission {
    /// Cruising with no fixed target. The patrol point is informational.
    Patrol { point: Option<IntersectionId> },
    /// Responding to an incident; the vehicle has right of way and steers
    /// towards `target`.
    Response {
        incident: IncidentId,
        target: IntersectionId,
    },
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 4] = [
        VehicleClass::Car,
        VehicleClass::Auto,
        VehicleClass::Bus,
        VehicleClass::Police,
    ];

    /// The (length, width) of the vehicle, as multiples of a car's length.
    pub fn proportions(self) -> (f64, f64) {
        match self {
            VehicleClass::Car => (1.0, 0.6),
            VehicleClass::Auto => (0.8, 0.7),
            VehicleClass::Bus => (3.5, 1.3),
            VehicleClass::Police => (1.5, 0.7),
        }
    }

    /// The relative frequency of this class among spawned vehicles.
    pub fn spawn_weight(self) -> f64 {
        match self {
            VehicleClass::Car => 0.65,
            VehicleClass::Auto => 0.27,
            VehicleClass::Bus => 0.06,
            VehicleClass::Police => 0.02,
        }
    }

    /// The mission a vehicle of this class starts with.
    fn initial_mission(self) -> Option<Mission> {
        match self {
            VehicleClass::Police => Some(Mission::Patrol { point: None }),
            _ => None,
        }
    }
}

impl Vehicle {
    /// Creates a new vehicle.
    pub(crate) fn new(
        id: VehicleId,
        class: VehicleClass,
        base_size: f64,
        pos: Point2d,
        heading: Heading,
        speed: f64,
        target: Option<IntersectionId>,
    ) -> Self {
        let (length, width) = class.proportions();
        Self {
            id,
            class,
            length: length * base_size,
            width: width * base_size,
            pos,
            heading,
            speed,
            state: MotionState::Accelerating,
            target,
            broken_down: false,
            mission: class.initial_mission(),
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn class(&self) -> VehicleClass {
        self.class
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// The coordinates in world space of the centre of the vehicle.
    pub fn position(&self) -> Point2d {
        self.pos
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// The vehicle's speed in units per frame.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    /// The next intersection on the vehicle's path.
    pub fn target(&self) -> Option<IntersectionId> {
        self.target
    }

    pub fn is_broken_down(&self) -> bool {
        self.broken_down
    }

    pub fn mission(&self) -> Option<Mission> {
        self.mission
    }

    /// Whether the vehicle may run red lights.
    pub fn ignores_signals(&self) -> bool {
        match self.class {
            VehicleClass::Police => matches!(self.mission, Some(Mission::Response { .. })),
            VehicleClass::Car | VehicleClass::Auto | VehicleClass::Bus => false,
        }
    }

    /// The intersection a responding vehicle is steering towards.
    pub(crate) fn response_target(&self) -> Option<IntersectionId> {
        match (self.class, self.mission) {
            (VehicleClass::Police, Some(Mission::Response { target, .. })) => Some(target),
            _ => None,
        }
    }

    pub(crate) fn set_mission(&mut self, mission: Mission) {
        if self.class == VehicleClass::Police {
            self.mission = Some(mission);
        }
    }

    /// Disables the vehicle where it stands.
    pub(crate) fn break_down(&mut self) {
        self.broken_down = true;
        self.speed = 0.0;
        self.state = MotionState::Stopped;
    }

    /// Applies the result of a kinematics update.
    pub(crate) fn apply_motion(&mut self, motion: Motion) {
        self.pos = motion.pos;
        self.speed = motion.speed;
        self.state = motion.state;
    }

    /// Applies the result of an arrival at an intersection.
    pub(crate) fn apply_arrival(&mut self, arrival: Arrival) {
        match arrival {
            Arrival::Depart {
                heading,
                pos,
                target,
            } => {
                self.heading = heading;
                self.pos = pos;
                self.target = target;
                self.state = MotionState::Accelerating;
            }
            Arrival::Stall { pos } => {
                self.pos = pos;
                self.speed = 0.0;
                self.state = MotionState::Stopped;
            }
        }
    }
}
