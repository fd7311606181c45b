use super::{MotionState, Vehicle};
use crate::config::KinematicAttributes;
use crate::light::LightState;
use crate::math::{project_local, rot90, Point2d};
use crate::network::RoadNetwork;
use crate::util::Interval;
use crate::VehicleSet;
use cgmath::prelude::*;

/// The kinematic model shared by all vehicles.
#[derive(Clone, Debug)]
pub(crate) struct KinematicModel {
    max_speed: f64,
    acc: f64,
    dec: f64,
    lookahead: f64,
}

/// The outcome of one frame of motion for a single vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Motion {
    pub pos: Point2d,
    pub speed: f64,
    pub state: MotionState,
}

impl KinematicModel {
    pub fn new(attribs: &KinematicAttributes) -> Self {
        Self {
            max_speed: attribs.max_speed,
            acc: attribs.acceleration,
            dec: attribs.deceleration,
            lookahead: attribs.lookahead,
        }
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// The distance a vehicle needs to come to a stop, including its own length.
    pub fn stopping_distance(&self, speed: f64, length: f64) -> f64 {
        speed * speed / (2.0 * self.dec) + length
    }

    /// Whether a vehicle `distance` short of the stop line must stop for the signal.
    ///
    /// Vehicles which have already crossed the stop line carry on through
    /// the intersection.
    pub fn must_stop_for_signal(
        &self,
        speed: f64,
        length: f64,
        distance: f64,
        light: LightState,
    ) -> bool {
        match light {
            LightState::Green => false,
            LightState::Yellow | LightState::Red => {
                distance > 0.0 && distance < self.stopping_distance(speed, length)
            }
        }
    }

    /// Whether a vehicle already braking for a signal must keep braking.
    ///
    /// Once committed to a stop, a vehicle keeps braking until it comes to
    /// rest, unless the light turns green or it overshoots the stop line.
    /// Only applies within the stopping distance from full speed.
    fn is_holding_for_signal(&self, vehicle: &Vehicle, distance: f64, light: LightState) -> bool {
        vehicle.state == MotionState::Stopped
            && vehicle.speed > 0.0
            && light != LightState::Green
            && distance > 0.0
            && distance < self.stopping_distance(self.max_speed, vehicle.length)
    }

    /// Finds the nearest vehicle ahead of `vehicle` in its lane, within the look-ahead window.
    /// Returns the vehicle and the longitudinal gap to its centre.
    pub fn leader<'a>(
        &self,
        vehicle: &Vehicle,
        vehicles: &'a VehicleSet,
    ) -> Option<(&'a Vehicle, f64)> {
        let ahead = vehicle.heading.vector();
        let window = Interval::new(0.0, self.lookahead);
        vehicles
            .values()
            .filter(|other| other.id != vehicle.id)
            .filter_map(|other| {
                let local = project_local(other.pos, vehicle.pos, rot90(ahead), ahead);
                let in_lane = local.x.abs() < vehicle.width;
                (in_lane && window.contains_strict(local.y)).then_some((other, local.y))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Computes the vehicle's motion for the next frame.
    /// All vehicles must be planned against the same snapshot before any motion is applied.
    pub fn plan(&self, vehicle: &Vehicle, vehicles: &VehicleSet, network: &RoadNetwork) -> Motion {
        let stop_for_signal = !vehicle.ignores_signals()
            && vehicle
                .target
                .and_then(|id| network.intersection(id))
                .map_or(false, |intersection| {
                    let line = network.stop_line(intersection.coord(), vehicle.heading);
                    let distance = (line - vehicle.pos).dot(vehicle.heading.vector());
                    let light = intersection.light().state(vehicle.heading.axis());
                    self.must_stop_for_signal(vehicle.speed, vehicle.length, distance, light)
                        || self.is_holding_for_signal(vehicle, distance, light)
                });
        let stop_for_leader = self.leader(vehicle, vehicles).is_some();

        let (speed, state) = if stop_for_signal || stop_for_leader {
            (f64::max(vehicle.speed - self.dec, 0.0), MotionState::Stopped)
        } else {
            let speed = f64::min(vehicle.speed + self.acc, self.max_speed);
            let state = if speed < self.max_speed {
                MotionState::Accelerating
            } else {
                MotionState::Moving
            };
            (speed, state)
        };

        Motion {
            pos: vehicle.pos + vehicle.heading.vector() * speed,
            speed,
            state,
        }
    }
}
