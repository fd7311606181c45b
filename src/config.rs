use crate::error::{positive, BuildError, BuildResult};
use crate::network::NetworkAttributes;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kinematic attributes shared by every vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KinematicAttributes {
    /// The speed ceiling, in units per frame.
    pub max_speed: f64,
    /// The speed gained per frame when unobstructed.
    pub acceleration: f64,
    /// The speed shed per frame when stopping.
    pub deceleration: f64,
    /// The distance ahead in which a vehicle in the same lane causes a stop.
    pub lookahead: f64,
    /// The length and width of a car; other classes are scaled from this.
    pub base_size: f64,
}

impl Default for KinematicAttributes {
    fn default() -> Self {
        Self {
            max_speed: 4.0,
            acceleration: 0.15,
            deceleration: 0.25,
            lookahead: 40.0,
            base_size: 14.0,
        }
    }
}

/// The configuration of a [Simulation](crate::Simulation).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    /// The road network to build.
    pub network: NetworkAttributes,
    /// Vehicle kinematics.
    pub kinematics: KinematicAttributes,
    /// The initial green duration of every intersection, in frames.
    pub green_time: u32,
    /// The yellow duration, in frames.
    pub yellow_time: u32,
    /// A spawn is attempted once every this many frames.
    pub spawn_interval: u32,
    /// No vehicles are spawned while this many are live.
    pub max_vehicles: usize,
    /// No police vehicles are spawned while this many are live.
    pub max_police: usize,
    /// A breakdown is considered once every this many frames.
    pub breakdown_interval: u32,
    /// The chance that a considered breakdown happens.
    pub breakdown_probability: f64,
    /// Breakdowns only happen while more than this many vehicles are live.
    pub breakdown_min_population: usize,
    /// Patrolling police pick a new patrol point once every this many frames...
    pub patrol_interval: u32,
    /// ...with this probability.
    pub patrol_probability: f64,
    /// Vehicles this far beyond the grid's edge are removed.
    pub boundary_margin: f64,
    /// Vehicles within this distance of their target intersection count
    /// towards its queue, in multiples of the road width.
    pub queue_radius: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            network: Default::default(),
            kinematics: Default::default(),
            green_time: 150,
            yellow_time: 60,
            spawn_interval: 30,
            max_vehicles: 100,
            max_police: 2,
            breakdown_interval: 300,
            breakdown_probability: 0.1,
            breakdown_min_population: 10,
            patrol_interval: 300,
            patrol_probability: 0.2,
            boundary_margin: 50.0,
            queue_radius: 1.5,
        }
    }
}

impl SimulationConfig {
    /// Checks the parts of the configuration the network builder doesn't.
    pub(crate) fn validate(&self) -> BuildResult<()> {
        let k = &self.kinematics;
        positive("max speed", k.max_speed)?;
        positive("acceleration", k.acceleration)?;
        positive("deceleration", k.deceleration)?;
        positive("look-ahead", k.lookahead)?;
        positive("base vehicle size", k.base_size)?;
        positive("queue radius", self.queue_radius)?;
        if !(self.boundary_margin >= 0.0) {
            return Err(BuildError::NonPositive {
                what: "boundary margin",
                got: self.boundary_margin,
            });
        }
        for (what, frames) in [
            ("green time", self.green_time),
            ("yellow time", self.yellow_time),
            ("spawn interval", self.spawn_interval),
            ("breakdown interval", self.breakdown_interval),
            ("patrol interval", self.patrol_interval),
        ] {
            if frames == 0 {
                return Err(BuildError::ZeroInterval { what });
            }
        }
        for (what, p) in [
            ("breakdown probability", self.breakdown_probability),
            ("patrol probability", self.patrol_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(BuildError::NotAProbability { what, got: p });
            }
        }
        Ok(())
    }
}
