use crate::heading::Axis;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The traffic signals of a single intersection.
///
/// The north-south and east-west approaches alternate: one approach runs
/// green then yellow while the other is held at red, then they swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrafficLight {
    /// The state of the north-south approach.
    ns: LightState,
    /// The state of the east-west approach.
    ew: LightState,
    /// Frames remaining in the current state.
    timer: u32,
    /// The duration of the green phase in frames.
    green_time: u32,
    /// The duration of the yellow phase in frames.
    yellow_time: u32,
    /// A manual override, which takes precedence over the timed cycle.
    override_state: Option<SignalOverride>,
}

/// The state of one approach's signal.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LightState {
    Red,
    Yellow,
    Green,
}

/// A manual override of an intersection's signals.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SignalOverride {
    /// Hold north-south at green and east-west at red.
    NsGreen,
    /// Hold east-west at green and north-south at red.
    EwGreen,
    /// Hold both approaches at red.
    AllRed,
}

impl TrafficLight {
    /// Creates a light which starts with north-south green for a full green phase.
    pub fn new(green_time: u32, yellow_time: u32) -> Self {
        let green_time = green_time.max(1);
        Self {
            ns: LightState::Green,
            ew: LightState::Red,
            timer: green_time,
            green_time,
            yellow_time: yellow_time.max(1),
            override_state: None,
        }
    }

    /// The state of the signal facing traffic on the given axis.
    pub fn state(&self, axis: Axis) -> LightState {
        match axis {
            Axis::NorthSouth => self.ns,
            Axis::EastWest => self.ew,
        }
    }

    /// The states of the (north-south, east-west) approaches.
    pub fn states(&self) -> (LightState, LightState) {
        (self.ns, self.ew)
    }

    /// Frames remaining in the current phase.
    pub fn timer(&self) -> u32 {
        self.timer
    }

    /// The configured green duration in frames.
    pub fn green_time(&self) -> u32 {
        self.green_time
    }

    pub fn override_state(&self) -> Option<SignalOverride> {
        self.override_state
    }

    /// Sets or clears the manual override. Takes effect on the next step.
    pub fn set_override(&mut self, override_state: Option<SignalOverride>) {
        self.override_state = override_state;
    }

    /// Sets the green duration used from the next green phase onwards.
    pub fn set_green_time(&mut self, frames: u32) {
        self.green_time = frames.max(1);
    }

    /// Returns the light as it will be one frame from now.
    pub fn advanced(&self) -> Self {
        use LightState::*;

        if let Some(forced) = self.override_state {
            let (ns, ew) = match forced {
                SignalOverride::NsGreen => (Green, Red),
                SignalOverride::EwGreen => (Red, Green),
                SignalOverride::AllRed => (Red, Red),
            };
            return Self { ns, ew, ..*self };
        }

        // Left all-red by an override; restart the cycle.
        if (self.ns, self.ew) == (Red, Red) {
            return Self {
                ns: Green,
                ew: Red,
                timer: self.green_time,
                ..*self
            };
        }

        let timer = self.timer.saturating_sub(1);
        if timer > 0 {
            return Self { timer, ..*self };
        }

        let (ns, ew, timer) = match (self.ns, self.ew) {
            (Green, _) => (Yellow, Red, self.yellow_time),
            (Yellow, _) => (Red, Green, self.green_time),
            (_, Green) => (Red, Yellow, self.yellow_time),
            (_, Yellow) | (Red, Red) => (Green, Red, self.green_time),
        };
        Self {
            ns,
            ew,
            timer,
            ..*self
        }
    }

    /// Advances the light by one frame.
    pub fn step(&mut self) {
        *self = self.advanced();
    }

    /// Returns true if at most one approach is showing anything other than red.
    pub fn is_consistent(&self) -> bool {
        self.ns == LightState::Red || self.ew == LightState::Red
    }
}
