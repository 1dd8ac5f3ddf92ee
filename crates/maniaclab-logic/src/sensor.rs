//! Threshold triggers and measurement sensors.

use maniaclab_core::{ObjectId, SimFloat};
use maniaclab_sim::LabCell;

use crate::level::Level;

/// Callback fired by a [`Trigger`].
pub type SensorFunc = Box<dyn FnMut()>;

/// Converts a stream of measurements into rising-edge, falling-edge,
/// and firing events against a `[low, high]` window.
///
/// A NaN threshold disables that side of the window; with both
/// thresholds NaN the trigger is always active. `inverted` flips the
/// window.
pub struct Trigger {
    /// Whether the active condition is inverted.
    pub inverted: bool,
    /// Values below this deactivate the trigger; NaN disables.
    pub low_threshold: SimFloat,
    /// Values above this deactivate the trigger; NaN disables.
    pub high_threshold: SimFloat,
    /// Called once when the trigger becomes active.
    pub rising_edge: Option<SensorFunc>,
    /// Called once when the trigger becomes inactive.
    pub falling_edge: Option<SensorFunc>,
    /// Called on every update while active.
    pub firing: Option<SensorFunc>,
    is_firing: bool,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            inverted: false,
            low_threshold: SimFloat::NAN,
            high_threshold: SimFloat::NAN,
            rising_edge: None,
            falling_edge: None,
            firing: None,
            is_firing: false,
        }
    }
}

impl Trigger {
    /// A trigger with both thresholds disabled and no callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the trigger was active after the last update.
    pub fn is_firing(&self) -> bool {
        self.is_firing
    }

    /// Feed one measurement through the trigger.
    pub fn update(&mut self, value: SimFloat) {
        let raw_now_firing = !(self.low_threshold > value) && !(self.high_threshold < value);
        let now_firing = if self.inverted {
            !raw_now_firing
        } else {
            raw_now_firing
        };

        if now_firing && !self.is_firing {
            if let Some(callback) = self.rising_edge.as_mut() {
                callback();
            }
        } else if !now_firing && self.is_firing {
            if let Some(callback) = self.falling_edge.as_mut() {
                callback();
            }
        }
        if now_firing {
            if let Some(callback) = self.firing.as_mut() {
                callback();
            }
        }
        self.is_firing = now_firing;
    }
}

/// Anything updated once per tick against the level state.
pub trait Sensor {
    /// Take a measurement and dispatch events.
    fn update(&mut self, level: &Level);
}

/// Per-cell measurement function of a [`MeasurementSensor`].
pub type MeasurementFunc = Box<dyn Fn(&LabCell) -> SimFloat>;

/// Averages a per-cell quantity over an object's footprint and runs
/// the result through a set of triggers.
pub struct MeasurementSensor {
    object: ObjectId,
    func: MeasurementFunc,
    triggers: Vec<Trigger>,
}

impl MeasurementSensor {
    /// Bind a sensor to an object and a measurement function.
    pub fn new(object: ObjectId, func: MeasurementFunc) -> Self {
        Self {
            object,
            func,
            triggers: Vec::new(),
        }
    }

    /// Add a trigger; returns its index for later removal.
    pub fn new_trigger(&mut self, trigger: Trigger) -> usize {
        self.triggers.push(trigger);
        self.triggers.len() - 1
    }

    /// Mutable access to a trigger by index.
    pub fn trigger_mut(&mut self, index: usize) -> Option<&mut Trigger> {
        self.triggers.get_mut(index)
    }

    /// Remove a trigger by index.
    pub fn remove_trigger(&mut self, index: usize) {
        if index < self.triggers.len() {
            self.triggers.remove(index);
        }
    }

    /// Take the current measurement. NaN when the bound object is gone
    /// or nothing could be sampled.
    pub fn measure(&self, level: &Level) -> SimFloat {
        level.measure_object_avg(self.object, &self.func)
    }
}

impl Sensor for MeasurementSensor {
    fn update(&mut self, level: &Level) {
        let value = self.measure(level);
        for trigger in &mut self.triggers {
            trigger.update(value);
        }
    }
}
