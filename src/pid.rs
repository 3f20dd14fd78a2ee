//! One-dimensional hover simulation driven by a PID controller.

use crate::error::ConfigError;
use crate::settings::{ControllerSettings, PhysicsSettings};
use std::collections::VecDeque;

/// Controller gains, all non-negative
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp: kp.max(0.0),
            ki: ki.max(0.0),
            kd: kd.max(0.0),
        }
    }
}

/// Mutable physical and controller state
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicalState {
    pub position: f64,
    pub velocity: f64,
    pub integral: f64,
    pub previous_error: f64,
}

/// Breakdown of the controller output for one step
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepTelemetry {
    pub error: f64,
    pub proportional: f64,
    pub integral: f64,
    pub derivative: f64,
    pub control_force: f64,
    /// Position hit the floor or ceiling this step
    pub bounced: bool,
}

/// Fixed-capacity FIFO of recent positions
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl HistoryBuffer {
    /// Buffer filled to capacity with `rest`
    pub fn filled(capacity: usize, rest: f64) -> Self {
        let mut samples = VecDeque::with_capacity(capacity);
        samples.extend(std::iter::repeat(rest).take(capacity));
        Self { samples, capacity }
    }

    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Overwrite every sample with `rest`
    pub fn refill(&mut self, rest: f64) {
        self.samples.clear();
        self.samples.extend(std::iter::repeat(rest).take(self.capacity));
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

/// Hover simulation: gravity, damping and bounded travel under PID thrust
#[derive(Debug, Clone)]
pub struct PidSimulation {
    gains: PidGains,
    target: f64,
    state: PhysicalState,
    history: HistoryBuffer,
    physics: PhysicsSettings,
    last: StepTelemetry,
    steps: u64,
}

impl PidSimulation {
    /// Build a simulation at rest. Invalid physics (e.g. a zero timestep) is rejected here.
    pub fn new(physics: PhysicsSettings, controller: ControllerSettings) -> Result<Self, ConfigError> {
        physics.validate()?;
        let rest = physics.min_position;
        let mut sim = Self {
            gains: PidGains::new(controller.kp, controller.ki, controller.kd),
            target: 0.0,
            state: PhysicalState {
                position: rest,
                ..Default::default()
            },
            history: HistoryBuffer::filled(physics.history_capacity, rest),
            physics,
            last: StepTelemetry::default(),
            steps: 0,
        };
        sim.set_target(controller.target);
        Ok(sim)
    }

    /// Advance by exactly one timestep
    pub fn step(&mut self) -> StepTelemetry {
        let p = &self.physics;
        let dt = p.dt;
        let s = &mut self.state;

        let error = self.target - s.position;
        let proportional = self.gains.kp * error;

        s.integral = (s.integral + error * dt).clamp(-p.integral_limit, p.integral_limit);
        let integral = self.gains.ki * s.integral;

        let derivative = self.gains.kd * (error - s.previous_error) / dt;
        let control_force = proportional + integral + derivative;

        let acceleration = (control_force - p.gravity) / p.mass;
        s.velocity = (s.velocity + acceleration * dt) * p.damping;
        s.position += s.velocity * dt;

        let mut bounced = false;
        if s.position < p.min_position {
            s.position = p.min_position;
            s.velocity = -s.velocity * p.restitution;
            bounced = true;
        } else if s.position > p.max_position {
            s.position = p.max_position;
            s.velocity = -s.velocity * p.restitution;
            bounced = true;
        }

        s.previous_error = error;
        self.history.push(s.position);
        self.steps += 1;

        self.last = StepTelemetry {
            error,
            proportional,
            integral,
            derivative,
            control_force,
            bounced,
        };
        self.last
    }

    /// New gains take effect on the next step
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.gains = PidGains::new(kp, ki, kd);
    }

    /// New setpoint, clamped to the travel bounds
    pub fn set_target(&mut self, target: f64) {
        self.target = target.clamp(self.physics.min_position, self.physics.max_position);
    }

    /// Sudden downward push
    pub fn apply_disturbance(&mut self) {
        self.state.velocity -= self.physics.disturbance_impulse;
    }

    /// Back to rest with a flat history
    pub fn reset(&mut self) {
        let rest = self.physics.min_position;
        self.state = PhysicalState {
            position: rest,
            ..Default::default()
        };
        self.history.refill(rest);
        self.last = StepTelemetry::default();
        self.steps = 0;
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn state(&self) -> &PhysicalState {
        &self.state
    }

    pub fn position(&self) -> f64 {
        self.state.position
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn physics(&self) -> &PhysicsSettings {
        &self.physics
    }

    pub fn last_telemetry(&self) -> StepTelemetry {
        self.last
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Resting position of a proportional-only controller, where thrust balances gravity
    pub fn proportional_equilibrium(&self) -> Option<f64> {
        if self.gains.kp > 0.0 {
            Some(self.target - self.physics.gravity / self.gains.kp)
        } else {
            None
        }
    }
}
