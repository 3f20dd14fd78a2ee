use crate::error::ConfigError;
use crate::grid::CellPos;
use serde::{Deserialize, Serialize};

/// Largest grid accepted from configuration
pub const MAX_GRID_CELLS: usize = 10_000;

/// Pointer tool for the pathfinding grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Tool {
    /// Paint or erase walls
    #[default]
    Wall,
    /// Relocate the start marker
    MoveStart,
    /// Relocate the end marker
    MoveEnd,
}

impl Tool {
    pub fn name(&self) -> &str {
        match self {
            Tool::Wall => "Wall",
            Tool::MoveStart => "Start",
            Tool::MoveEnd => "End",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Tool::Wall => Tool::MoveStart,
            Tool::MoveStart => Tool::MoveEnd,
            Tool::MoveEnd => Tool::Wall,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            Tool::Wall => Tool::MoveEnd,
            Tool::MoveStart => Tool::Wall,
            Tool::MoveEnd => Tool::MoveStart,
        }
    }
}

/// Which widget fills the canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum View {
    #[default]
    Pathfinder,
    Tuner,
}

impl View {
    pub fn name(&self) -> &str {
        match self {
            View::Pathfinder => "Pathfinder",
            View::Tuner => "PID Tuner",
        }
    }
}

/// Grid dimensions and initial endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub rows: usize,
    pub cols: usize,
    pub start: CellPos,
    pub end: CellPos,
    /// Probability that a scattered cell becomes a wall (0.0-0.6)
    pub wall_density: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            rows: 15,
            cols: 25,
            start: CellPos::new(7, 4),
            end: CellPos::new(7, 20),
            wall_density: 0.25,
        }
    }
}

impl GridSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows < 2 || self.cols < 2 {
            return Err(ConfigError::GridTooSmall {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.rows.saturating_mul(self.cols) > MAX_GRID_CELLS {
            return Err(ConfigError::GridTooLarge {
                rows: self.rows,
                cols: self.cols,
                max: MAX_GRID_CELLS,
            });
        }
        for (which, pos) in [("Start", self.start), ("End", self.end)] {
            if pos.row >= self.rows || pos.col >= self.cols {
                return Err(ConfigError::EndpointOutOfBounds {
                    which,
                    row: pos.row,
                    col: pos.col,
                });
            }
        }
        if self.start == self.end {
            return Err(ConfigError::EndpointsOverlap {
                row: self.start.row,
                col: self.start.col,
            });
        }
        Ok(())
    }

    /// Adjust wall density within bounds
    pub fn adjust_wall_density(&mut self, delta: f64) {
        self.wall_density = (self.wall_density + delta).clamp(0.0, 0.6);
    }
}

/// Constants of the hover physics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsSettings {
    /// Fixed timestep per simulation step
    pub dt: f64,
    /// Constant downward force
    pub gravity: f64,
    pub mass: f64,
    /// Fraction of velocity kept each step (air resistance)
    pub damping: f64,
    /// Fraction of velocity kept (reversed) on hitting floor or ceiling
    pub restitution: f64,
    /// Velocity removed by a disturbance
    pub disturbance_impulse: f64,
    /// Anti-windup clamp on the integral accumulator
    pub integral_limit: f64,
    pub min_position: f64,
    pub max_position: f64,
    /// Number of samples kept for the plot
    pub history_capacity: usize,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            dt: 0.1,
            gravity: 0.5,
            mass: 1.0,
            damping: 0.98,
            restitution: 0.5,
            disturbance_impulse: 10.0,
            integral_limit: 50.0,
            min_position: 0.0,
            max_position: 100.0,
            history_capacity: 100,
        }
    }
}

impl PhysicsSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dt == 0.0 {
            return Err(ConfigError::ZeroTimestep);
        }
        if !self.dt.is_finite() || self.dt < 0.0 {
            return Err(ConfigError::InvalidTimestep(self.dt));
        }
        if !(self.mass > 0.0) {
            return Err(ConfigError::NonPositiveMass(self.mass));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(ConfigError::DampingOutOfRange(self.damping));
        }
        if !(0.0..1.0).contains(&self.restitution) {
            return Err(ConfigError::RestitutionOutOfRange(self.restitution));
        }
        if !(self.integral_limit >= 0.0) {
            return Err(ConfigError::NegativeIntegralLimit(self.integral_limit));
        }
        if !(self.min_position < self.max_position) {
            return Err(ConfigError::InvalidBounds {
                min: self.min_position,
                max: self.max_position,
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::EmptyHistory);
        }
        Ok(())
    }
}

/// Controller gains and setpoint as exposed by the tuner sliders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerSettings {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub target: f64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            kp: 0.5,
            ki: 0.0,
            kd: 0.0,
            target: 50.0,
        }
    }
}

impl ControllerSettings {
    pub const KP_RANGE: (f64, f64) = (0.0, 2.0);
    pub const KI_RANGE: (f64, f64) = (0.0, 0.1);
    pub const KD_RANGE: (f64, f64) = (0.0, 5.0);
    pub const TARGET_RANGE: (f64, f64) = (10.0, 90.0);

    /// Clamp every field into its slider range
    pub fn clamped(self) -> Self {
        Self {
            kp: self.kp.clamp(Self::KP_RANGE.0, Self::KP_RANGE.1),
            ki: self.ki.clamp(Self::KI_RANGE.0, Self::KI_RANGE.1),
            kd: self.kd.clamp(Self::KD_RANGE.0, Self::KD_RANGE.1),
            target: self.target.clamp(Self::TARGET_RANGE.0, Self::TARGET_RANGE.1),
        }
    }

    pub fn adjust_kp(&mut self, delta: f64) {
        self.kp = (self.kp + delta).clamp(Self::KP_RANGE.0, Self::KP_RANGE.1);
    }

    pub fn adjust_ki(&mut self, delta: f64) {
        self.ki = (self.ki + delta).clamp(Self::KI_RANGE.0, Self::KI_RANGE.1);
    }

    pub fn adjust_kd(&mut self, delta: f64) {
        self.kd = (self.kd + delta).clamp(Self::KD_RANGE.0, Self::KD_RANGE.1);
    }

    pub fn adjust_target(&mut self, delta: f64) {
        self.target = (self.target + delta).clamp(Self::TARGET_RANGE.0, Self::TARGET_RANGE.1);
    }
}

/// Pacing used by the terminal front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Delay between settled-cell frames
    pub visit_frame_ms: u64,
    /// Delay between path-reveal frames
    pub path_frame_ms: u64,
    /// Simulation steps per rendered frame (1-20)
    pub sim_steps_per_frame: usize,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            visit_frame_ms: 10,
            path_frame_ms: 30,
            sim_steps_per_frame: 1,
        }
    }
}

impl AnimationSettings {
    pub fn adjust_sim_steps(&mut self, delta: i32) {
        self.sim_steps_per_frame = (self.sim_steps_per_frame as i32 + delta).clamp(1, 20) as usize;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_cycle() {
        let tool = Tool::default();
        assert_eq!(tool, Tool::Wall);
        assert_eq!(tool.next().next().next(), Tool::Wall);
        assert_eq!(tool.prev(), Tool::MoveEnd);
        assert_eq!(tool.next().prev(), tool);
    }

    #[test]
    fn test_default_grid_is_valid() {
        assert!(GridSettings::default().validate().is_ok());
    }

    #[test]
    fn test_grid_validation_errors() {
        let small = GridSettings {
            rows: 1,
            ..Default::default()
        };
        assert!(matches!(small.validate(), Err(ConfigError::GridTooSmall { .. })));

        let huge = GridSettings {
            rows: 200,
            cols: 200,
            ..Default::default()
        };
        assert!(matches!(huge.validate(), Err(ConfigError::GridTooLarge { .. })));

        let outside = GridSettings {
            end: CellPos::new(7, 25),
            ..Default::default()
        };
        assert!(matches!(
            outside.validate(),
            Err(ConfigError::EndpointOutOfBounds { which: "End", .. })
        ));

        let overlap = GridSettings {
            end: CellPos::new(7, 4),
            ..Default::default()
        };
        assert!(matches!(overlap.validate(), Err(ConfigError::EndpointsOverlap { .. })));
    }

    #[test]
    fn test_zero_timestep_rejected() {
        let physics = PhysicsSettings {
            dt: 0.0,
            ..Default::default()
        };
        assert!(matches!(physics.validate(), Err(ConfigError::ZeroTimestep)));

        let negative = PhysicsSettings {
            dt: -0.1,
            ..Default::default()
        };
        assert!(matches!(negative.validate(), Err(ConfigError::InvalidTimestep(_))));

        let nan = PhysicsSettings {
            dt: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(nan.validate(), Err(ConfigError::InvalidTimestep(_))));
    }

    #[test]
    fn test_physics_validation_errors() {
        assert!(PhysicsSettings::default().validate().is_ok());

        let cases = [
            PhysicsSettings { mass: 0.0, ..Default::default() },
            PhysicsSettings { damping: 1.5, ..Default::default() },
            PhysicsSettings { restitution: 1.0, ..Default::default() },
            PhysicsSettings { integral_limit: -1.0, ..Default::default() },
            PhysicsSettings { min_position: 100.0, ..Default::default() },
            PhysicsSettings { history_capacity: 0, ..Default::default() },
        ];
        for case in cases {
            assert!(case.validate().is_err(), "{:?} should be rejected", case);
        }
    }

    #[test]
    fn test_controller_adjust_clamps() {
        let mut c = ControllerSettings::default();
        c.adjust_kp(10.0);
        assert_eq!(c.kp, 2.0);
        c.adjust_ki(-1.0);
        assert_eq!(c.ki, 0.0);
        c.adjust_kd(0.5);
        assert_eq!(c.kd, 0.5);
        c.adjust_target(100.0);
        assert_eq!(c.target, 90.0);

        let wild = ControllerSettings {
            kp: -3.0,
            ki: 4.0,
            kd: 9.0,
            target: 0.0,
        }
        .clamped();
        assert_eq!(wild.kp, 0.0);
        assert_eq!(wild.ki, 0.1);
        assert_eq!(wild.kd, 5.0);
        assert_eq!(wild.target, 10.0);
    }

    #[test]
    fn test_sim_steps_bounds() {
        let mut a = AnimationSettings::default();
        a.adjust_sim_steps(-5);
        assert_eq!(a.sim_steps_per_frame, 1);
        a.adjust_sim_steps(100);
        assert_eq!(a.sim_steps_per_frame, 20);
    }
}
