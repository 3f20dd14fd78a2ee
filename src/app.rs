use crate::config::AppConfig;
use crate::error::ConfigError;
use crate::grid::CellPos;
use crate::pathfinder::GridSearchEngine;
use crate::pid::PidSimulation;
use crate::presets::{PresetManager, TuningPreset};
use crate::search::SearchEvent;
use crate::settings::{AnimationSettings, ControllerSettings, GridSettings, Tool, View};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tracing::{info, warn};

/// Focus state for parameter editing in the sidebar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    // Pathfinder
    Tool,
    Density,
    // Tuner
    Kp,
    Ki,
    Kd,
    Target,
    Speed,
    // Controls box (not a param)
    Controls,
}

impl Focus {
    fn params(view: View) -> &'static [Focus] {
        match view {
            View::Pathfinder => &[Focus::Tool, Focus::Density],
            View::Tuner => &[Focus::Kp, Focus::Ki, Focus::Kd, Focus::Target, Focus::Speed],
        }
    }

    /// Tab cycles through the parameters of the current view
    pub fn next(&self, view: View) -> Focus {
        let params = Self::params(view);
        match params.iter().position(|f| f == self) {
            Some(i) => params[(i + 1) % params.len()],
            None => params[0],
        }
    }

    /// Shift+Tab cycles backwards
    pub fn prev(&self, view: View) -> Focus {
        let params = Self::params(view);
        match params.iter().position(|f| f == self) {
            Some(0) | None => params[params.len() - 1],
            Some(i) => params[i - 1],
        }
    }

    /// Line index in the parameters box
    pub fn line_index(&self) -> u16 {
        match self {
            Focus::None | Focus::Controls => 0,
            Focus::Tool | Focus::Kp => 0,
            Focus::Density | Focus::Ki => 1,
            Focus::Kd => 2,
            Focus::Target => 3,
            Focus::Speed => 4,
        }
    }

    /// Check if focus is on a parameter (not Controls or None)
    pub fn is_param(&self) -> bool {
        !matches!(self, Focus::None | Focus::Controls)
    }
}

/// Main application state
pub struct App {
    pub view: View,
    pub pathfinder: GridSearchEngine,
    pub tuner: PidSimulation,
    pub controller: ControllerSettings,
    pub grid_settings: GridSettings,
    pub animation: AnimationSettings,
    pub presets: PresetManager,
    pub preset_index: Option<usize>,
    pub cursor: CellPos,
    pub focus: Focus,
    pub fullscreen_mode: bool,
    pub paused: bool,
    pub show_help: bool,
    pub help_scroll: u16,
    pub controls_scroll: u16,
    pub status: Option<String>,
    anim_clock: Duration,
    last_drag: Option<CellPos>,
    rng: StdRng,
}

impl App {
    pub fn new(config: &AppConfig, presets: PresetManager, seed: Option<u64>) -> Result<Self, ConfigError> {
        config.validate()?;
        let controller = config.controller.clamped();
        let tuner = PidSimulation::new(config.physics.clone(), controller)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            view: View::default(),
            pathfinder: GridSearchEngine::new(&config.grid),
            tuner,
            controller,
            grid_settings: config.grid.clone(),
            animation: config.animation.clone(),
            presets,
            preset_index: None,
            cursor: config.grid.start,
            focus: Focus::Controls,
            fullscreen_mode: false,
            paused: false,
            show_help: false,
            help_scroll: 0,
            controls_scroll: 0,
            status: None,
            anim_clock: Duration::ZERO,
            last_drag: None,
            rng,
        })
    }

    /// Advance both widgets by one rendered frame
    pub fn tick(&mut self, elapsed: Duration) {
        self.advance_search(elapsed);
        if !self.paused {
            for _ in 0..self.animation.sim_steps_per_frame {
                self.tuner.step();
            }
        }
    }

    /// Play as many search frames as the elapsed time pays for
    fn advance_search(&mut self, elapsed: Duration) {
        if !self.pathfinder.is_running() {
            self.anim_clock = Duration::ZERO;
            return;
        }
        self.anim_clock += elapsed;
        while let Some(next) = self.pathfinder.peek() {
            let cost = Duration::from_millis(match next {
                SearchEvent::Settled { .. } => self.animation.visit_frame_ms,
                SearchEvent::PathRevealed { .. } => self.animation.path_frame_ms,
            });
            if self.anim_clock < cost {
                break;
            }
            self.anim_clock -= cost;
            self.pathfinder.advance();
        }
    }

    // === View / focus ===

    pub fn set_view(&mut self, view: View) {
        if self.view != view {
            self.view = view;
            self.focus = Focus::Controls;
            self.controls_scroll = 0;
            self.pathfinder.release_pointer();
        }
    }

    pub fn next_focus(&mut self) {
        self.focus = self.focus.next(self.view);
    }

    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev(self.view);
    }

    pub fn adjust_focused_up(&mut self) {
        self.adjust_focused(1.0);
    }

    pub fn adjust_focused_down(&mut self) {
        self.adjust_focused(-1.0);
    }

    fn adjust_focused(&mut self, sign: f64) {
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::Tool => {
                let tool = if sign > 0.0 {
                    self.pathfinder.tool().next()
                } else {
                    self.pathfinder.tool().prev()
                };
                self.pathfinder.set_tool(tool);
            }
            Focus::Density => self.grid_settings.adjust_wall_density(0.05 * sign),
            Focus::Kp => self.adjust_controller(|c| c.adjust_kp(0.01 * sign)),
            Focus::Ki => self.adjust_controller(|c| c.adjust_ki(0.001 * sign)),
            Focus::Kd => self.adjust_controller(|c| c.adjust_kd(0.01 * sign)),
            Focus::Target => self.adjust_controller(|c| c.adjust_target(sign)),
            Focus::Speed => self.animation.adjust_sim_steps(sign as i32),
        }
    }

    fn adjust_controller(&mut self, f: impl FnOnce(&mut ControllerSettings)) {
        f(&mut self.controller);
        self.preset_index = None;
        self.push_controller();
    }

    fn push_controller(&mut self) {
        let c = self.controller;
        self.tuner.set_gains(c.kp, c.ki, c.kd);
        self.tuner.set_target(c.target);
    }

    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0;
        }
    }

    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    pub fn scroll_controls_up(&mut self) {
        self.controls_scroll = self.controls_scroll.saturating_sub(1);
    }

    pub fn scroll_controls_down(&mut self, max_scroll: u16) {
        self.controls_scroll = (self.controls_scroll + 1).min(max_scroll);
    }

    // === Pathfinder ===

    pub fn set_tool(&mut self, tool: Tool) {
        self.pathfinder.set_tool(tool);
        self.focus = Focus::Tool;
    }

    pub fn move_cursor(&mut self, d_row: isize, d_col: isize) {
        let grid = self.pathfinder.grid();
        let row = self.cursor.row.saturating_add_signed(d_row).min(grid.rows() - 1);
        let col = self.cursor.col.saturating_add_signed(d_col).min(grid.cols() - 1);
        self.cursor = CellPos::new(row, col);
    }

    /// Keyboard equivalent of a click at the cursor
    pub fn click_cursor(&mut self) {
        self.pathfinder.apply_pointer_down(self.cursor);
        self.pathfinder.release_pointer();
    }

    pub fn pointer_down(&mut self, pos: CellPos) {
        self.cursor = pos;
        self.last_drag = Some(pos);
        self.pathfinder.apply_pointer_down(pos);
    }

    /// Drag events fire per mouse move; only entering a new cell counts
    pub fn pointer_drag(&mut self, pos: CellPos) {
        if self.last_drag == Some(pos) {
            return;
        }
        self.last_drag = Some(pos);
        self.cursor = pos;
        self.pathfinder.apply_pointer_enter(pos);
    }

    pub fn pointer_up(&mut self) {
        self.last_drag = None;
        self.pathfinder.release_pointer();
    }

    pub fn run_search(&mut self) {
        self.anim_clock = Duration::ZERO;
        self.pathfinder.run_search();
    }

    /// Skip the rest of the animation
    pub fn finish_search(&mut self) {
        self.pathfinder.finish();
    }

    pub fn reset_grid(&mut self) {
        self.pathfinder.reset_grid();
        self.status = None;
    }

    pub fn scatter_walls(&mut self) {
        let placed = self
            .pathfinder
            .scatter_walls(&mut self.rng, self.grid_settings.wall_density);
        if placed > 0 {
            self.status = Some(format!("{} walls placed", placed));
        }
    }

    // === Tuner ===

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    pub fn reset_tuner(&mut self) {
        self.tuner.reset();
    }

    pub fn disturb(&mut self) {
        self.tuner.apply_disturbance();
    }

    pub fn increase_speed(&mut self) {
        self.animation.adjust_sim_steps(1);
    }

    pub fn decrease_speed(&mut self) {
        self.animation.adjust_sim_steps(-1);
    }

    /// Apply the next preset's gains, keeping the current setpoint
    pub fn cycle_preset(&mut self) {
        let next = self.preset_index.map_or(0, |i| (i + 1) % self.presets.len().max(1));
        if let Some(preset) = self.presets.get_wrapped(next).cloned() {
            self.apply_preset(&preset);
            self.preset_index = Some(next);
        }
    }

    pub fn apply_preset(&mut self, preset: &TuningPreset) {
        let target = self.controller.target;
        self.controller = ControllerSettings {
            target,
            ..preset.controller
        }
        .clamped();
        self.push_controller();
        self.status = Some(format!("Preset: {}", preset.name));
        info!(preset = %preset.name, "preset applied");
    }

    /// Store the current gains as a user preset
    pub fn save_current_preset(&mut self) {
        let c = self.controller;
        let name = format!("Custom {:.2}-{:.3}-{:.2}", c.kp, c.ki, c.kd);
        let preset = TuningPreset {
            name: name.clone(),
            description: "Saved from the tuner".to_string(),
            controller: c,
        };
        self.status = Some(match self.presets.save_preset(preset) {
            Ok(_) => format!("Saved {}", name),
            Err(err) => {
                warn!(%err, "saving preset failed");
                format!("Save failed: {}", err)
            }
        });
    }

    /// Remove the selected preset if it is a saved one; built-ins stay
    pub fn delete_current_preset(&mut self) {
        let Some(name) = self
            .preset_index
            .filter(|&i| i % self.presets.len().max(1) >= self.presets.builtin.len())
            .and_then(|i| self.presets.get_wrapped(i))
            .map(|p| p.name.clone())
        else {
            self.status = Some("Only saved presets can be deleted".to_string());
            return;
        };
        self.status = Some(match self.presets.delete_preset(&name) {
            Ok(()) => {
                info!(preset = %name, "preset deleted");
                self.preset_index = None;
                format!("Deleted {}", name)
            }
            Err(err) => {
                warn!(%err, "deleting preset failed");
                format!("Delete failed: {}", err)
            }
        });
    }

    pub fn current_preset_name(&self) -> Option<&str> {
        self.preset_index
            .and_then(|i| self.presets.get_wrapped(i))
            .map(|p| p.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellRole;
    use tempfile::TempDir;

    fn app() -> App {
        App::new(&AppConfig::default(), PresetManager::with_dir(None), Some(1)).unwrap()
    }

    #[test]
    fn test_focus_cycles_within_view() {
        let f = Focus::Controls;
        assert_eq!(f.next(View::Pathfinder), Focus::Tool);
        assert_eq!(Focus::Density.next(View::Pathfinder), Focus::Tool);
        assert_eq!(f.prev(View::Tuner), Focus::Speed);
        assert_eq!(Focus::Kp.prev(View::Tuner), Focus::Speed);
        assert_eq!(Focus::Kd.next(View::Tuner), Focus::Target);
        assert!(!Focus::Controls.is_param());
    }

    #[test]
    fn test_tick_paces_search_by_frame_cost() {
        let mut app = app();
        app.run_search();
        assert!(app.pathfinder.is_running());
        let queued = app.pathfinder.pending_frames();

        // One visit frame costs 10ms
        app.tick(Duration::from_millis(10));
        assert_eq!(app.pathfinder.pending_frames(), queued - 1);
        app.tick(Duration::from_millis(5));
        assert_eq!(app.pathfinder.pending_frames(), queued - 1);
        app.tick(Duration::from_millis(25));
        assert_eq!(app.pathfinder.pending_frames(), queued - 4);

        app.tick(Duration::from_secs(60));
        assert!(!app.pathfinder.is_running());
        assert_eq!(app.pathfinder.path_length(), 16);
    }

    #[test]
    fn test_tick_steps_tuner_unless_paused() {
        let mut app = app();
        app.animation.sim_steps_per_frame = 3;
        app.tick(Duration::from_millis(16));
        assert_eq!(app.tuner.steps(), 3);

        app.toggle_pause();
        app.tick(Duration::from_millis(16));
        assert_eq!(app.tuner.steps(), 3);
    }

    #[test]
    fn test_focused_adjust_pushes_gains() {
        let mut app = app();
        app.set_view(View::Tuner);
        app.focus = Focus::Kd;
        for _ in 0..10 {
            app.adjust_focused_up();
        }
        assert!((app.tuner.gains().kd - 0.1).abs() < 1e-9);

        app.focus = Focus::Target;
        app.adjust_focused_down();
        assert_eq!(app.tuner.target(), 49.0);
    }

    #[test]
    fn test_drag_only_toggles_new_cells() {
        let mut app = app();
        let a = CellPos::new(0, 0);
        let b = CellPos::new(0, 1);
        app.pointer_down(a);
        app.pointer_drag(a);
        app.pointer_drag(a);
        app.pointer_drag(b);
        app.pointer_up();

        let grid = app.pathfinder.grid();
        assert_eq!(grid.role(a), Some(CellRole::Wall));
        assert_eq!(grid.role(b), Some(CellRole::Wall));
    }

    #[test]
    fn test_cursor_stays_on_grid() {
        let mut app = app();
        app.move_cursor(-100, -100);
        assert_eq!(app.cursor, CellPos::new(0, 0));
        app.move_cursor(100, 100);
        assert_eq!(app.cursor, CellPos::new(14, 24));
    }

    #[test]
    fn test_cycle_preset_keeps_target() {
        let mut app = app();
        app.controller.target = 70.0;
        app.cycle_preset();
        assert_eq!(app.current_preset_name(), Some("P only"));
        app.cycle_preset();
        assert_eq!(app.current_preset_name(), Some("PI"));
        assert_eq!(app.tuner.target(), 70.0);
        assert!((app.tuner.gains().ki - 0.03).abs() < 1e-12);
    }

    #[test]
    fn test_save_current_preset() {
        let dir = TempDir::new().unwrap();
        let presets = PresetManager::with_dir(Some(dir.path().to_path_buf()));
        let mut app = App::new(&AppConfig::default(), presets, Some(1)).unwrap();
        app.save_current_preset();
        assert_eq!(app.presets.user.len(), 1);
        assert!(app.status.as_deref().unwrap_or("").starts_with("Saved"));
    }

    #[test]
    fn test_delete_current_preset_only_removes_saved() {
        let dir = TempDir::new().unwrap();
        let presets = PresetManager::with_dir(Some(dir.path().to_path_buf()));
        let mut app = App::new(&AppConfig::default(), presets, Some(1)).unwrap();
        app.save_current_preset();

        // Built-in selected: nothing removed
        app.cycle_preset();
        app.delete_current_preset();
        assert_eq!(app.presets.user.len(), 1);

        // Saved presets follow the six built-ins
        app.preset_index = Some(6);
        app.delete_current_preset();
        assert!(app.presets.user.is_empty());
        assert_eq!(app.preset_index, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AppConfig::default();
        config.physics.dt = 0.0;
        let result = App::new(&config, PresetManager::with_dir(None), None);
        assert!(matches!(result, Err(ConfigError::ZeroTimestep)));
    }
}
