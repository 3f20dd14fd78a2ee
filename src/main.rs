mod app;
mod braille;
mod config;
mod error;
mod export;
mod grid;
mod pathfinder;
mod pid;
mod presets;
mod search;
mod settings;
mod ui;

use app::{App, Focus};
use clap::Parser;
use config::AppConfig;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use grid::CellPos;
use pathfinder::GridSearchEngine;
use pid::PidSimulation;
use presets::PresetManager;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use settings::{Tool, View};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "motion-lab")]
#[command(about = "Grid pathfinding visualizer and PID hover tuner in the terminal")]
struct Args {
    /// Load settings from a JSON config file (flags below override it)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// View to open with (pathfinder, tuner)
    #[arg(long, default_value = "pathfinder")]
    view: String,

    // === Grid Parameters ===
    /// Grid rows (2+, rows x cols at most 10000)
    #[arg(long)]
    rows: Option<usize>,

    /// Grid columns
    #[arg(long)]
    cols: Option<usize>,

    /// Start cell as "row,col"
    #[arg(long)]
    start: Option<String>,

    /// End cell as "row,col"
    #[arg(long)]
    end: Option<String>,

    /// Density for random walls (0.0-0.6)
    #[arg(long)]
    walls: Option<f64>,

    /// Scatter random walls before starting
    #[arg(long, default_value = "false")]
    scatter: bool,

    /// RNG seed for reproducible wall scatter
    #[arg(long)]
    seed: Option<u64>,

    // === Controller Parameters ===
    /// Proportional gain (0-2)
    #[arg(long)]
    kp: Option<f64>,

    /// Integral gain (0-0.1)
    #[arg(long)]
    ki: Option<f64>,

    /// Derivative gain (0-5)
    #[arg(long)]
    kd: Option<f64>,

    /// Target altitude (10-90)
    #[arg(long)]
    target: Option<f64>,

    /// Simulation timestep in seconds (> 0)
    #[arg(long)]
    dt: Option<f64>,

    /// Start from a named tuning preset (e.g. "PID", "Aggressive")
    #[arg(long)]
    preset: Option<String>,

    /// Simulation steps per frame (1-20)
    #[arg(long)]
    speed: Option<usize>,

    // === Headless Export ===
    /// Solve the grid and save it as PNG, then exit
    #[arg(long = "export-png")]
    export_png: Option<PathBuf>,

    /// Record the search animation as GIF, then exit
    #[arg(long = "export-gif")]
    export_gif: Option<PathBuf>,

    /// Simulate the hover and plot its history as PNG, then exit
    #[arg(long = "export-history")]
    export_history: Option<PathBuf>,

    /// Simulation steps to run before plotting the history
    #[arg(long, default_value = "300")]
    steps: usize,

    /// Pixel size of one grid cell in image exports (1-64)
    #[arg(long = "cell-px", default_value = "12", value_parser = clap::value_parser!(u32).range(1..=64))]
    cell_px: u32,

    /// Write the effective configuration as JSON, then exit
    #[arg(long = "export-config")]
    export_config: Option<PathBuf>,

    // === Logging ===
    /// Write logs to this file (the terminal is used by the UI)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Log filter (error, warn, info, debug, trace or a RUST_LOG directive)
    #[arg(long = "log-level", default_value = "info")]
    log_level: String,
}

fn parse_view(s: &str) -> View {
    match s.to_lowercase().as_str() {
        "tuner" | "pid" | "drone" => View::Tuner,
        _ => View::Pathfinder,
    }
}

fn parse_cell(s: &str) -> Result<CellPos, String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected \"row,col\", got \"{}\"", s))?;
    let row = row.trim().parse().map_err(|_| format!("invalid row in \"{}\"", s))?;
    let col = col.trim().parse().map_err(|_| format!("invalid column in \"{}\"", s))?;
    Ok(CellPos::new(row, col))
}

fn init_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_new(&args.log_level)?)
        .init();
    Ok(())
}

/// Merge the config file (if any) with CLI overrides
fn build_config(args: &Args, presets: &PresetManager) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default(),
    };

    // Grid settings
    if let Some(rows) = args.rows {
        config.grid.rows = rows;
    }
    if let Some(cols) = args.cols {
        config.grid.cols = cols;
    }
    if let Some(start) = &args.start {
        config.grid.start = parse_cell(start)?;
    }
    if let Some(end) = &args.end {
        config.grid.end = parse_cell(end)?;
    }
    if let Some(walls) = args.walls {
        config.grid.wall_density = 0.0;
        config.grid.adjust_wall_density(walls);
    }

    // Controller settings (preset first, explicit gains win)
    if let Some(name) = &args.preset {
        let preset = presets
            .find(name)
            .ok_or_else(|| format!("unknown preset \"{}\" (have: {})", name, presets.preset_names().join(", ")))?;
        config.controller.kp = preset.controller.kp;
        config.controller.ki = preset.controller.ki;
        config.controller.kd = preset.controller.kd;
    }
    if let Some(kp) = args.kp {
        config.controller.kp = kp;
    }
    if let Some(ki) = args.ki {
        config.controller.ki = ki;
    }
    if let Some(kd) = args.kd {
        config.controller.kd = kd;
    }
    if let Some(target) = args.target {
        config.controller.target = target;
    }
    config.controller = config.controller.clamped();

    if let Some(dt) = args.dt {
        config.physics.dt = dt;
    }
    if let Some(speed) = args.speed {
        config.animation.sim_steps_per_frame = speed.clamp(1, 20);
    }

    config.validate()?;
    Ok(config)
}

/// Run the requested exports without opening the terminal UI
fn run_headless(args: &Args, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = GridSearchEngine::new(&config.grid);
    if args.scatter {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        engine.scatter_walls(&mut rng, config.grid.wall_density);
    }

    if let Some(path) = &args.export_gif {
        let frames = export::export_search_gif(&mut engine.clone(), path, args.cell_px, 4, 2)?;
        println!("Wrote {} frames to {}", frames, path.display());
    }
    if let Some(path) = &args.export_png {
        engine.run_search();
        engine.finish();
        export::export_grid_png(engine.grid(), path, args.cell_px)?;
        println!(
            "Wrote {} (visited {}, path length {})",
            path.display(),
            engine.visited_count(),
            engine.path_length()
        );
    }
    if let Some(path) = &args.export_history {
        let mut sim = PidSimulation::new(config.physics.clone(), config.controller)?;
        for _ in 0..args.steps {
            sim.step();
        }
        let physics = sim.physics();
        export::export_history_png(
            &sim.history().to_vec(),
            sim.target(),
            physics.min_position,
            physics.max_position,
            path,
            600,
            240,
        )?;
        println!("Wrote {} (final altitude {:.2})", path.display(), sim.position());
    }
    if let Some(path) = &args.export_config {
        config.save_to_file(path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let presets = PresetManager::new();
    let config = build_config(&args, &presets)?;

    if args.export_png.is_some()
        || args.export_gif.is_some()
        || args.export_history.is_some()
        || args.export_config.is_some()
    {
        return run_headless(&args, &config);
    }

    let mut app = App::new(&config, presets, args.seed)?;
    app.set_view(parse_view(&args.view));
    if args.scatter {
        app.scatter_walls();
    }
    info!(view = app.view.name(), "starting terminal UI");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    // Target ~60fps for smooth animation
    const FRAME_DURATION: Duration = Duration::from_millis(16);
    let mut last_tick = Instant::now();

    loop {
        // Render current state
        terminal.draw(|frame| ui::render(frame, app))?;

        // Poll for events with timeout
        if event::poll(FRAME_DURATION)? {
            match event::read()? {
                Event::Key(key) => {
                    // Only process Press events
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }

                    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
                    if ctrl && key.code == KeyCode::Char('c') {
                        return Ok(());
                    }
                    if ctrl && key.code == KeyCode::Char('s') {
                        app.save_current_preset();
                        continue;
                    }

                    // === Keys shared by both views ===
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('1') => app.set_view(View::Pathfinder),
                        KeyCode::Char('2') => app.set_view(View::Tuner),
                        KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_fullscreen(),
                        KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => app.toggle_help(),
                        KeyCode::Tab => app.next_focus(),
                        KeyCode::BackTab => app.prev_focus(),
                        KeyCode::Esc => {
                            if app.show_help {
                                app.toggle_help();
                            } else if app.focus.is_param() {
                                app.focus = Focus::Controls;
                            }
                        }
                        KeyCode::Char('j') | KeyCode::Char('J') if app.show_help => {
                            app.scroll_help_down(ui::HELP_CONTENT_LINES);
                        }
                        KeyCode::Char('k') | KeyCode::Char('K') if app.show_help => app.scroll_help_up(),
                        KeyCode::Up | KeyCode::Down if app.focus.is_param() && !app.show_help => {
                            if key.code == KeyCode::Up {
                                app.adjust_focused_up();
                            } else {
                                app.adjust_focused_down();
                            }
                        }
                        _ => match app.view {
                            View::Pathfinder => handle_pathfinder_key(app, key.code),
                            View::Tuner => {
                                let height = terminal.size().map(|s| s.height).unwrap_or_default();
                                handle_tuner_key(app, key.code, height);
                            }
                        },
                    }
                }
                Event::Mouse(mouse) if app.view == View::Pathfinder && !app.show_help => {
                    let size = terminal.size()?;
                    let area = Rect::new(0, 0, size.width, size.height);
                    let cell = ui::grid_cell_at(area, app.fullscreen_mode, app.pathfinder.grid(), mouse.column, mouse.row);
                    match mouse.kind {
                        MouseEventKind::Down(MouseButton::Left) => {
                            if let Some(pos) = cell {
                                app.pointer_down(pos);
                            }
                        }
                        MouseEventKind::Drag(MouseButton::Left) => {
                            if let Some(pos) = cell {
                                app.pointer_drag(pos);
                            }
                        }
                        MouseEventKind::Up(MouseButton::Left) => app.pointer_up(),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        // Advance animation and simulation by the real time that passed
        let now = Instant::now();
        app.tick(now - last_tick);
        last_tick = now;
    }
}

fn handle_pathfinder_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up => app.move_cursor(-1, 0),
        KeyCode::Down => app.move_cursor(1, 0),
        KeyCode::Left => app.move_cursor(0, -1),
        KeyCode::Right => app.move_cursor(0, 1),
        KeyCode::Enter => app.click_cursor(),
        KeyCode::Char(' ') | KeyCode::Char('g') | KeyCode::Char('G') => app.run_search(),
        KeyCode::Char('f') | KeyCode::Char('F') => app.finish_search(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.reset_grid(),
        KeyCode::Char('m') | KeyCode::Char('M') => app.scatter_walls(),
        KeyCode::Char('w') | KeyCode::Char('W') => app.set_tool(Tool::Wall),
        KeyCode::Char('s') | KeyCode::Char('S') => app.set_tool(Tool::MoveStart),
        KeyCode::Char('e') | KeyCode::Char('E') => app.set_tool(Tool::MoveEnd),
        KeyCode::Char('t') | KeyCode::Char('T') => {
            let tool = app.pathfinder.tool().next();
            app.set_tool(tool);
        }
        KeyCode::Char('[') => {
            app.focus = Focus::Density;
            app.adjust_focused_down();
        }
        KeyCode::Char(']') => {
            app.focus = Focus::Density;
            app.adjust_focused_up();
        }
        _ => {}
    }
}

fn handle_tuner_key(app: &mut App, code: KeyCode, terminal_height: u16) {
    match code {
        KeyCode::Char(' ') => app.toggle_pause(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.reset_tuner(),
        KeyCode::Char('d') | KeyCode::Char('D') => app.disturb(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.cycle_preset(),
        KeyCode::Char('x') | KeyCode::Char('X') => app.delete_current_preset(),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            app.increase_speed();
            app.focus = Focus::Speed;
        }
        KeyCode::Char('-') | KeyCode::Char('_') => {
            app.decrease_speed();
            app.focus = Focus::Speed;
        }
        KeyCode::Up => app.scroll_controls_up(),
        KeyCode::Down => {
            let visible = ui::get_controls_visible_lines(terminal_height);
            app.scroll_controls_down(ui::controls_content_lines(View::Tuner).saturating_sub(visible));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cell() {
        assert_eq!(parse_cell("3,7"), Ok(CellPos::new(3, 7)));
        assert_eq!(parse_cell(" 0 , 12 "), Ok(CellPos::new(0, 12)));
        assert!(parse_cell("3").is_err());
        assert!(parse_cell("a,1").is_err());
    }

    #[test]
    fn test_parse_view() {
        assert_eq!(parse_view("Tuner"), View::Tuner);
        assert_eq!(parse_view("pid"), View::Tuner);
        assert_eq!(parse_view("anything"), View::Pathfinder);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "motion-lab", "--rows", "10", "--cols", "12", "--start", "0,0", "--end", "9,11", "--preset", "pid",
            "--kd", "0.5", "--target", "120",
        ]);
        let config = build_config(&args, &PresetManager::with_dir(None)).unwrap();
        assert_eq!((config.grid.rows, config.grid.cols), (10, 12));
        assert_eq!(config.grid.end, CellPos::new(9, 11));
        assert_eq!(config.controller.kp, 1.2);
        assert_eq!(config.controller.kd, 0.5);
        assert_eq!(config.controller.target, 90.0);
    }

    #[test]
    fn test_cell_px_bounded() {
        assert!(Args::try_parse_from(["motion-lab", "--cell-px", "1000"]).is_err());
        assert!(Args::try_parse_from(["motion-lab", "--cell-px", "0"]).is_err());
        assert_eq!(Args::parse_from(["motion-lab", "--cell-px", "64"]).cell_px, 64);
    }

    #[test]
    fn test_invalid_cli_grid_rejected() {
        let args = Args::parse_from(["motion-lab", "--start", "7,20"]);
        assert!(build_config(&args, &PresetManager::with_dir(None)).is_err());

        let args = Args::parse_from(["motion-lab", "--preset", "nope"]);
        assert!(build_config(&args, &PresetManager::with_dir(None)).is_err());
    }
}
