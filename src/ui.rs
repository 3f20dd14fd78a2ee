use crate::app::{App, Focus};
use crate::braille;
use crate::grid::{CellPos, CellRole, Grid};
use crate::search::SearchOutcome;
use crate::settings::View;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 26;
const STATUS_HEIGHT: u16 = 6;
const PARAMS_HEIGHT: u16 = 9;

/// Terminal columns per grid cell (keeps cells roughly square)
const CELL_WIDTH: u16 = 2;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 50;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;
const TRACE_COLOR: Color = Color::Green;
const SETPOINT_COLOR: Color = Color::Cyan;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

fn role_color(role: CellRole) -> Color {
    match role {
        CellRole::Empty => Color::Rgb(15, 23, 42),
        CellRole::Wall => Color::Rgb(100, 116, 139),
        CellRole::Start => Color::Rgb(6, 182, 212),
        CellRole::End => Color::Rgb(239, 68, 68),
        CellRole::Visited => Color::Rgb(22, 78, 99),
        CellRole::Path => Color::Rgb(250, 204, 21),
    }
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Outer rectangle of the canvas (including its border)
fn canvas_area(frame_area: Rect, fullscreen: bool) -> Rect {
    if fullscreen {
        frame_area
    } else {
        let sidebar = SIDEBAR_WIDTH.min(frame_area.width);
        Rect {
            x: frame_area.x + sidebar,
            y: frame_area.y,
            width: frame_area.width - sidebar,
            height: frame_area.height,
        }
    }
}

/// Top-left terminal cell of the grid drawing, centred when it fits
fn grid_origin(inner: Rect, grid: &Grid) -> (u16, u16) {
    let grid_w = (grid.cols() as u16).saturating_mul(CELL_WIDTH);
    let grid_h = grid.rows() as u16;
    (
        inner.x + inner.width.saturating_sub(grid_w) / 2,
        inner.y + inner.height.saturating_sub(grid_h) / 2,
    )
}

/// Map a terminal position to the grid cell drawn there
pub fn grid_cell_at(frame_area: Rect, fullscreen: bool, grid: &Grid, column: u16, row: u16) -> Option<CellPos> {
    let inner = styled_block("").inner(canvas_area(frame_area, fullscreen));
    if column < inner.x || row < inner.y || column >= inner.x + inner.width || row >= inner.y + inner.height {
        return None;
    }
    let (ox, oy) = grid_origin(inner, grid);
    if column < ox || row < oy {
        return None;
    }
    let pos = CellPos::new((row - oy) as usize, ((column - ox) / CELL_WIDTH) as usize);
    grid.contains(pos).then_some(pos)
}

/// Number of lines in the controls box for a view
pub fn controls_content_lines(view: View) -> u16 {
    controls_content(view).len() as u16
}

/// Visible lines in the controls box for a terminal height
pub fn get_controls_visible_lines(terminal_height: u16) -> u16 {
    terminal_height.saturating_sub(STATUS_HEIGHT + PARAMS_HEIGHT + 2)
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(STATUS_HEIGHT),
            Constraint::Length(PARAMS_HEIGHT),
            Constraint::Min(4),
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Motion Lab ");
    let text = Style::default().fg(TEXT_COLOR);

    let (status_text, status_color, details) = match app.view {
        View::Pathfinder => {
            let engine = &app.pathfinder;
            let (label, color) = if engine.is_running() {
                ("RUNNING", BORDER_COLOR)
            } else {
                match engine.outcome() {
                    Some(SearchOutcome::Found { .. }) => ("FOUND", Color::Green),
                    Some(SearchOutcome::Exhausted) => ("NO PATH", Color::Red),
                    None => ("IDLE", DIM_TEXT_COLOR),
                }
            };
            let details = vec![
                Line::from(Span::styled(format!("Visited: {}", engine.visited_count()), text)),
                Line::from(Span::styled(format!("Path Length: {}", engine.path_length()), text)),
            ];
            (label, color, details)
        }
        View::Tuner => {
            let (label, color) = if app.paused {
                ("PAUSED", HIGHLIGHT_COLOR)
            } else {
                ("RUNNING", BORDER_COLOR)
            };
            let details = vec![
                Line::from(Span::styled(
                    format!("Alt: {:>5.1} / {:.0}", app.tuner.position(), app.tuner.target()),
                    text,
                )),
                Line::from(Span::styled(format!("Steps: {}", app.tuner.steps()), text)),
            ];
            (label, color, details)
        }
    };

    let mut content = vec![Line::from(vec![
        Span::styled(format!("{} ", app.view.name()), text),
        Span::styled(status_text, Style::default().fg(status_color)),
    ])];
    content.extend(details);
    if let Some(status) = &app.status {
        content.push(Line::from(Span::styled(status.clone(), Style::default().fg(DIM_TEXT_COLOR))));
    }

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let make_line = |label: &str, value: String, focused: bool| {
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        Line::from(Span::styled(format!("{}{}: {}", prefix, label, value), style))
    };
    let dim = |text: String| Line::from(Span::styled(text, Style::default().fg(DIM_TEXT_COLOR)));

    let content = match app.view {
        View::Pathfinder => {
            let grid = app.pathfinder.grid();
            let mut lines = vec![
                make_line(
                    "Tool",
                    if app.pathfinder.is_pointer_held() {
                        format!("{} (drag)", app.pathfinder.tool().name())
                    } else {
                        app.pathfinder.tool().name().to_string()
                    },
                    app.focus == Focus::Tool,
                ),
                make_line(
                    "Walls",
                    format!("{:.0}%", app.grid_settings.wall_density * 100.0),
                    app.focus == Focus::Density,
                ),
                dim(format!("  Grid: {}x{}", grid.rows(), grid.cols())),
                dim(format!(
                    "  Cursor: {},{} {}",
                    app.cursor.row,
                    app.cursor.col,
                    grid.role(app.cursor).map_or("", |r| r.name())
                )),
            ];
            lines.push(Line::from(
                [CellRole::Start, CellRole::End, CellRole::Wall, CellRole::Visited, CellRole::Path]
                    .iter()
                    .flat_map(|&role| {
                        [
                            Span::styled("  ", Style::default().bg(role_color(role))),
                            Span::raw(" "),
                        ]
                    })
                    .collect::<Vec<_>>(),
            ));
            lines
        }
        View::Tuner => {
            let gains = app.tuner.gains();
            vec![
                make_line("Kp", format!("{:.2}", gains.kp), app.focus == Focus::Kp),
                make_line("Ki", format!("{:.3}", gains.ki), app.focus == Focus::Ki),
                make_line("Kd", format!("{:.2}", gains.kd), app.focus == Focus::Kd),
                make_line("Target", format!("{:.0}", app.tuner.target()), app.focus == Focus::Target),
                make_line(
                    "Speed",
                    format!("{}", app.animation.sim_steps_per_frame),
                    app.focus == Focus::Speed,
                ),
                dim(format!("  Preset: {}", app.current_preset_name().unwrap_or("custom"))),
            ]
        }
    };

    // Calculate scroll to keep focused item visible based on actual area
    let focus_line = app.focus.line_index();
    let visible_height = area.height.saturating_sub(2);
    let content_height = content.len() as u16;

    let scroll = if visible_height == 0 || visible_height >= content_height {
        0
    } else if focus_line >= visible_height {
        focus_line.saturating_sub(visible_height - 1)
    } else {
        0
    };

    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn controls_content(view: View) -> Vec<Line<'static>> {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let make_control = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{:>6}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let mut content = match view {
        View::Pathfinder => vec![
            make_control("Click", "use tool"),
            make_control("Drag", "paint walls"),
            make_control("Arrows", "move cursor"),
            make_control("Enter", "use tool at cursor"),
            make_control("W/S/E", "wall/start/end"),
            make_control("T", "cycle tool"),
            make_control("Space", "find path"),
            make_control("F", "skip animation"),
            make_control("M", "random walls"),
            make_control("[/]", "wall density"),
            make_control("R", "reset grid"),
        ],
        View::Tuner => vec![
            make_control("Tab", "select gain"),
            make_control("Up/Dn", "adjust"),
            make_control("D", "disturb"),
            make_control("Space", "pause/resume"),
            make_control("R", "reset drone"),
            make_control("+/-", "speed"),
            make_control("P", "next preset"),
            make_control("^S", "save preset"),
            make_control("X", "delete preset"),
        ],
    };
    content.extend([
        make_control("1/2", "switch view"),
        make_control("V", "fullscreen"),
        make_control("H/?", "help"),
        make_control("Q", "quit"),
    ]);
    content
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let content = controls_content(app.view);

    let content_height = content.len() as u16;
    let visible_height = area.height.saturating_sub(2);
    let max_scroll = content_height.saturating_sub(visible_height);

    let title = if max_scroll > 0 && app.view == View::Tuner {
        " Controls (↑↓) "
    } else {
        " Controls "
    };

    let paragraph = Paragraph::new(content)
        .block(styled_block(title))
        .scroll((app.controls_scroll.min(max_scroll), 0));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    match app.view {
        View::Pathfinder => render_grid(frame, area, app),
        View::Tuner => render_tuner(frame, area, app),
    }
}

fn render_grid(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Pathfinder ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let grid = app.pathfinder.grid();
    let (ox, oy) = grid_origin(inner, grid);
    let visible_rows = (inner.y + inner.height).saturating_sub(oy) as usize;
    let visible_cols = ((inner.x + inner.width).saturating_sub(ox) / CELL_WIDTH) as usize;
    let rows = grid.rows().min(visible_rows);
    let cols = grid.cols().min(visible_cols);
    if rows == 0 || cols == 0 {
        return;
    }

    let lines: Vec<Line> = (0..rows)
        .map(|row| {
            let spans: Vec<Span> = (0..cols)
                .map(|col| {
                    let pos = CellPos::new(row, col);
                    let role = grid.cell_at(grid.index(pos)).role;
                    let style = Style::default().bg(role_color(role));
                    if pos == app.cursor {
                        Span::styled("[]", style.fg(Color::White).add_modifier(Modifier::BOLD))
                    } else {
                        Span::styled("  ", style)
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    let grid_area = Rect {
        x: ox,
        y: oy,
        width: cols as u16 * CELL_WIDTH,
        height: rows as u16,
    };
    frame.render_widget(Paragraph::new(lines), grid_area);
}

fn render_tuner(frame: &mut Frame, area: Rect, app: &App) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(12), Constraint::Min(0)])
        .split(area);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(columns[1]);

    render_altitude(frame, columns[0], app);
    render_history(frame, right[0], app);
    render_telemetry(frame, right[1], app);
}

/// Vertical altitude gauge with the drone and the target marker
fn render_altitude(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Alt ");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let physics = app.tuner.physics();
    let span = physics.max_position - physics.min_position;
    let row_of = |value: f64| -> u16 {
        let t = ((physics.max_position - value) / span).clamp(0.0, 1.0);
        (t * (inner.height - 1) as f64).round() as u16
    };
    let drone_row = row_of(app.tuner.position());
    let target_row = row_of(app.tuner.target());

    let lines: Vec<Line> = (0..inner.height)
        .map(|row| {
            if row == drone_row {
                Line::from(Span::styled(
                    "  <=█=>",
                    Style::default().fg(TRACE_COLOR).add_modifier(Modifier::BOLD),
                ))
            } else if row == target_row {
                Line::from(Span::styled("  ------", Style::default().fg(SETPOINT_COLOR)))
            } else if row == inner.height - 1 {
                Line::from(Span::styled("▁▁▁▁▁▁▁▁▁▁", Style::default().fg(DIM_TEXT_COLOR)))
            } else {
                Line::from(Span::styled("     │", Style::default().fg(Color::DarkGray)))
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_history(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!(" Altitude history (last {}) ", app.tuner.history().capacity());
    let block = styled_block(&title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let physics = app.tuner.physics();
    let samples = app.tuner.history().to_vec();
    let cells = braille::plot_series(
        &samples,
        app.tuner.target(),
        physics.min_position,
        physics.max_position,
        inner.width,
        inner.height,
        TRACE_COLOR,
        SETPOINT_COLOR,
    );

    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            let cell_rect = Rect {
                x,
                y,
                width: 1,
                height: 1,
            };
            let span = Span::styled(cell.char.to_string(), Style::default().fg(cell.color));
            frame.render_widget(Paragraph::new(Line::from(span)), cell_rect);
        }
    }
}

fn render_telemetry(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Controller ");
    let t = app.tuner.last_telemetry();
    let state = app.tuner.state();
    let value = Style::default().fg(TEXT_COLOR);
    let label = Style::default().fg(DIM_TEXT_COLOR);

    let mut first = vec![
        Span::styled("err ", label),
        Span::styled(format!("{:+7.2}  ", t.error), value),
        Span::styled("P ", label),
        Span::styled(format!("{:+6.2}  ", t.proportional), value),
        Span::styled("I ", label),
        Span::styled(format!("{:+6.2}  ", t.integral), value),
        Span::styled("D ", label),
        Span::styled(format!("{:+6.2}", t.derivative), value),
    ];
    if t.bounced {
        first.push(Span::styled("  BOUNCE", Style::default().fg(Color::Red)));
    }

    let mut second = vec![
        Span::styled("force ", label),
        Span::styled(format!("{:+6.2}  ", t.control_force), value),
        Span::styled("vel ", label),
        Span::styled(format!("{:+6.2}  ", state.velocity), value),
        Span::styled("∫ ", label),
        Span::styled(format!("{:+6.2}", state.integral), value),
    ];
    if let Some(rest) = app.tuner.proportional_equilibrium() {
        second.push(Span::styled(format!("  P-only rest {:.1}", rest), label));
    }

    let paragraph = Paragraph::new(vec![Line::from(first), Line::from(second)]).block(block);
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let canvas = canvas_area(area, app.fullscreen_mode);

    // Center the help dialog within the canvas
    let help_width = 60.min(canvas.width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(40);
    let help_area = Rect {
        x: canvas.x + canvas.width.saturating_sub(help_width) / 2,
        y: area.y + area.height.saturating_sub(help_height) / 2,
        width: help_width,
        height: help_height,
    };

    frame.render_widget(Clear, help_area);

    let heading = Style::default().fg(HIGHLIGHT_COLOR);
    let title = Style::default().fg(BORDER_COLOR);
    let item = Style::default().fg(TEXT_COLOR);

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("PATHFINDER (1)", title)),
        Line::from(""),
        Line::from("Uniform-cost search over a 4-connected grid. Cells settle in order of distance from the start; ties go to the upper-left cell. The shortest path is traced back once the end settles."),
        Line::from(""),
        Line::from(Span::styled("TOOLS:", heading)),
        Line::from(Span::styled("W - Wall", item)),
        Line::from("Click toggles a wall, dragging paints walls on every cell entered. Start and end cannot be walled."),
        Line::from(Span::styled("S / E - Move start / end", item)),
        Line::from("Click an open cell to relocate the endpoint. The previous result is cleared."),
        Line::from(""),
        Line::from(Span::styled("Space - Find path", item)),
        Line::from("Editing is locked while the search animates. F skips to the result."),
        Line::from(Span::styled("M - Random walls", item)),
        Line::from("Scatter walls at the density set with [ and ]."),
        Line::from(""),
        Line::from(Span::styled("PID TUNER (2)", title)),
        Line::from(""),
        Line::from("A drone hovers under gravity. The controller force is Kp*error + Ki*integral + Kd*derivative. The integral is clamped to limit windup; hitting the floor or ceiling bounces the drone."),
        Line::from(""),
        Line::from(Span::styled("GAINS:", heading)),
        Line::from("P only leaves a steady offset below the target. Ki removes it. Kd damps overshoot."),
        Line::from(""),
        Line::from(Span::styled("D - Disturb", item)),
        Line::from("Push the drone down and watch it recover."),
        Line::from(Span::styled("P / Ctrl+S - Presets", item)),
        Line::from("Cycle built-in and saved gain sets, or save the current gains. X deletes the selected saved preset."),
        Line::from(""),
        Line::from(Span::styled("BASIC CONTROLS:", heading)),
        Line::from("1/2=View, Tab/Arrows=Adjust, Space=Run/Pause, R=Reset, V=Fullscreen, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2);
    let max_scroll = content_height.saturating_sub(visible_height);

    let title = if max_scroll > 0 {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
