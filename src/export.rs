use crate::error::ExportError;
use crate::grid::{CellPos, CellRole, Grid};
use crate::pathfinder::GridSearchEngine;
use gif::{Encoder, Frame, Repeat};
use image::{Rgb, RgbImage};
use std::borrow::Cow;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// Palette shared by PNG and GIF output, indexed by `palette_index`
const PALETTE: [[u8; 3]; 8] = [
    [30, 41, 59],    // grid lines
    [15, 23, 42],    // empty
    [51, 65, 85],    // wall
    [6, 182, 212],   // start
    [239, 68, 68],   // end
    [22, 78, 99],    // visited
    [250, 204, 21],  // path
    [0, 0, 0],       // padding
];

const GRID_LINE: u8 = 0;

fn palette_index(role: CellRole) -> u8 {
    match role {
        CellRole::Empty => 1,
        CellRole::Wall => 2,
        CellRole::Start => 3,
        CellRole::End => 4,
        CellRole::Visited => 5,
        CellRole::Path => 6,
    }
}

/// Pixel size of a rasterized grid: cells plus one-pixel separators.
/// Fails when the image or its pixel buffer would not fit in `u32`.
fn raster_size(grid: &Grid, cell_px: u32) -> Result<(u32, u32), ExportError> {
    let pitch = u64::from(cell_px) + 1;
    let side = |cells: usize| (cells as u64).saturating_mul(pitch).saturating_add(1);
    let (width, height) = (side(grid.cols()), side(grid.rows()));
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w.checked_mul(h).is_some() => Ok((w, h)),
        _ => Err(ExportError::TooLarge {
            width: width.min(u64::from(u32::MAX)) as u32,
            height: height.min(u64::from(u32::MAX)) as u32,
        }),
    }
}

/// Rasterize the grid into palette indices, row-major
fn rasterize(grid: &Grid, cell_px: u32, (width, height): (u32, u32)) -> Vec<u8> {
    let pitch = cell_px + 1;
    let mut pixels = vec![GRID_LINE; (width * height) as usize];
    for y in 0..height {
        if y % pitch == 0 {
            continue;
        }
        let row = (y / pitch) as usize;
        for x in 0..width {
            if x % pitch == 0 {
                continue;
            }
            let col = (x / pitch) as usize;
            let idx = grid.index(CellPos::new(row, col));
            pixels[(y * width + x) as usize] = palette_index(grid.cell_at(idx).role);
        }
    }
    pixels
}

/// Save a snapshot of the grid as PNG
pub fn export_grid_png(grid: &Grid, path: &Path, cell_px: u32) -> Result<(), ExportError> {
    if grid.len() == 0 || cell_px == 0 {
        return Err(ExportError::EmptyGrid);
    }
    let (width, height) = raster_size(grid, cell_px)?;
    let pixels = rasterize(grid, cell_px, (width, height));
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb(PALETTE[pixels[(y * width + x) as usize] as usize])
    });
    image.save(path)?;
    info!(path = %path.display(), width, height, "grid exported");
    Ok(())
}

/// Run a search on the engine and record its whole animation as a looping GIF.
///
/// `events_per_frame` batches several search events into one GIF frame; the
/// final frame is held longer. Returns the number of frames written.
pub fn export_search_gif(
    engine: &mut GridSearchEngine,
    path: &Path,
    cell_px: u32,
    events_per_frame: usize,
    frame_delay_cs: u16,
) -> Result<usize, ExportError> {
    if engine.grid().len() == 0 || cell_px == 0 {
        return Err(ExportError::EmptyGrid);
    }
    let (width, height) = raster_size(engine.grid(), cell_px)?;
    let (gif_w, gif_h) = match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => return Err(ExportError::TooLarge { width, height }),
    };

    let file = BufWriter::new(File::create(path)?);
    let palette: Vec<u8> = PALETTE.iter().flatten().copied().collect();
    let mut encoder = Encoder::new(file, gif_w, gif_h, &palette)?;
    encoder.set_repeat(Repeat::Infinite)?;

    let mut write = |grid: &Grid, delay: u16| -> Result<(), ExportError> {
        let mut frame = Frame::default();
        frame.width = gif_w;
        frame.height = gif_h;
        frame.delay = delay;
        frame.buffer = Cow::Owned(rasterize(grid, cell_px, (width, height)));
        encoder.write_frame(&frame)?;
        Ok(())
    };

    engine.run_search();
    write(engine.grid(), frame_delay_cs)?;
    let mut frames = 1;
    let batch = events_per_frame.max(1);

    while engine.is_running() {
        for _ in 0..batch {
            if engine.advance().is_none() {
                break;
            }
        }
        let delay = if engine.is_running() {
            frame_delay_cs
        } else {
            frame_delay_cs.saturating_mul(50).max(100)
        };
        write(engine.grid(), delay)?;
        frames += 1;
    }

    info!(path = %path.display(), frames, "search animation exported");
    Ok(frames)
}

/// Plot a position history and its setpoint as PNG
pub fn export_history_png(
    samples: &[f64],
    setpoint: f64,
    min: f64,
    max: f64,
    path: &Path,
    width: u32,
    height: u32,
) -> Result<(), ExportError> {
    if samples.is_empty() || width < 2 || height < 2 || !(max > min) {
        return Err(ExportError::EmptyGrid);
    }
    let background = Rgb([2, 6, 23]);
    let setpoint_color = Rgb([34, 211, 238]);
    let trace_color = Rgb([74, 222, 128]);

    let mut image = RgbImage::from_pixel(width, height, background);
    let to_y = |value: f64| -> u32 {
        let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
        ((1.0 - t) * (height - 1) as f64).round() as u32
    };

    let sy = to_y(setpoint);
    for x in (0..width).filter(|x| x % 10 < 5) {
        image.put_pixel(x, sy, setpoint_color);
    }

    let last = (samples.len() - 1).max(1) as f64;
    let mut prev: Option<u32> = None;
    for x in 0..width {
        let t = x as f64 / (width - 1) as f64;
        let idx = ((t * last).round() as usize).min(samples.len() - 1);
        let y = to_y(samples[idx]);
        let (lo, hi) = match prev {
            Some(p) => (p.min(y), p.max(y)),
            None => (y, y),
        };
        for py in lo..=hi {
            image.put_pixel(x, py, trace_color);
        }
        prev = Some(y);
    }

    image.save(path)?;
    info!(path = %path.display(), samples = samples.len(), "history exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GridSettings;
    use tempfile::TempDir;

    #[test]
    fn test_rasterize_layout() {
        let grid = Grid::new(2, 3, CellPos::new(0, 0), CellPos::new(1, 2));
        let (w, h) = raster_size(&grid, 2).unwrap();
        assert_eq!((w, h), (10, 7));

        let pixels = rasterize(&grid, 2, (w, h));
        assert_eq!(pixels.len(), 70);
        // Separator row and column
        assert!(pixels[..10].iter().all(|&p| p == GRID_LINE));
        assert_eq!(pixels[10], GRID_LINE);
        // First cell is start, last cell is end
        assert_eq!(pixels[11], palette_index(CellRole::Start));
        assert_eq!(pixels[5 * 10 + 8], palette_index(CellRole::End));
    }

    #[test]
    fn test_export_grid_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("grid.png");
        let grid = Grid::new(15, 25, CellPos::new(7, 4), CellPos::new(7, 20));

        export_grid_png(&grid, &path, 8).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (25 * 9 + 1, 15 * 9 + 1));
        // Centre of the start cell
        let px = img.get_pixel(4 * 9 + 5, 7 * 9 + 5);
        assert_eq!(px.0, PALETTE[3]);
    }

    #[test]
    fn test_oversized_raster_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.png");
        let grid = Grid::new(100, 100, CellPos::new(0, 0), CellPos::new(99, 99));

        let err = export_grid_png(&grid, &path, 1000);
        assert!(matches!(err, Err(ExportError::TooLarge { .. })));
        assert!(!path.exists());

        let mut engine = GridSearchEngine::new(&GridSettings {
            rows: 100,
            cols: 100,
            start: CellPos::new(0, 0),
            end: CellPos::new(99, 99),
            wall_density: 0.0,
        });
        let err = export_search_gif(&mut engine, &path, 1000, 1, 2);
        assert!(matches!(err, Err(ExportError::TooLarge { .. })));
    }

    #[test]
    fn test_export_search_gif_plays_full_animation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("search.gif");
        let mut engine = GridSearchEngine::new(&GridSettings::default());

        let frames = export_search_gif(&mut engine, &path, 4, 10, 2).unwrap();

        assert!(frames > 2);
        assert!(!engine.is_running());
        assert_eq!(engine.path_length(), 16);
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_export_history_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.png");
        let samples: Vec<f64> = (0..100).map(|i| i as f64).collect();

        export_history_png(&samples, 50.0, 0.0, 100.0, &path, 200, 80).unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (200, 80));

        let err = export_history_png(&[], 50.0, 0.0, 100.0, &path, 200, 80);
        assert!(matches!(err, Err(ExportError::EmptyGrid)));
    }
}
