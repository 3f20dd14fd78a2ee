use ratatui::style::Color;

/// Braille character rendering for high-resolution terminal plots.
/// Each Braille character represents a 2x4 grid of dots (8 dots total).
///
/// Dot positions and their bit values:
/// ```text
/// (0,0)=0x01  (1,0)=0x08
/// (0,1)=0x02  (1,1)=0x10
/// (0,2)=0x04  (1,2)=0x20
/// (0,3)=0x40  (1,3)=0x80
/// ```
///
/// Unicode Braille patterns: U+2800 to U+28FF (256 patterns)
const BRAILLE_BASE: u32 = 0x2800;

/// Dot position to bit mapping for Braille characters
const BRAILLE_DOTS: [[u8; 4]; 2] = [
    [0x01, 0x02, 0x04, 0x40], // Left column (x=0): rows 0,1,2,3
    [0x08, 0x10, 0x20, 0x80], // Right column (x=1): rows 0,1,2,3
];

/// A single rendered Braille cell with position and color
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrailleCell {
    pub x: u16,
    pub y: u16,
    pub char: char,
    pub color: Color,
}

/// Dot layers; later layers win the cell color
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Layer {
    Empty,
    Setpoint,
    Trace,
}

/// Plot a series (oldest first) and a horizontal setpoint into Braille cells.
///
/// Values are mapped from `[min, max]` onto the canvas height, newest sample
/// on the right edge. Consecutive samples are joined with vertical runs so
/// steep moves stay connected.
pub fn plot_series(
    samples: &[f64],
    setpoint: f64,
    min: f64,
    max: f64,
    canvas_width: u16,
    canvas_height: u16,
    trace_color: Color,
    setpoint_color: Color,
) -> Vec<BrailleCell> {
    let dots_w = canvas_width as usize * 2;
    let dots_h = canvas_height as usize * 4;
    if dots_w == 0 || dots_h == 0 || samples.is_empty() || !(max > min) {
        return Vec::new();
    }

    let mut patterns = vec![0u8; canvas_width as usize * canvas_height as usize];
    let mut layers = vec![Layer::Empty; patterns.len()];

    let to_dot_y = |value: f64| -> usize {
        let t = ((value - min) / (max - min)).clamp(0.0, 1.0);
        ((1.0 - t) * (dots_h - 1) as f64).round() as usize
    };

    let mut set_dot = |dx: usize, dy: usize, layer: Layer| {
        let cell = (dy / 4) * canvas_width as usize + dx / 2;
        patterns[cell] |= BRAILLE_DOTS[dx % 2][dy % 4];
        layers[cell] = layers[cell].max(layer);
    };

    // Dashed setpoint line
    let setpoint_y = to_dot_y(setpoint);
    for dx in (0..dots_w).filter(|x| x % 4 < 2) {
        set_dot(dx, setpoint_y, Layer::Setpoint);
    }

    // Stretch the series across the full width
    let last = samples.len().saturating_sub(1).max(1) as f64;
    let mut prev: Option<usize> = None;
    for dx in 0..dots_w {
        let t = if dots_w > 1 { dx as f64 / (dots_w - 1) as f64 } else { 1.0 };
        let idx = ((t * last).round() as usize).min(samples.len() - 1);
        let dy = to_dot_y(samples[idx]);
        let (lo, hi) = match prev {
            Some(p) if p < dy => (p + 1, dy),
            Some(p) if p > dy => (dy, p - 1),
            _ => (dy, dy),
        };
        for y in lo..=hi {
            set_dot(dx, y, Layer::Trace);
        }
        prev = Some(dy);
    }

    patterns
        .iter()
        .zip(layers.iter())
        .enumerate()
        .filter(|(_, (pattern, _))| **pattern != 0)
        .map(|(i, (&pattern, &layer))| BrailleCell {
            x: (i % canvas_width as usize) as u16,
            y: (i / canvas_width as usize) as u16,
            char: char::from_u32(BRAILLE_BASE + pattern as u32).unwrap_or(' '),
            color: if layer == Layer::Trace {
                trace_color
            } else {
                setpoint_color
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_braille_pattern() {
        // Test that single dot patterns work correctly
        assert_eq!(BRAILLE_DOTS[0][0], 0x01); // Top-left
        assert_eq!(BRAILLE_DOTS[1][0], 0x08); // Top-right
        assert_eq!(BRAILLE_DOTS[0][3], 0x40); // Bottom-left
        assert_eq!(BRAILLE_DOTS[1][3], 0x80); // Bottom-right

        // All dots should give 0xFF
        let all_dots: u8 = BRAILLE_DOTS[0].iter().sum::<u8>() + BRAILLE_DOTS[1].iter().sum::<u8>();
        assert_eq!(all_dots, 0xFF);
    }

    #[test]
    fn test_flat_series_at_bottom() {
        let samples = vec![0.0; 10];
        let cells = plot_series(&samples, 100.0, 0.0, 100.0, 4, 2, Color::Green, Color::Cyan);

        let trace: Vec<_> = cells.iter().filter(|c| c.color == Color::Green).collect();
        assert_eq!(trace.len(), 4);
        for cell in &trace {
            assert_eq!(cell.y, 1);
            // Both bottom dots set
            assert_eq!(cell.char, char::from_u32(BRAILLE_BASE + 0xC0).unwrap());
        }
        // Setpoint at the very top row
        assert!(cells.iter().any(|c| c.y == 0 && c.color == Color::Cyan));
    }

    #[test]
    fn test_step_is_connected() {
        let mut samples = vec![0.0; 5];
        samples.extend(vec![100.0; 5]);
        let cells = plot_series(&samples, 50.0, 0.0, 100.0, 5, 3, Color::Green, Color::Cyan);

        // The jump column touches every row
        for row in 0..3 {
            assert!(cells.iter().any(|c| c.y == row && c.color == Color::Green));
        }
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(plot_series(&[], 0.0, 0.0, 1.0, 4, 4, Color::Green, Color::Cyan).is_empty());
        assert!(plot_series(&[1.0], 0.0, 1.0, 1.0, 4, 4, Color::Green, Color::Cyan).is_empty());
        assert!(plot_series(&[1.0], 0.0, 0.0, 1.0, 0, 4, Color::Green, Color::Cyan).is_empty());
    }
}
