//! Figure sizing, colours and label formatting.

use plotters::style::RGBColor;

/// Line colours, assigned to locations in order
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(52, 152, 219),  // Blue
    RGBColor(231, 76, 60),   // Red
    RGBColor(46, 204, 113),  // Green
    RGBColor(155, 89, 182),  // Purple
    RGBColor(243, 156, 18),  // Orange
    RGBColor(26, 188, 156),  // Teal
    RGBColor(233, 30, 99),   // Pink
    RGBColor(0, 188, 212),   // Cyan
    RGBColor(121, 85, 72),   // Brown
    RGBColor(96, 125, 139),  // Blue Grey
];

// Plasma colour map anchors (0.0, 0.25, 0.5, 0.75, 1.0)
const PLASMA: [(u8, u8, u8); 5] = [
    (13, 8, 135),
    (126, 3, 168),
    (204, 71, 120),
    (248, 149, 64),
    (240, 249, 33),
];

/// Per-call drawing settings; there is no shared figure context.
#[derive(Debug, Clone)]
pub struct FigureStyle {
    pub width: u32,
    pub height: u32,
    pub font_family: &'static str,
    pub title_size: u32,
    pub label_size: u32,
}

impl Default for FigureStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            font_family: "sans-serif",
            title_size: 26,
            label_size: 15,
        }
    }
}

impl FigureStyle {
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn series_color(&self, index: usize) -> RGBColor {
        PALETTE[index % PALETTE.len()]
    }
}

/// Continuous Plasma scale; `t` is clamped to [0, 1].
pub fn plasma(t: f64) -> RGBColor {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    let scaled = t * (PLASMA.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(PLASMA.len() - 2);
    let frac = scaled - lower as f64;

    let (r0, g0, b0) = PLASMA[lower];
    let (r1, g1, b1) = PLASMA[lower + 1];
    let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;

    RGBColor(mix(r0, r1), mix(g0, g1), mix(b0, b1))
}

/// Short axis label: 1500 -> "1.5K", 2_000_000 -> "2.0M".
pub fn compact_number(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else if abs > 0.0 && abs < 1.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.0}", value)
    }
}
