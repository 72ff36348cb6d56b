use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shade applied to a task's color for its subtasks.
pub const SUBTASK_SHADE_PERCENT: i32 = 30;

const PALETTE: [Rgb; 10] = [
    Rgb::new(0xff, 0xb3, 0xba),
    Rgb::new(0xff, 0xdf, 0xba),
    Rgb::new(0xff, 0xff, 0xba),
    Rgb::new(0xba, 0xff, 0xc9),
    Rgb::new(0xba, 0xe1, 0xff),
    Rgb::new(0xe0, 0xbb, 0xe4),
    Rgb::new(0xfe, 0xc8, 0xd8),
    Rgb::new(0xd4, 0xf0, 0xf0),
    Rgb::new(0xff, 0xda, 0xc1),
    Rgb::new(0xc7, 0xce, 0xea),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid hex color: {0:?}")]
pub struct ColorError(pub String);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError(s.to_string()));
        }
        let value = u32::from_str_radix(hex, 16).map_err(|_| ColorError(s.to_string()))?;
        Ok(Rgb::new(
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ))
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Stable palette color for a task id. Different ids may share a color.
pub fn color_for_task(task_id: &str) -> Rgb {
    let sum: u64 = task_id.encode_utf16().map(u64::from).sum();
    PALETTE[(sum % PALETTE.len() as u64) as usize]
}

/// Shifts every channel by `round(2.55 * percent)`, clamped to the byte range.
/// Percentages beyond +/-100 saturate to white or black.
pub fn lighten(color: Rgb, percent: i32) -> Rgb {
    let amount = (2.55 * f64::from(percent.clamp(-100, 100))).round() as i32;
    let shift = |channel: u8| i32::from(channel).saturating_add(amount).clamp(0, 255) as u8;
    Rgb::new(shift(color.r), shift(color.g), shift(color.b))
}
