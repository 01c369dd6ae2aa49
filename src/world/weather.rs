//! Weather state handed to the renderer each frame

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherKind {
    Clear,
    Rain,
    Snow,
    Fog,
}

impl WeatherKind {
    pub const ALL: [WeatherKind; 4] = [WeatherKind::Clear, WeatherKind::Rain, WeatherKind::Snow, WeatherKind::Fog];

    /// Next kind in the cycle, wrapping
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub kind: WeatherKind,
    /// 0.0 (none) to 1.0 (heaviest)
    pub intensity: f32,
}

impl Weather {
    pub fn new(kind: WeatherKind, intensity: f32) -> Self {
        Self { kind, intensity: intensity.clamp(0.0, 1.0) }
    }
}

impl Default for Weather {
    fn default() -> Self {
        Self::new(WeatherKind::Clear, 0.0)
    }
}
