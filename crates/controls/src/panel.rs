use serde::{Deserialize, Serialize};
use spincube_common::RotationSpeed;
use std::str::FromStr;

/// Range and granularity of the speed slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

pub const SLIDER: SliderRange = SliderRange {
    min: RotationSpeed::MIN,
    max: RotationSpeed::MAX,
    step: 0.001,
};

impl SliderRange {
    /// Clamp into range and round to the nearest step.
    pub fn snap(&self, raw: f32) -> f32 {
        if raw.is_nan() || raw <= self.min {
            return self.min;
        }
        if raw >= self.max {
            return self.max;
        }
        let steps = ((raw - self.min) / self.step).round();
        (self.min + steps * self.step).clamp(self.min, self.max)
    }
}

/// Fixed speeds offered as buttons next to the slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeedPreset {
    Stop,
    Normal,
    Fast,
}

impl SpeedPreset {
    pub const ALL: [SpeedPreset; 3] = [Self::Stop, Self::Normal, Self::Fast];

    pub fn value(self) -> f32 {
        match self {
            Self::Stop => 0.0,
            Self::Normal => 0.01,
            Self::Fast => 0.03,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Stop => "Stop",
            Self::Normal => "Normal",
            Self::Fast => "Fast",
        }
    }
}

/// Errors from control input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("unknown preset {0:?} (expected stop, normal or fast)")]
    UnknownPreset(String),
}

impl FromStr for SpeedPreset {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "normal" => Ok(Self::Normal),
            "fast" => Ok(Self::Fast),
            _ => Err(ControlError::UnknownPreset(s.to_string())),
        }
    }
}

/// The speed slider with its preset buttons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPanel {
    speed: RotationSpeed,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new(RotationSpeed::default())
    }
}

impl ControlPanel {
    pub fn new(speed: RotationSpeed) -> Self {
        Self { speed }
    }

    pub fn speed(&self) -> RotationSpeed {
        self.speed
    }

    /// Apply a raw slider value. Returns the stored speed.
    pub fn set_slider(&mut self, raw: f32) -> RotationSpeed {
        self.speed = RotationSpeed::new(SLIDER.snap(raw));
        tracing::debug!(speed = self.speed.get(), "slider moved");
        self.speed
    }

    pub fn apply(&mut self, preset: SpeedPreset) -> RotationSpeed {
        self.speed = RotationSpeed::new(preset.value());
        tracing::debug!(preset = preset.label(), "preset applied");
        self.speed
    }

    /// Preset matching the current speed, if any.
    pub fn active_preset(&self) -> Option<SpeedPreset> {
        SpeedPreset::ALL
            .into_iter()
            .find(|p| (p.value() - self.speed.get()).abs() < SLIDER.step / 2.0)
    }

    /// Speed as a percentage with one decimal, e.g. `1.0%`.
    pub fn label(&self) -> String {
        format!("{:.1}%", self.speed.get() * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_snaps_to_step() {
        let mut panel = ControlPanel::default();
        let s = panel.set_slider(0.0104);
        assert!((s.get() - 0.010).abs() < 1e-6);
        let s = panel.set_slider(0.0236);
        assert!((s.get() - 0.024).abs() < 1e-6);
    }

    #[test]
    fn slider_is_clamped() {
        let mut panel = ControlPanel::default();
        assert_eq!(panel.set_slider(0.5).get(), 0.05);
        assert_eq!(panel.set_slider(-1.0).get(), 0.0);
        assert_eq!(panel.set_slider(f32::NAN).get(), 0.0);
    }

    #[test]
    fn presets_have_exact_values() {
        let mut panel = ControlPanel::default();
        assert_eq!(panel.apply(SpeedPreset::Stop).get(), 0.0);
        assert_eq!(panel.active_preset(), Some(SpeedPreset::Stop));
        assert_eq!(panel.apply(SpeedPreset::Normal).get(), 0.01);
        assert_eq!(panel.apply(SpeedPreset::Fast).get(), 0.03);
        assert_eq!(panel.active_preset(), Some(SpeedPreset::Fast));

        panel.set_slider(0.02);
        assert_eq!(panel.active_preset(), None);
    }

    #[test]
    fn label_is_percentage() {
        let mut panel = ControlPanel::default();
        assert_eq!(panel.label(), "1.0%");
        panel.apply(SpeedPreset::Fast);
        assert_eq!(panel.label(), "3.0%");
        panel.set_slider(0.05);
        assert_eq!(panel.label(), "5.0%");
    }

    #[test]
    fn preset_parsing() {
        assert_eq!("Fast".parse::<SpeedPreset>(), Ok(SpeedPreset::Fast));
        assert_eq!("stop".parse::<SpeedPreset>(), Ok(SpeedPreset::Stop));
        assert!(matches!(
            "turbo".parse::<SpeedPreset>(),
            Err(ControlError::UnknownPreset(_))
        ));
    }
}
