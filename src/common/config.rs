use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

/// Largest number of components a row holds unless configured otherwise.
pub const DEFAULT_MAX_ROW_CHILDREN: usize = 4;
const_assert!(DEFAULT_MAX_ROW_CHILDREN >= 2);

pub fn config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("form-canvas").join("config.toml"))
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub placement: PlacementSettings,
    #[serde(default)]
    pub rows: RowSettings,
}

/// Size of the hit bands used to turn a pointer position into a drop intent.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct PlacementSettings {
    /// Fraction of a target's height, at its top and at its bottom, that
    /// selects inserting above or below it.
    #[serde(default = "default_vertical_band")]
    pub vertical_band: f64,
    /// Fraction of a target's width, at its left and at its right, that
    /// selects placing beside it. Only consulted in the middle vertical band.
    #[serde(default = "default_horizontal_band")]
    pub horizontal_band: f64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct RowSettings {
    /// Maximum number of components grouped side by side in one row.
    #[serde(default = "default_max_row_children")]
    pub max_children: usize,
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            vertical_band: default_vertical_band(),
            horizontal_band: default_horizontal_band(),
        }
    }
}

impl Default for RowSettings {
    fn default() -> Self { Self { max_children: default_max_row_children() } }
}

fn default_vertical_band() -> f64 { 0.3 }

fn default_horizontal_band() -> f64 { 0.25 }

fn default_max_row_children() -> usize { DEFAULT_MAX_ROW_CHILDREN }

impl PlacementSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, value) in [
            ("vertical_band", self.vertical_band),
            ("horizontal_band", self.horizontal_band),
        ] {
            if !(value > 0.0 && value < 0.5) {
                issues.push(format!("placement.{name} must be between 0 and 0.5, got {value}"));
            }
        }

        issues
    }

    /// Replaces every band outside (0, 0.5) with its default.
    pub fn sanitized(self) -> Self {
        let band = |value: f64, default: f64| if value > 0.0 && value < 0.5 { value } else { default };
        Self {
            vertical_band: band(self.vertical_band, default_vertical_band()),
            horizontal_band: band(self.horizontal_band, default_horizontal_band()),
        }
    }
}

impl RowSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.max_children < 2 {
            issues.push(format!(
                "rows.max_children must be at least 2, got {}",
                self.max_children
            ));
        }

        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> { Ok(toml::from_str(buf)?) }

    /// Reads `path` when it exists, otherwise falls back to the defaults.
    pub fn read_or_default(path: Option<&Path>) -> anyhow::Result<Config> {
        match path {
            Some(path) if path.exists() => Self::read(path),
            _ => Ok(Config::default()),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.placement.validate());
        issues.extend(self.rows.validate());
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_defaults_match_code_defaults() {
        let shipped = Config::parse(include_str!("../../form-canvas.default.toml")).unwrap();
        assert_eq!(Config::default(), shipped);
        assert!(shipped.validate().is_empty());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let config = Config::parse("[rows]\nmax_children = 3\n").unwrap();
        assert_eq!(3, config.rows.max_children);
        assert_eq!(PlacementSettings::default(), config.placement);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("[rows]\nmax_kids = 3\n").is_err());
        assert!(Config::parse("[grid]\n").is_err());
    }

    #[test]
    fn validation_reports_every_issue() {
        let config = Config {
            placement: PlacementSettings { vertical_band: 0.5, horizontal_band: 0.0 },
            rows: RowSettings { max_children: 1 },
        };
        let issues = config.validate();
        assert_eq!(3, issues.len(), "{issues:?}");
        assert!(issues[0].contains("vertical_band"));
        assert!(issues[1].contains("horizontal_band"));
        assert!(issues[2].contains("max_children"));
    }

    #[test]
    fn nan_band_is_invalid() {
        let placement = PlacementSettings { vertical_band: f64::NAN, ..Default::default() };
        assert_eq!(1, placement.validate().len());
    }

    #[test]
    fn sanitized_keeps_valid_bands_only() {
        let placement = PlacementSettings { vertical_band: 0.6, horizontal_band: 0.1 };
        assert_eq!(
            PlacementSettings { vertical_band: 0.3, horizontal_band: 0.1 },
            placement.sanitized()
        );
        let placement = PlacementSettings { vertical_band: 0.2, horizontal_band: f64::NAN };
        assert_eq!(
            PlacementSettings { vertical_band: 0.2, horizontal_band: 0.25 },
            placement.sanitized()
        );
        assert_eq!(PlacementSettings::default(), PlacementSettings::default().sanitized());
    }

    #[test]
    fn save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config {
            rows: RowSettings { max_children: 6 },
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(config, Config::read(&path).unwrap());
    }

    #[test]
    fn read_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert_eq!(Config::default(), Config::read_or_default(Some(&missing)).unwrap());
        assert_eq!(Config::default(), Config::read_or_default(None).unwrap());
    }
}
