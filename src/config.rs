// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Runtime settings.
//!
//! Settings come from built-in defaults, optionally overridden by a YAML
//! file, optionally overridden again by command line flags.

use crate::engine::session::StrokeRange;
use crate::error::{ScoreError, ScoreResult};
use crate::models::color::Color;
use crate::models::layer::AuthorId;
use crate::util::geometry::Size;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Command line arguments.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "scoremark", version, about = "Annotate scanned music scores in layers")]
pub struct Cli {
    /// Score image to open on startup
    pub image: Option<PathBuf>,

    /// YAML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Layer store file (.yaml, .yml or .json)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Author id used when committing layers
    #[arg(long)]
    pub author: Option<u64>,

    /// Viewport budget as WIDTHxHEIGHT, e.g. 800x600
    #[arg(long, value_parser = parse_budget)]
    pub budget: Option<Size>,
}

/// Parse `WIDTHxHEIGHT` into a size.
pub fn parse_budget(raw: &str) -> Result<Size, String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{raw}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid dimension `{v}`: {e}"))
    };
    Size::new(parse(w)?, parse(h)?)
        .validate("viewport budget")
        .map_err(|e| e.to_string())
}

/// Application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
    /// Largest surface the score is shrunk to fit.
    pub viewport_budget: Size,
    pub default_color: Color,
    pub default_stroke_width: f64,
    pub min_stroke_width: f64,
    pub max_stroke_width: f64,
    /// File-backed layer store; in-memory when unset.
    pub store_path: Option<PathBuf>,
    pub author: AuthorId,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            viewport_budget: Size::new(800.0, 600.0),
            default_color: Color::RED,
            default_stroke_width: 2.0,
            min_stroke_width: 1.0,
            max_stroke_width: 10.0,
            store_path: None,
            author: AuthorId(1),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> ScoreResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&yaml)?;
        settings.validate()
    }

    /// Defaults, then the `--config` file, then the remaining flags.
    pub fn resolve(cli: &Cli) -> ScoreResult<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(store) = &cli.store {
            settings.store_path = Some(store.clone());
        }
        if let Some(author) = cli.author {
            settings.author = AuthorId(author);
        }
        if let Some(budget) = cli.budget {
            settings.viewport_budget = budget;
        }
        settings.validate()
    }

    fn validate(self) -> ScoreResult<Self> {
        self.viewport_budget.validate("viewport budget")?;
        let range_ok = self.min_stroke_width.is_finite()
            && self.max_stroke_width.is_finite()
            && 0.0 < self.min_stroke_width
            && self.min_stroke_width <= self.max_stroke_width;
        if !range_ok {
            return Err(ScoreError::invalid_geometry(format!(
                "stroke width range {}..={} is invalid",
                self.min_stroke_width, self.max_stroke_width
            )));
        }
        Ok(self)
    }

    pub fn stroke_range(&self) -> StrokeRange {
        StrokeRange {
            min: self.min_stroke_width,
            max: self.max_stroke_width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_viewer() {
        let settings = Settings::default();
        assert_eq!(settings.viewport_budget, Size::new(800.0, 600.0));
        assert_eq!(settings.default_color, Color::RED);
        assert_eq!(settings.stroke_range(), StrokeRange { min: 1.0, max: 10.0 });
    }

    #[test]
    fn test_parse_budget() {
        assert_eq!(parse_budget("1024x768").unwrap(), Size::new(1024.0, 768.0));
        assert_eq!(parse_budget("640X480").unwrap(), Size::new(640.0, 480.0));
        assert!(parse_budget("1024").is_err());
        assert!(parse_budget("0x768").is_err());
        assert!(parse_budget("axb").is_err());
    }

    #[test]
    fn test_yaml_overrides_some_keys() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "default_color: \"#0000ff\"\nauthor: 9").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.default_color, Color::rgb(0, 0, 255));
        assert_eq!(settings.author, AuthorId(9));
        assert_eq!(settings.viewport_budget, Size::new(800.0, 600.0));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "author: 9\nstore_path: from-file.yaml").unwrap();

        let cli = Cli::try_parse_from([
            "scoremark",
            "score.png",
            "--config",
            file.path().to_str().unwrap(),
            "--author",
            "4",
            "--budget",
            "1200x900",
        ])
        .unwrap();
        let settings = Settings::resolve(&cli).unwrap();

        assert_eq!(cli.image, Some(PathBuf::from("score.png")));
        assert_eq!(settings.author, AuthorId(4));
        assert_eq!(settings.viewport_budget, Size::new(1200.0, 900.0));
        assert_eq!(settings.store_path, Some(PathBuf::from("from-file.yaml")));
    }

    #[test]
    fn test_rejects_inverted_stroke_range() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "min_stroke_width: 5\nmax_stroke_width: 2").unwrap();
        assert!(matches!(
            Settings::load(file.path()),
            Err(ScoreError::InvalidGeometry(_))
        ));
    }
}
