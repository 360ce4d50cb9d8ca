//! Configuration Module
//! Analysis settings loaded from an optional JSON file and command-line flags.

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where forward fill looks for the previous value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillScope {
    /// Restart at every location boundary
    #[default]
    PerLocation,
    /// Carry values across the whole table in row order
    Table,
}

/// How rendered figures reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Page through figures in a viewer window
    #[default]
    Window,
    /// Write PNG files only
    Files,
    /// Write PNG files and open each with the system viewer
    #[value(name = "system_viewer", alias = "open")]
    SystemViewer,
}

pub const DEFAULT_INPUT: &str = "owid-covid-data.csv";

pub fn default_countries() -> Vec<String> {
    ["United States", "India", "Kenya"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_iso_codes() -> BTreeMap<String, String> {
    [
        ("United States", "USA"),
        ("India", "IND"),
        ("Kenya", "KEN"),
    ]
    .iter()
    .map(|(name, code)| (name.to_string(), code.to_string()))
    .collect()
}

/// Settings for one analysis run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub input_path: PathBuf,
    /// Locations retained by the cleaner
    pub countries: Vec<String>,
    /// Extra or overriding location → ISO alpha-3 codes for the map
    pub iso_codes: BTreeMap<String, String>,
    pub date_format: String,
    pub sort_before_fill: bool,
    pub fill_scope: FillScope,
    pub preview_rows: usize,
    pub display: DisplayMode,
    pub output_dir: PathBuf,
    pub figure_width: u32,
    pub figure_height: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT),
            countries: default_countries(),
            iso_codes: default_iso_codes(),
            date_format: "%Y-%m-%d".to_string(),
            sort_before_fill: true,
            fill_scope: FillScope::PerLocation,
            preview_rows: 5,
            display: DisplayMode::Window,
            output_dir: PathBuf::from("charts"),
            figure_width: 1000,
            figure_height: 600,
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Parsed command line.
#[derive(Parser, Debug, Default, PartialEq)]
#[command(
    author,
    version,
    about = "COVID-19 CSV Cleaning & Chart Viewer"
)]
pub struct CliArgs {
    /// JSON settings file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Input dataset (default: owid-covid-data.csv)
    #[arg(long, value_name = "CSV")]
    pub input: Option<PathBuf>,
    /// How figures are shown (default: window)
    #[arg(long, value_enum)]
    pub display: Option<DisplayMode>,
    /// Directory for PNG output (default: charts)
    #[arg(long = "output", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl CliArgs {
    /// Build the effective config: file (if any), then flag overrides.
    pub fn resolve(&self) -> Result<AnalysisConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(display) = self.display {
            config.display = display;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(list: &[&str]) -> Result<CliArgs, clap::Error> {
        CliArgs::try_parse_from(std::iter::once("covid_explorer").chain(list.iter().copied()))
    }

    #[test]
    fn test_defaults_match_reference_run() {
        let config = AnalysisConfig::default();
        assert_eq!(config.input_path, PathBuf::from("owid-covid-data.csv"));
        assert_eq!(config.countries, vec!["United States", "India", "Kenya"]);
        assert_eq!(config.iso_codes.get("Kenya").map(String::as_str), Some("KEN"));
        assert_eq!(config.fill_scope, FillScope::PerLocation);
        assert!(config.sort_before_fill);
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse(&["--input", "data.csv", "--display", "files", "--output", "out"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("data.csv")));
        assert_eq!(cli.display, Some(DisplayMode::Files));
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_parse_equals_syntax_and_alias() {
        let cli = parse(&["--input=data.csv", "--display=open"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("data.csv")));
        assert_eq!(cli.display, Some(DisplayMode::SystemViewer));

        let cli = parse(&["--display", "system_viewer"]).unwrap();
        assert_eq!(cli.display, Some(DisplayMode::SystemViewer));
    }

    #[test]
    fn test_help_and_version_are_generated() {
        let help = parse(&["--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
        let version = parse(&["--version"]).unwrap_err();
        assert_eq!(version.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_parse_rejects_unknown_and_incomplete() {
        assert_eq!(
            parse(&["--bogus"]).unwrap_err().kind(),
            clap::error::ErrorKind::UnknownArgument
        );
        assert!(parse(&["--input"]).is_err());
        assert_eq!(
            parse(&["--display", "printer"]).unwrap_err().kind(),
            clap::error::ErrorKind::InvalidValue
        );
    }

    #[test]
    fn test_config_file_with_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "countries": ["France"], "fill_scope": "table", "display": "system_viewer" }}"#
        )
        .unwrap();

        let cli = CliArgs {
            config: Some(file.path().to_path_buf()),
            display: Some(DisplayMode::Files),
            ..Default::default()
        };
        let config = cli.resolve().unwrap();

        assert_eq!(config.countries, vec!["France"]);
        assert_eq!(config.fill_scope, FillScope::Table);
        // flag wins over file
        assert_eq!(config.display, DisplayMode::Files);
        // untouched fields keep defaults
        assert_eq!(config.preview_rows, 5);
    }

    #[test]
    fn test_bad_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            AnalysisConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
