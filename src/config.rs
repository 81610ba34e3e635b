//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.classpulse.toml` files. Column headers and composite-score weights
//! are site configuration, not code.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Source column header names.
    #[serde(default)]
    pub columns: ColumnConfig,

    /// Composite-score weights for class ranking.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Header names of the seven semantic columns in the source CSV.
///
/// Exports from school information systems carry locale-specific headers;
/// remap them here rather than renaming columns in the spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    #[serde(default = "default_week_column")]
    pub week: String,

    #[serde(default = "default_class_column")]
    pub class_name: String,

    #[serde(default = "default_subject_column")]
    pub subject: String,

    #[serde(default = "default_hours_column")]
    pub hours: String,

    #[serde(default = "default_attendance_column")]
    pub attendance_rate: String,

    #[serde(default = "default_micro_completion_column")]
    pub micro_completion_rate: String,

    #[serde(default = "default_correctness_column")]
    pub correctness_rate: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            week: default_week_column(),
            class_name: default_class_column(),
            subject: default_subject_column(),
            hours: default_hours_column(),
            attendance_rate: default_attendance_column(),
            micro_completion_rate: default_micro_completion_column(),
            correctness_rate: default_correctness_column(),
        }
    }
}

fn default_week_column() -> String {
    "week".to_string()
}

fn default_class_column() -> String {
    "class_name".to_string()
}

fn default_subject_column() -> String {
    "subject".to_string()
}

fn default_hours_column() -> String {
    "hours".to_string()
}

fn default_attendance_column() -> String {
    "attendance_rate".to_string()
}

fn default_micro_completion_column() -> String {
    "micro_completion_rate".to_string()
}

fn default_correctness_column() -> String {
    "correctness_rate".to_string()
}

/// Weights of the composite score used to rank classes.
///
/// The weights are not normalized; the defaults sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_attendance_weight")]
    pub attendance_weight: f64,

    #[serde(default = "default_micro_completion_weight")]
    pub micro_completion_weight: f64,

    #[serde(default = "default_correctness_weight")]
    pub correctness_weight: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            attendance_weight: default_attendance_weight(),
            micro_completion_weight: default_micro_completion_weight(),
            correctness_weight: default_correctness_weight(),
        }
    }
}

fn default_attendance_weight() -> f64 {
    0.3
}

fn default_micro_completion_weight() -> f64 {
    0.3
}

fn default_correctness_weight() -> f64 {
    0.4
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// How many subjects the top-subjects ranking keeps.
    #[serde(default = "default_top_subjects")]
    pub top_subjects: usize,

    /// Include the historical trend section in the Markdown report.
    #[serde(default = "default_true")]
    pub include_trends: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_subjects: default_top_subjects(),
            include_trends: true,
        }
    }
}

fn default_top_subjects() -> usize {
    5
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".classpulse.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(top_subjects) = args.top_subjects {
            self.report.top_subjects = top_subjects;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.columns.week, "week");
        assert_eq!(config.columns.correctness_rate, "correctness_rate");
        assert_eq!(config.scoring.attendance_weight, 0.3);
        assert_eq!(config.scoring.micro_completion_weight, 0.3);
        assert_eq!(config.scoring.correctness_weight, 0.4);
        assert_eq!(config.report.top_subjects, 5);
        assert!(config.report.include_trends);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[columns]
week = "周"
class_name = "班级名称"
subject = "课时学科"
hours = "课时数"
attendance_rate = "课时平均出勤率"
micro_completion_rate = "微课完成率"
correctness_rate = "题目正确率（自学+快背）"

[scoring]
correctness_weight = 0.5

[report]
top_subjects = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.columns.week, "周");
        assert_eq!(config.columns.hours, "课时数");
        // Unset weights keep their defaults
        assert_eq!(config.scoring.attendance_weight, 0.3);
        assert_eq!(config.scoring.correctness_weight, 0.5);
        assert_eq!(config.report.top_subjects, 3);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[columns]"));
        assert!(toml_str.contains("[scoring]"));
        assert!(toml_str.contains("[report]"));
    }
}
