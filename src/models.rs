//! Data models for the teaching metrics analyzer.
//!
//! This module contains the cleaned record type, the derived metric
//! structures, and the JSON analysis artifact that downstream consumers
//! (report renderer, dashboard) read without recomputing anything.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One cleaned row of the source table.
///
/// Numeric fields never carry a missing state: ingest coerces absent or
/// malformed cells to zero. A row with `hours == 0` contributes no weight
/// to any average but still counts toward distinct class/subject counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TeachingRecord {
    /// Reporting week this row belongs to.
    pub week: NaiveDate,
    /// Class identifier.
    pub class_name: String,
    /// Subject identifier.
    pub subject: String,
    /// Hours taught; the weighting factor for every average.
    pub hours: f64,
    /// Attendance rate as a fraction in [0, 1].
    pub attendance_rate: f64,
    /// Micro-lesson completion rate as a fraction in [0, 1].
    pub micro_completion_rate: f64,
    /// Question-correctness rate as a fraction in [0, 1].
    pub correctness_rate: f64,
}

/// Hours-weighted metrics over one period (the rows sharing a week).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    /// Sum of hours over the period, truncated to whole hours.
    pub total_hours: i64,
    /// Distinct class names in the period.
    pub total_classes: usize,
    /// Distinct subjects in the period.
    pub total_subjects: usize,
    /// Row count.
    pub total_records: usize,
    /// Hours-weighted attendance rate; 0 when the period has no hours.
    pub attendance_rate: f64,
    /// Hours-weighted micro-lesson completion rate.
    pub micro_completion_rate: f64,
    /// Hours-weighted correctness rate.
    pub correctness_rate: f64,
}

/// Weighted aggregate for one class over the current period.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassStats {
    pub name: String,
    pub total_hours: i64,
    pub attendance_rate: f64,
    pub micro_completion_rate: f64,
    pub correctness_rate: f64,
    /// Distinct subjects taught in this class, first-occurrence order,
    /// joined with ", ".
    pub subjects: String,
    pub record_count: usize,
}

/// Weighted aggregate for one subject over the current period.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectStats {
    pub subject: String,
    pub total_hours: i64,
    pub attendance_rate: f64,
    pub correctness_rate: f64,
    /// Distinct classes this subject was taught in.
    pub class_count: usize,
    pub record_count: usize,
}

/// Source file description in the artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub file_name: String,
    /// Row count after cleaning.
    pub total_records: usize,
    pub date_range: DateRange,
}

/// Inclusive span of weeks present in the cleaned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// The latest week and its metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeek {
    pub date: NaiveDate,
    /// None when the period has no rows; consumers must branch on it.
    pub metrics: Option<PeriodMetrics>,
}

/// Artifact entry for the class with the highest composite score.
///
/// Presence is explicit: `name` is `None` when the current period has no
/// class groups, and the remaining fields hold zero defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestClass {
    pub name: Option<String>,
    pub hours: i64,
    pub attendance_rate: f64,
    pub correctness_rate: f64,
    pub subjects: String,
}

impl BestClass {
    /// Zeroed entry for a week with no class groups.
    pub fn absent() -> Self {
        Self {
            name: None,
            hours: 0,
            attendance_rate: 0.0,
            correctness_rate: 0.0,
            subjects: String::new(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.name.is_some()
    }
}

/// Artifact entry for the first class with above-average attendance but
/// below-average correctness. Absence is a valid, non-error outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusClass {
    pub name: Option<String>,
    pub attendance_rate: f64,
    pub correctness_rate: f64,
    pub subjects: String,
}

impl FocusClass {
    /// Entry for a week in which no class met the dual threshold.
    pub fn absent() -> Self {
        Self {
            name: None,
            attendance_rate: 0.0,
            correctness_rate: 0.0,
            subjects: String::new(),
        }
    }

    pub fn is_present(&self) -> bool {
        self.name.is_some()
    }
}

/// Artifact entry for one of the highest-hours subjects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSubject {
    pub subject: String,
    pub total_hours: i64,
    pub correctness_rate: f64,
    pub class_count: usize,
}

/// Reduced per-week metrics for the trend sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub week: NaiveDate,
    pub total_hours: i64,
    pub attendance_rate: f64,
    pub correctness_rate: f64,
    pub class_count: usize,
}

/// The complete analysis result, snapshotted to JSON.
///
/// This is the sole contract between the aggregator and its consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_info: FileInfo,
    pub current_week: CurrentWeek,
    pub best_class: BestClass,
    pub focus_class: FocusClass,
    pub top_subjects: Vec<TopSubject>,
    /// One entry per distinct week, ascending.
    pub weekly_trends: Vec<TrendPoint>,
    pub analysis_time: String,
}
