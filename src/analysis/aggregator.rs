//! Metric aggregation over cleaned teaching records.
//!
//! Everything here is built on one primitive: the hours-weighted average.
//! Groups are partitioned in ascending key order so extremum selections
//! are deterministic, with ties resolved to the first occurrence.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Utc};

use crate::config::ScoringConfig;
use crate::error::AnalysisError;
use crate::models::{
    AnalysisResult, BestClass, ClassStats, CurrentWeek, DateRange, FileInfo, FocusClass,
    PeriodMetrics, SubjectStats, TeachingRecord, TopSubject, TrendPoint,
};

/// Timestamp format of the `analysis_time` artifact field.
const ANALYSIS_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Hours-weighted average of a per-row value: Σ(value·hours) / Σ(hours).
///
/// Exactly 0 when the rows carry no hours, so zero-weight periods never
/// divide by zero.
pub fn weighted_average<F>(rows: &[&TeachingRecord], value: F) -> f64
where
    F: Fn(&TeachingRecord) -> f64,
{
    let total_weight: f64 = rows.iter().map(|r| r.hours).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    let weighted_sum: f64 = rows.iter().map(|&r| value(r) * r.hours).sum();
    weighted_sum / total_weight
}

/// Metrics over one period's rows. None for an empty period; callers must
/// branch on presence before formatting.
pub fn period_metrics(rows: &[&TeachingRecord]) -> Option<PeriodMetrics> {
    if rows.is_empty() {
        return None;
    }

    let classes: BTreeSet<&str> = rows.iter().map(|r| r.class_name.as_str()).collect();
    let subjects: BTreeSet<&str> = rows.iter().map(|r| r.subject.as_str()).collect();

    Some(PeriodMetrics {
        total_hours: rows.iter().map(|r| r.hours).sum::<f64>() as i64,
        total_classes: classes.len(),
        total_subjects: subjects.len(),
        total_records: rows.len(),
        attendance_rate: weighted_average(rows, |r| r.attendance_rate),
        micro_completion_rate: weighted_average(rows, |r| r.micro_completion_rate),
        correctness_rate: weighted_average(rows, |r| r.correctness_rate),
    })
}

/// The current (latest-week) and previous (next-latest-week) row sets.
#[derive(Debug)]
pub struct Periods<'a> {
    pub current_week: NaiveDate,
    pub current: Vec<&'a TeachingRecord>,
    pub previous_week: Option<NaiveDate>,
    /// Empty when the dataset holds a single week.
    pub previous: Vec<&'a TeachingRecord>,
}

/// Split records into the current and previous periods. None when there are
/// no records at all.
pub fn split_periods(records: &[TeachingRecord]) -> Option<Periods<'_>> {
    let current_week = records.iter().map(|r| r.week).max()?;
    let previous_week = records
        .iter()
        .map(|r| r.week)
        .filter(|w| *w < current_week)
        .max();

    let current = records.iter().filter(|r| r.week == current_week).collect();
    let previous = match previous_week {
        Some(week) => records.iter().filter(|r| r.week == week).collect(),
        None => Vec::new(),
    };

    Some(Periods {
        current_week,
        current,
        previous_week,
        previous,
    })
}

/// Partition rows by a key, ascending key order.
fn partition_by<'a, F>(rows: &[&'a TeachingRecord], key: F) -> BTreeMap<String, Vec<&'a TeachingRecord>>
where
    F: Fn(&TeachingRecord) -> &str,
{
    let mut groups: BTreeMap<String, Vec<&'a TeachingRecord>> = BTreeMap::new();
    for &row in rows {
        groups.entry(key(row).to_string()).or_default().push(row);
    }
    groups
}

/// Distinct non-empty values of a field, first-occurrence order, ", "-joined.
fn distinct_joined<'a, F>(rows: &[&'a TeachingRecord], field: F) -> String
where
    F: Fn(&'a TeachingRecord) -> &'a str,
{
    let mut seen: Vec<&str> = Vec::new();
    for &row in rows {
        let value = field(row);
        if !value.is_empty() && !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen.join(", ")
}

/// Per-class weighted aggregates, ascending by class name.
pub fn class_stats(rows: &[&TeachingRecord]) -> Vec<ClassStats> {
    partition_by(rows, |r| &r.class_name)
        .into_iter()
        .map(|(name, group)| ClassStats {
            name,
            total_hours: group.iter().map(|r| r.hours).sum::<f64>() as i64,
            attendance_rate: weighted_average(&group, |r| r.attendance_rate),
            micro_completion_rate: weighted_average(&group, |r| r.micro_completion_rate),
            correctness_rate: weighted_average(&group, |r| r.correctness_rate),
            subjects: distinct_joined(&group, |r| r.subject.as_str()),
            record_count: group.len(),
        })
        .collect()
}

/// Per-subject weighted aggregates, ascending by subject name.
pub fn subject_stats(rows: &[&TeachingRecord]) -> Vec<SubjectStats> {
    partition_by(rows, |r| &r.subject)
        .into_iter()
        .map(|(subject, group)| {
            let classes: BTreeSet<&str> = group.iter().map(|r| r.class_name.as_str()).collect();
            SubjectStats {
                subject,
                total_hours: group.iter().map(|r| r.hours).sum::<f64>() as i64,
                attendance_rate: weighted_average(&group, |r| r.attendance_rate),
                correctness_rate: weighted_average(&group, |r| r.correctness_rate),
                class_count: classes.len(),
                record_count: group.len(),
            }
        })
        .collect()
}

/// First item with the strictly highest score.
///
/// The strict comparison keeps the earliest item on ties, so selection is
/// stable for a fixed input order.
pub fn max_by_score<T, F>(items: &[T], score: F) -> Option<&T>
where
    F: Fn(&T) -> f64,
{
    let mut best: Option<(&T, f64)> = None;
    for item in items {
        let candidate = score(item);
        match best {
            Some((_, current)) if candidate <= current => {}
            _ => best = Some((item, candidate)),
        }
    }
    best.map(|(item, _)| item)
}

/// Composite ranking score for a class.
pub fn composite_score(class: &ClassStats, weights: &ScoringConfig) -> f64 {
    class.attendance_rate * weights.attendance_weight
        + class.micro_completion_rate * weights.micro_completion_weight
        + class.correctness_rate * weights.correctness_weight
}

/// First class (in partition order) with attendance strictly above and
/// correctness strictly below the period averages. A class sitting exactly
/// on either threshold is not flagged.
pub fn focus_class<'a>(
    classes: &'a [ClassStats],
    period: &PeriodMetrics,
) -> Option<&'a ClassStats> {
    classes.iter().find(|c| {
        c.attendance_rate > period.attendance_rate && c.correctness_rate < period.correctness_rate
    })
}

/// Subjects sorted descending by total hours, truncated to `limit`.
///
/// The sort is stable, so equal-hours subjects keep their ascending-name
/// grouping order.
pub fn top_subjects(mut subjects: Vec<SubjectStats>, limit: usize) -> Vec<SubjectStats> {
    subjects.sort_by(|a, b| b.total_hours.cmp(&a.total_hours));
    subjects.truncate(limit);
    subjects
}

/// Period metrics for every distinct week, ascending, projected onto the
/// trend schema.
pub fn weekly_trends(records: &[TeachingRecord]) -> Vec<TrendPoint> {
    let mut by_week: BTreeMap<NaiveDate, Vec<&TeachingRecord>> = BTreeMap::new();
    for record in records {
        by_week.entry(record.week).or_default().push(record);
    }

    by_week
        .into_iter()
        .filter_map(|(week, rows)| {
            period_metrics(&rows).map(|metrics| TrendPoint {
                week,
                total_hours: metrics.total_hours,
                attendance_rate: metrics.attendance_rate,
                correctness_rate: metrics.correctness_rate,
                class_count: metrics.total_classes,
            })
        })
        .collect()
}

/// Run the full aggregation and assemble the analysis artifact.
///
/// Empty groups become explicit defaults (null names, zero rates), never
/// missing fields.
pub fn analyze(
    records: &[TeachingRecord],
    file_name: &str,
    scoring: &ScoringConfig,
    top_limit: usize,
) -> Result<AnalysisResult, AnalysisError> {
    let periods = split_periods(records)
        .ok_or_else(|| AnalysisError::Data("no records to analyze".to_string()))?;

    let current_metrics = period_metrics(&periods.current);
    let classes = class_stats(&periods.current);
    let subjects = subject_stats(&periods.current);

    let best_class = match max_by_score(&classes, |c| composite_score(c, scoring)) {
        Some(class) => BestClass {
            name: Some(class.name.clone()),
            hours: class.total_hours,
            attendance_rate: class.attendance_rate,
            correctness_rate: class.correctness_rate,
            subjects: class.subjects.clone(),
        },
        None => BestClass::absent(),
    };

    let focus_class = match current_metrics
        .as_ref()
        .and_then(|metrics| focus_class(&classes, metrics))
    {
        Some(class) => FocusClass {
            name: Some(class.name.clone()),
            attendance_rate: class.attendance_rate,
            correctness_rate: class.correctness_rate,
            subjects: class.subjects.clone(),
        },
        None => FocusClass::absent(),
    };

    let top_subjects = top_subjects(subjects, top_limit)
        .into_iter()
        .map(|s| TopSubject {
            subject: s.subject,
            total_hours: s.total_hours,
            correctness_rate: s.correctness_rate,
            class_count: s.class_count,
        })
        .collect();

    // Weeks come from the surviving rows, so min/max always exist here.
    let start = records.iter().map(|r| r.week).min().unwrap_or(periods.current_week);
    let end = periods.current_week;

    Ok(AnalysisResult {
        file_info: FileInfo {
            file_name: file_name.to_string(),
            total_records: records.len(),
            date_range: DateRange { start, end },
        },
        current_week: CurrentWeek {
            date: periods.current_week,
            metrics: current_metrics,
        },
        best_class,
        focus_class,
        top_subjects,
        weekly_trends: weekly_trends(records),
        analysis_time: Utc::now().format(ANALYSIS_TIME_FORMAT).to_string(),
    })
}
