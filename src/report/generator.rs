//! Report generation.
//!
//! Renders the analysis artifact as a Markdown narrative and serializes
//! the JSON snapshot. Both outputs are pure views over [`AnalysisResult`]:
//! no rates are recomputed here.

use anyhow::Result;
use std::io::Write;
use std::path::Path;

use crate::analysis::max_by_score;
use crate::config::ReportConfig;
use crate::models::{AnalysisResult, CurrentWeek, TopSubject, TrendPoint};

/// Generate the complete Markdown report.
pub fn generate_markdown_report(result: &AnalysisResult, config: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# Classroom Teaching Analysis Report\n\n");

    output.push_str(&generate_header_section(result));
    output.push_str(&generate_current_week_section(&result.current_week));
    output.push_str(&generate_week_over_week_section(&result.weekly_trends));
    output.push_str(&generate_class_section(result));
    output.push_str(&generate_subject_section(&result.top_subjects));

    if config.include_trends {
        output.push_str(&generate_trend_section(&result.weekly_trends));
    }

    output.push_str(&generate_footer());

    output
}

/// Format a fraction as a percentage with one decimal.
fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Relative change between two values with a trend arrow; "n/a" when the
/// previous value is zero.
fn change_cell(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        return "n/a".to_string();
    }
    let change = (current - previous) / previous * 100.0;
    let arrow = if change > 0.0 {
        "↑"
    } else if change < 0.0 {
        "↓"
    } else {
        "→"
    };
    format!("{} {:.1}%", arrow, change.abs())
}

fn generate_header_section(result: &AnalysisResult) -> String {
    let mut section = String::new();
    let info = &result.file_info;

    section.push_str(&format!("**Generated:** {}\n", result.analysis_time));
    section.push_str(&format!("**Source:** {}\n", info.file_name));
    section.push_str(&format!(
        "**Data range:** {} to {}\n",
        info.date_range.start, info.date_range.end
    ));
    section.push_str(&format!("**Records analyzed:** {}\n\n", info.total_records));

    section
}

fn generate_current_week_section(current_week: &CurrentWeek) -> String {
    let mut section = String::new();

    section.push_str(&format!("## Current Week ({})\n\n", current_week.date));

    let Some(ref metrics) = current_week.metrics else {
        section.push_str("No records for the current week.\n\n");
        return section;
    };

    section.push_str(&format!("- **Total hours:** {}\n", metrics.total_hours));
    section.push_str(&format!("- **Classes:** {}\n", metrics.total_classes));
    section.push_str(&format!("- **Subjects:** {}\n", metrics.total_subjects));
    section.push_str(&format!(
        "- **Attendance rate:** {}\n",
        pct(metrics.attendance_rate)
    ));
    section.push_str(&format!(
        "- **Micro-lesson completion:** {}\n",
        pct(metrics.micro_completion_rate)
    ));
    section.push_str(&format!(
        "- **Correctness rate:** {}\n\n",
        pct(metrics.correctness_rate)
    ));

    section
}

/// Change table derived from the last two trend points.
fn generate_week_over_week_section(trends: &[TrendPoint]) -> String {
    let [.., previous, current] = trends else {
        return String::new();
    };

    let mut section = String::new();

    section.push_str("### Week-over-Week Change\n\n");
    section.push_str("| Metric | Previous | Current | Change |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| Total hours | {} | {} | {} |\n",
        previous.total_hours,
        current.total_hours,
        change_cell(current.total_hours as f64, previous.total_hours as f64)
    ));
    section.push_str(&format!(
        "| Attendance rate | {} | {} | {} |\n",
        pct(previous.attendance_rate),
        pct(current.attendance_rate),
        change_cell(current.attendance_rate, previous.attendance_rate)
    ));
    section.push_str(&format!(
        "| Correctness rate | {} | {} | {} |\n\n",
        pct(previous.correctness_rate),
        pct(current.correctness_rate),
        change_cell(current.correctness_rate, previous.correctness_rate)
    ));

    section
}

fn generate_class_section(result: &AnalysisResult) -> String {
    let mut section = String::new();

    section.push_str("## Class Performance\n\n");

    section.push_str("### Top Class\n\n");
    match result.best_class.name {
        Some(ref name) => {
            let best = &result.best_class;
            section.push_str(&format!("**{}** leads the composite ranking:\n\n", name));
            section.push_str(&format!("- Total hours: {}\n", best.hours));
            section.push_str(&format!("- Attendance rate: {}\n", pct(best.attendance_rate)));
            section.push_str(&format!(
                "- Correctness rate: {}\n",
                pct(best.correctness_rate)
            ));
            section.push_str(&format!("- Subjects: {}\n\n", best.subjects));
        }
        None => {
            section.push_str("No class groups in the current week.\n\n");
        }
    }

    section.push_str("### Focus Class\n\n");
    match result.focus_class.name {
        Some(ref name) => {
            let focus = &result.focus_class;
            section.push_str(&format!("**{}** needs attention:\n\n", name));
            match result.current_week.metrics {
                Some(ref metrics) => {
                    section.push_str(&format!(
                        "- Attendance rate: {} (above the week's {})\n",
                        pct(focus.attendance_rate),
                        pct(metrics.attendance_rate)
                    ));
                    section.push_str(&format!(
                        "- Correctness rate: {} (below the week's {})\n",
                        pct(focus.correctness_rate),
                        pct(metrics.correctness_rate)
                    ));
                }
                None => {
                    section.push_str(&format!(
                        "- Attendance rate: {}\n",
                        pct(focus.attendance_rate)
                    ));
                    section.push_str(&format!(
                        "- Correctness rate: {}\n",
                        pct(focus.correctness_rate)
                    ));
                }
            }
            section.push_str(&format!("- Subjects: {}\n\n", focus.subjects));
            section.push_str(
                "Students show up but results lag; review teaching methods and learning state for this class.\n\n",
            );
        }
        None => {
            section.push_str("No class flagged for follow-up this week.\n\n");
        }
    }

    section
}

fn generate_subject_section(top_subjects: &[TopSubject]) -> String {
    if top_subjects.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Subject Performance\n\n");
    section.push_str(&format!(
        "### Top {} Subjects by Hours\n\n",
        top_subjects.len()
    ));
    section.push_str("| Subject | Hours | Correctness | Classes |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for subject in top_subjects {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            subject.subject,
            subject.total_hours,
            pct(subject.correctness_rate),
            subject.class_count
        ));
    }
    section.push('\n');

    // Highlights only make sense with at least two scored subjects
    let scored: Vec<&TopSubject> = top_subjects
        .iter()
        .filter(|s| s.correctness_rate > 0.0)
        .collect();
    if scored.len() >= 2 {
        let best = max_by_score(&scored, |s| s.correctness_rate);
        let worst = max_by_score(&scored, |s| -s.correctness_rate);
        if let (Some(best), Some(worst)) = (best, worst) {
            section.push_str("### Highlights\n\n");
            section.push_str(&format!(
                "- **Strongest subject:** {} at {} correctness\n",
                best.subject,
                pct(best.correctness_rate)
            ));
            section.push_str(&format!(
                "- **Weakest subject:** {} at {} correctness\n\n",
                worst.subject,
                pct(worst.correctness_rate)
            ));
        }
    }

    section
}

fn generate_trend_section(trends: &[TrendPoint]) -> String {
    let [first, .., last] = trends else {
        return String::new();
    };

    let mut section = String::new();

    section.push_str(&format!("## Historical Trend ({} weeks)\n\n", trends.len()));
    section.push_str(&format!("- **Span:** {} to {}\n", first.week, last.week));
    section.push_str(&format!(
        "- **Total hours:** {} to {} ({})\n",
        first.total_hours,
        last.total_hours,
        change_cell(last.total_hours as f64, first.total_hours as f64)
    ));
    section.push_str(&format!(
        "- **Attendance rate:** {} to {} ({})\n",
        pct(first.attendance_rate),
        pct(last.attendance_rate),
        change_cell(last.attendance_rate, first.attendance_rate)
    ));
    section.push_str(&format!(
        "- **Correctness rate:** {} to {} ({})\n\n",
        pct(first.correctness_rate),
        pct(last.correctness_rate),
        change_cell(last.correctness_rate, first.correctness_rate)
    ));

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by ClassPulse*\n".to_string()
}

/// Serialize the analysis artifact.
pub fn generate_json_artifact(result: &AnalysisResult) -> Result<String> {
    serde_json::to_string_pretty(result).map_err(Into::into)
}

/// Write the Markdown report to a file.
pub fn write_markdown_report(
    result: &AnalysisResult,
    config: &ReportConfig,
    path: &Path,
) -> Result<()> {
    let content = generate_markdown_report(result, config);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// Write the JSON artifact to a file.
pub fn write_json_artifact(result: &AnalysisResult, path: &Path) -> Result<()> {
    let content = generate_json_artifact(result)?;

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BestClass, CurrentWeek, DateRange, FileInfo, FocusClass, PeriodMetrics,
    };
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_result() -> AnalysisResult {
        AnalysisResult {
            file_info: FileInfo {
                file_name: "records.csv".to_string(),
                total_records: 12,
                date_range: DateRange {
                    start: date(2025, 9, 1),
                    end: date(2025, 9, 8),
                },
            },
            current_week: CurrentWeek {
                date: date(2025, 9, 8),
                metrics: Some(PeriodMetrics {
                    total_hours: 64,
                    total_classes: 4,
                    total_subjects: 5,
                    total_records: 8,
                    attendance_rate: 0.88,
                    micro_completion_rate: 0.52,
                    correctness_rate: 0.31,
                }),
            },
            best_class: BestClass {
                name: Some("Grade 1 Class 2".to_string()),
                hours: 20,
                attendance_rate: 0.95,
                correctness_rate: 0.45,
                subjects: "Math, English".to_string(),
            },
            focus_class: FocusClass {
                name: Some("Grade 1 Class 4".to_string()),
                attendance_rate: 0.92,
                correctness_rate: 0.12,
                subjects: "Physics".to_string(),
            },
            top_subjects: vec![
                TopSubject {
                    subject: "Math".to_string(),
                    total_hours: 22,
                    correctness_rate: 0.42,
                    class_count: 4,
                },
                TopSubject {
                    subject: "Physics".to_string(),
                    total_hours: 18,
                    correctness_rate: 0.18,
                    class_count: 3,
                },
            ],
            weekly_trends: vec![
                TrendPoint {
                    week: date(2025, 9, 1),
                    total_hours: 50,
                    attendance_rate: 0.85,
                    correctness_rate: 0.28,
                    class_count: 4,
                },
                TrendPoint {
                    week: date(2025, 9, 8),
                    total_hours: 64,
                    attendance_rate: 0.88,
                    correctness_rate: 0.31,
                    class_count: 4,
                },
            ],
            analysis_time: "2025-09-09 07:00:00".to_string(),
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let result = create_test_result();
        let markdown = generate_markdown_report(&result, &ReportConfig::default());

        assert!(markdown.contains("# Classroom Teaching Analysis Report"));
        assert!(markdown.contains("## Current Week (2025-09-08)"));
        assert!(markdown.contains("### Week-over-Week Change"));
        assert!(markdown.contains("Grade 1 Class 2"));
        assert!(markdown.contains("Grade 1 Class 4"));
        assert!(markdown.contains("## Subject Performance"));
        assert!(markdown.contains("**Strongest subject:** Math"));
        assert!(markdown.contains("**Weakest subject:** Physics"));
        assert!(markdown.contains("## Historical Trend (2 weeks)"));
    }

    #[test]
    fn test_absent_entities_render_fallback_text() {
        let mut result = create_test_result();
        result.best_class = BestClass::absent();
        result.focus_class = FocusClass::absent();
        result.weekly_trends.truncate(1);

        let markdown = generate_markdown_report(&result, &ReportConfig::default());

        assert!(markdown.contains("No class groups in the current week."));
        assert!(markdown.contains("No class flagged for follow-up this week."));
        assert!(!markdown.contains("### Week-over-Week Change"));
        assert!(!markdown.contains("## Historical Trend"));
    }

    #[test]
    fn test_trend_section_respects_config() {
        let result = create_test_result();
        let config = ReportConfig {
            include_trends: false,
            ..ReportConfig::default()
        };

        let markdown = generate_markdown_report(&result, &config);
        assert!(!markdown.contains("## Historical Trend"));
    }

    #[test]
    fn test_change_cell_guards_zero_previous() {
        assert_eq!(change_cell(0.5, 0.0), "n/a");
        assert!(change_cell(0.6, 0.5).starts_with('↑'));
        assert!(change_cell(0.4, 0.5).starts_with('↓'));
        assert!(change_cell(0.5, 0.5).starts_with('→'));
    }

    #[test]
    fn test_generate_json_artifact() {
        let result = create_test_result();
        let json = generate_json_artifact(&result).unwrap();

        assert!(json.contains("\"file_info\""));
        assert!(json.contains("\"best_class\""));
        assert!(json.contains("\"weekly_trends\""));
        assert!(json.contains("\"analysis_time\""));
    }

    #[test]
    fn test_highlights_skip_unscored_subjects() {
        let mut result = create_test_result();
        for subject in &mut result.top_subjects {
            subject.correctness_rate = 0.0;
        }

        let markdown = generate_markdown_report(&result, &ReportConfig::default());
        assert!(!markdown.contains("### Highlights"));
    }
}
