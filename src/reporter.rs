use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{
    engine::{AppliedMigration, ConversionResult},
    graph::ConversionPath,
    migration::Direction,
    version_tag::VersionTag,
};

/// Renders conversion reports in various formats.
pub struct ConversionReporter {
    output_format: ReportFormat,
}

/// Available output formats for conversion reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Console,
    Json,
    Yaml,
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(ReportFormat::Console),
            "json" => Ok(ReportFormat::Json),
            "yaml" | "yml" => Ok(ReportFormat::Yaml),
            other => Err(ReportError::FormatError(format!("unknown report format: {}", other))),
        }
    }
}

/// What a conversion did, or would do when built from a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionReport {
    pub source_version: VersionTag,
    pub target_version: VersionTag,
    pub executed: bool,
    pub steps: Vec<AppliedMigration>,
    pub summary: ConversionSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub total_steps: usize,
    pub constructed: usize,
    pub converted: usize,
}

impl ConversionReporter {
    pub fn new() -> Self {
        Self {
            output_format: ReportFormat::Console,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Report for a conversion that already ran.
    pub fn generate_report(&self, result: &ConversionResult) -> ConversionReport {
        ConversionReport {
            source_version: result.source_version.clone(),
            target_version: result.target_version.clone(),
            executed: true,
            summary: self.create_summary(&result.applied_migrations),
            steps: result.applied_migrations.clone(),
        }
    }

    /// Report for a path that has not been executed.
    pub fn generate_plan_report(&self, path: &ConversionPath) -> ConversionReport {
        let steps: Vec<AppliedMigration> = path
            .iter()
            .map(|edge| AppliedMigration {
                method: edge.method().to_string(),
                direction: edge.direction,
                source_version: edge.source.clone(),
                target_version: edge.target.clone(),
            })
            .collect();

        ConversionReport {
            source_version: path.from.clone(),
            target_version: path.to.clone(),
            executed: false,
            summary: self.create_summary(&steps),
            steps,
        }
    }

    /// Format the report according to the configured output format
    pub fn format_report(&self, report: &ConversionReport) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => Ok(self.format_console_report(report)),
            ReportFormat::Json => serde_json::to_string_pretty(report)
                .map_err(|e| ReportError::SerializationError(e.to_string())),
            ReportFormat::Yaml => serde_yaml::to_string(report)
                .map_err(|e| ReportError::SerializationError(e.to_string())),
        }
    }

    fn create_summary(&self, steps: &[AppliedMigration]) -> ConversionSummary {
        let mut summary = ConversionSummary {
            total_steps: steps.len(),
            ..Default::default()
        };

        for step in steps {
            match step.direction {
                Direction::From => summary.constructed += 1,
                Direction::To => summary.converted += 1,
            }
        }

        summary
    }

    fn format_console_report(&self, report: &ConversionReport) -> String {
        let mut output = String::new();

        let title = if report.executed { "Conversion Report" } else { "Conversion Plan" };
        output.push_str(&format!("=== {} ===\n\n", title));
        output.push_str(&format!("Source Version: {}\n", report.source_version));
        output.push_str(&format!("Target Version: {}\n", report.target_version));
        output.push_str(&format!("Steps: {}\n", report.summary.total_steps));

        if report.steps.is_empty() {
            output.push_str("  ℹ Already at target version\n");
        }
        for step in &report.steps {
            output.push_str(&format!(
                "  ✓ {} → {} ({} {})\n",
                step.source_version, step.target_version, step.method, step.direction
            ));
        }

        output
    }
}

impl Default for ConversionReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Format error: {0}")]
    FormatError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ConversionReport {
        let reporter = ConversionReporter::new();
        let steps = vec![
            AppliedMigration {
                method: "toV2".to_string(),
                direction: Direction::To,
                source_version: VersionTag::new("vnd.test.v1"),
                target_version: VersionTag::new("vnd.test.v2"),
            },
            AppliedMigration {
                method: "fromV2".to_string(),
                direction: Direction::From,
                source_version: VersionTag::new("vnd.test.v2"),
                target_version: VersionTag::new("vnd.test.v3"),
            },
        ];

        ConversionReport {
            source_version: VersionTag::new("vnd.test.v1"),
            target_version: VersionTag::new("vnd.test.v3"),
            executed: true,
            summary: reporter.create_summary(&steps),
            steps,
        }
    }

    #[test]
    fn test_reporter_with_format() {
        let reporter = ConversionReporter::new().with_format(ReportFormat::Json);
        assert_eq!(reporter.output_format, ReportFormat::Json);
        assert_eq!("YAML".parse::<ReportFormat>().unwrap(), ReportFormat::Yaml);
        assert!("html".parse::<ReportFormat>().is_err());
    }

    #[test]
    fn test_summary_counts_directions() {
        let report = report();
        assert_eq!(
            report.summary,
            ConversionSummary {
                total_steps: 2,
                constructed: 1,
                converted: 1,
            }
        );
    }

    #[test]
    fn test_format_console_report() {
        let formatted = ConversionReporter::new().format_report(&report()).unwrap();
        assert!(formatted.contains("=== Conversion Report ==="));
        assert!(formatted.contains("vnd.test.v1 → vnd.test.v2 (toV2 to)"));
        assert!(formatted.contains("Steps: 2"));
    }

    #[test]
    fn test_format_json_and_yaml_reports() {
        let json = ConversionReporter::new()
            .with_format(ReportFormat::Json)
            .format_report(&report())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["steps"][1]["direction"], "from");
        assert_eq!(value["target_version"], "vnd.test.v3");

        let yaml = ConversionReporter::new()
            .with_format(ReportFormat::Yaml)
            .format_report(&report())
            .unwrap();
        let parsed: ConversionReport = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.steps.len(), 2);
    }

    #[test]
    fn test_plan_report_for_identity_path() {
        let path = ConversionPath::identity(VersionTag::new("vnd.test.v1"));
        let report = ConversionReporter::new().generate_plan_report(&path);

        assert!(!report.executed);
        assert_eq!(report.summary.total_steps, 0);
        let formatted = ConversionReporter::new().format_report(&report).unwrap();
        assert!(formatted.contains("Conversion Plan"));
        assert!(formatted.contains("Already at target version"));
    }
}
