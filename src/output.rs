//! Report rendering
//!
//! Human and summary output are produced one project at a time so a caller
//! can print each block as soon as it is ready. JSON is rendered once, from
//! the whole report.

use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::error::Result;
use crate::report::{EntityReport, EntityStatus, ProjectOutcome, ProjectReport, ValidationReport};
use crate::validator::ValidationResult;

const GREEN: &str = "32";
const RED: &str = "31";

/// Output formatter for validation reports
pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    /// Does this format print project blocks as they complete?
    pub fn streams(&self) -> bool {
        self.format != OutputFormat::Json
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn verdict(&self, passed: bool) -> String {
        if passed {
            self.colorize("PASS", GREEN)
        } else {
            self.colorize("FAIL", RED)
        }
    }

    /// Block for one project; empty for JSON
    pub fn format_project(&self, project: &ProjectReport) -> String {
        match self.format {
            OutputFormat::Json => String::new(),
            OutputFormat::Summary => self.format_project_summary(project),
            OutputFormat::Human if self.verbosity == VerbosityLevel::Quiet => {
                self.format_project_failures(project)
            }
            OutputFormat::Human => self.format_project_detail(project),
        }
    }

    /// Closing line (human, summary) or the full document (JSON)
    pub fn format_overall(&self, report: &ValidationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(&JsonReport::from(report))?;
                json.push('\n');
                Ok(json)
            }
            OutputFormat::Human | OutputFormat::Summary => {
                Ok(format!("Overall: {}\n", self.verdict(report.success())))
            }
        }
    }

    fn format_project_detail(&self, project: &ProjectReport) -> String {
        let mut output = format!("=== {} ===\n", project.name);
        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format!("Root: {}\n", project.root.display()));
        }

        match &project.outcome {
            ProjectOutcome::NotLocated { reason } => {
                output.push_str(&format!("{}\n", self.format_error(reason)));
            }
            ProjectOutcome::Located { entities } => {
                for entity in entities {
                    output.push_str(&self.format_entity(entity));
                }
            }
        }

        output.push_str(&format!(
            "{}/{} rules passed\n\n",
            project.passed_rules(),
            project.total_rules()
        ));
        output
    }

    fn format_entity(&self, entity: &EntityReport) -> String {
        let mut output = format!("{}: {}\n", entity.kind, entity.name);
        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&format!("  File: {}\n", entity.path.display()));
        }

        match &entity.status {
            EntityStatus::HardFailure { reason } => {
                output.push_str(&format!("  {}\n", self.format_error(reason)));
            }
            EntityStatus::Evaluated { results } => {
                for result in results {
                    output.push_str(&format!("  {}\n", self.format_result(result)));
                    if self.verbosity >= VerbosityLevel::Verbose
                        && !result.passed
                        && let Some(hint) = &result.hint
                    {
                        output.push_str(&format!("    hint: {}\n", hint));
                    }
                }
            }
        }
        output
    }

    pub fn format_result(&self, result: &ValidationResult) -> String {
        format!(
            "{}: {} (expected={}, observed={})",
            result.label,
            self.verdict(result.passed),
            result.expected,
            result.observed
        )
    }

    fn format_error(&self, reason: &str) -> String {
        format!("{}: {}", self.colorize("ERROR", RED), reason)
    }

    fn format_project_failures(&self, project: &ProjectReport) -> String {
        let mut output = String::new();
        match &project.outcome {
            ProjectOutcome::NotLocated { reason } => {
                output.push_str(&format!("{}: {}\n", project.name, self.format_error(reason)));
            }
            ProjectOutcome::Located { entities } => {
                for entity in entities {
                    match &entity.status {
                        EntityStatus::HardFailure { reason } => {
                            output.push_str(&format!(
                                "{}: {}\n",
                                entity.name,
                                self.format_error(reason)
                            ));
                        }
                        EntityStatus::Evaluated { results } => {
                            for result in results.iter().filter(|r| !r.passed) {
                                output.push_str(&format!(
                                    "{}: {}\n",
                                    entity.name,
                                    self.format_result(result)
                                ));
                            }
                        }
                    }
                }
            }
        }
        output.push_str(&format!(
            "{}: {}/{} rules passed\n",
            project.name,
            project.passed_rules(),
            project.total_rules()
        ));
        output
    }

    fn format_project_summary(&self, project: &ProjectReport) -> String {
        let errors = project.hard_failures();
        let mut line = format!(
            "{}: {} ({}/{} rules passed",
            project.name,
            self.verdict(project.success()),
            project.passed_rules(),
            project.total_rules()
        );
        if errors > 0 {
            line.push_str(&format!(
                ", {} error{}",
                errors,
                if errors == 1 { "" } else { "s" }
            ));
        }
        line.push_str(")\n");
        line
    }
}

/// JSON document: the report plus its totals
#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    passed_rules: usize,
    total_rules: usize,
    hard_failures: usize,
    projects: &'a [ProjectReport],
}

impl<'a> From<&'a ValidationReport> for JsonReport<'a> {
    fn from(report: &'a ValidationReport) -> Self {
        Self {
            success: report.success(),
            passed_rules: report.passed_rules(),
            total_rules: report.total_rules(),
            hard_failures: report.hard_failures(),
            projects: &report.projects,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::EntityKind;
    use crate::rules::Requirement;
    use crate::xml::Observed;
    use std::path::Path;

    fn row(label: &str, observed: Observed, passed: bool) -> ValidationResult {
        ValidationResult {
            label: label.to_string(),
            observed,
            expected: "EncryptSensitiveWithPassword".to_string(),
            passed,
            requirement: Requirement::Required,
            hint: Some("re-save the package".to_string()),
        }
    }

    fn create_test_report() -> ValidationReport {
        let mut report = ValidationReport::new();
        report.push(ProjectReport::located(
            "Sales".to_string(),
            Path::new("etl"),
            vec![
                EntityReport::evaluated(
                    EntityKind::Package,
                    "Load.dtsx",
                    Path::new("etl/Load.dtsx"),
                    vec![
                        row(
                            "Package protection level",
                            Observed::Present("EncryptSensitiveWithPassword".to_string()),
                            true,
                        ),
                        row("Last modified product version", Observed::Absent, false),
                    ],
                ),
                EntityReport::hard_failure(
                    EntityKind::Package,
                    "Broken.dtsx",
                    Path::new("etl/Broken.dtsx"),
                    "Malformed XML".to_string(),
                ),
            ],
        ));
        report
    }

    fn output(verbosity: VerbosityLevel, format: OutputFormat) -> Output {
        Output::new(verbosity, format).with_colors(false)
    }

    #[test]
    fn test_human_output() {
        let report = create_test_report();
        let formatted =
            output(VerbosityLevel::Normal, OutputFormat::Human).format_project(&report.projects[0]);

        assert!(formatted.starts_with("=== Sales ===\n"));
        assert!(formatted.contains("Package: Load.dtsx\n"));
        assert!(formatted.contains(
            "  Package protection level: PASS (expected=EncryptSensitiveWithPassword, observed=EncryptSensitiveWithPassword)\n"
        ));
        assert!(formatted.contains("observed=<absent>)"));
        assert!(formatted.contains("  ERROR: Malformed XML\n"));
        assert!(formatted.contains("1/2 rules passed\n"));
        assert!(!formatted.contains("hint:"));
    }

    #[test]
    fn test_verbose_output_shows_hints() {
        let report = create_test_report();
        let formatted =
            output(VerbosityLevel::Verbose, OutputFormat::Human).format_project(&report.projects[0]);

        assert!(formatted.contains("    hint: re-save the package\n"));
        assert_eq!(formatted.matches("hint:").count(), 1);
    }

    #[test]
    fn test_quiet_output_shows_only_failures() {
        let report = create_test_report();
        let formatted =
            output(VerbosityLevel::Quiet, OutputFormat::Human).format_project(&report.projects[0]);

        assert!(!formatted.contains("PASS"));
        assert!(formatted.contains("Load.dtsx: Last modified product version: FAIL"));
        assert!(formatted.contains("Broken.dtsx: ERROR: Malformed XML"));
        assert!(formatted.ends_with("Sales: 1/2 rules passed\n"));
    }

    #[test]
    fn test_summary_output() {
        let report = create_test_report();
        let out = output(VerbosityLevel::Normal, OutputFormat::Summary);

        assert_eq!(
            out.format_project(&report.projects[0]),
            "Sales: FAIL (1/2 rules passed, 1 error)\n"
        );
        assert_eq!(out.format_overall(&report).unwrap(), "Overall: FAIL\n");
    }

    #[test]
    fn test_json_output() {
        let report = create_test_report();
        let out = output(VerbosityLevel::Normal, OutputFormat::Json);

        assert!(out.format_project(&report.projects[0]).is_empty());
        let json: serde_json::Value =
            serde_json::from_str(&out.format_overall(&report).unwrap()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["total_rules"], 2);
        assert_eq!(json["projects"][0]["entities"][1]["status"], "hard_failure");
        assert_eq!(
            json["projects"][0]["entities"][0]["results"][1]["observed"]["state"],
            "absent"
        );
    }

    #[test]
    fn test_colors() {
        let report = create_test_report();
        let out = Output::new(VerbosityLevel::Normal, OutputFormat::Human).with_colors(true);
        let formatted = out.format_project(&report.projects[0]);

        assert!(formatted.contains("\x1b[32mPASS\x1b[0m"));
        assert!(formatted.contains("\x1b[31mFAIL\x1b[0m"));
        assert!(formatted.contains("\x1b[31mERROR\x1b[0m"));
    }
}
