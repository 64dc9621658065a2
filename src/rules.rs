//! Built-in policy rules
//!
//! Rules are fixed at build time. Each one names what it checks, how to pull
//! the observed value out of a descriptor, what value is expected, and
//! whether a missing value fails the rule (required) or drops it from the
//! report (optional). Evaluation order is the order of the tables below.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::descriptor::{
    BIXPRESS_CONNECTION_NAME, BIXPRESS_ERROR_HANDLER_NAME, PackageDescriptor, ProjectDescriptor,
};
use crate::error::{LookupError, LookupResult};
use crate::xml::Observed;

/// Server versions a project may target
pub const ALLOWED_SERVER_VERSIONS: &[&str] = &["SQLServer2014", "SQLServer2016"];

/// Protection level required of projects and packages
pub const REQUIRED_PROTECTION_LEVEL: &str = "EncryptSensitiveWithPassword";

pub const REQUIRED_DEPLOYMENT_MODEL: &str = "Project";

/// Tool version packages must last have been saved with
pub const REQUIRED_PACKAGE_VERSION: &str = "SSIS_2016";

/// Observed linkage value when every reference and file match up
pub const ALL_PACKAGES_LINKED: &str = "all packages linked";

/// Protection level SSIS applies when a package omits the attribute
const DEFAULT_PACKAGE_PROTECTION_LEVEL: &str = "EncryptSensitiveWithUserKey";

static PRODUCT_VERSION_MAJOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").unwrap());

static DATA_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:^|;)\s*data source\s*=\s*([^;]*)").unwrap());

/// Whether a missing value fails the rule or removes it from the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    Required,
    Optional,
}

/// What an observed value is compared against
#[derive(Debug, Clone, Copy)]
pub enum Expected {
    Equals(&'static str),
    OneOf(&'static [&'static str]),
    /// Any present value passes
    Present,
    Satisfies {
        description: &'static str,
        check: fn(&str) -> bool,
    },
}

impl Expected {
    pub fn accepts(&self, observed: &str) -> bool {
        match self {
            Expected::Equals(expected) => observed == *expected,
            Expected::OneOf(allowed) => allowed.contains(&observed),
            Expected::Present => true,
            Expected::Satisfies { check, .. } => check(observed),
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Equals(expected) => write!(f, "{}", expected),
            Expected::OneOf(allowed) => write!(f, "{}", allowed.join(" or ")),
            Expected::Present => write!(f, "present"),
            Expected::Satisfies { description, .. } => write!(f, "{}", description),
        }
    }
}

/// Pulls the observed value for one rule out of a descriptor
pub type Extractor<D> = fn(&D) -> LookupResult<String>;

/// One entry of a rule table
pub struct Rule<D> {
    pub label: &'static str,
    pub extractor: Extractor<D>,
    pub expected: Expected,
    pub requirement: Requirement,
    /// Shown next to a failing row
    pub hint: Option<&'static str>,
}

impl<D> Rule<D> {
    pub fn required(label: &'static str, extractor: Extractor<D>, expected: Expected) -> Self {
        Self {
            label,
            extractor,
            expected,
            requirement: Requirement::Required,
            hint: None,
        }
    }

    pub fn optional(label: &'static str, extractor: Extractor<D>, expected: Expected) -> Self {
        Self {
            requirement: Requirement::Optional,
            ..Self::required(label, extractor, expected)
        }
    }

    pub fn with_hint(mut self, hint: &'static str) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn extract(&self, descriptor: &D) -> LookupResult<String> {
        (self.extractor)(descriptor)
    }
}

impl<D> fmt::Debug for Rule<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("label", &self.label)
            .field("expected", &self.expected)
            .field("requirement", &self.requirement)
            .finish()
    }
}

/// Both rule tables, built once per process
#[derive(Debug)]
pub struct RuleSet {
    pub project: Vec<Rule<ProjectDescriptor>>,
    pub package: Vec<Rule<PackageDescriptor>>,
}

impl RuleSet {
    pub fn standard() -> Self {
        Self {
            project: project_rules(),
            package: package_rules(),
        }
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

pub fn project_rules() -> Vec<Rule<ProjectDescriptor>> {
    vec![
        Rule::required(
            "Target server version",
            target_server_version,
            Expected::OneOf(ALLOWED_SERVER_VERSIONS),
        )
        .with_hint(
            "a project without a deployment configuration is likely built for SQL Server 2012",
        ),
        Rule::required(
            "Project protection level",
            project_protection_level,
            Expected::Equals(REQUIRED_PROTECTION_LEVEL),
        ),
        Rule::required(
            "Package references",
            package_reference_count,
            Expected::Satisfies {
                description: "at least 1",
                check: at_least_one,
            },
        )
        .with_hint("no linked packages found in the project manifest"),
        Rule::required(
            "Package linkage",
            package_linkage,
            Expected::Equals(ALL_PACKAGES_LINKED),
        )
        .with_hint("the packages in the project are not properly linked"),
        Rule::required(
            "Deployment model",
            deployment_model,
            Expected::Equals(REQUIRED_DEPLOYMENT_MODEL),
        )
        .with_hint("convert the project to the project deployment model"),
    ]
}

pub fn package_rules() -> Vec<Rule<PackageDescriptor>> {
    vec![
        Rule::required(
            "Last modified product version",
            package_version,
            Expected::Equals(REQUIRED_PACKAGE_VERSION),
        ),
        Rule::required(
            "Package protection level",
            package_protection_level,
            Expected::Equals(REQUIRED_PROTECTION_LEVEL),
        ),
        Rule::optional(
            "BIxPress server_name",
            bixpress_server_name,
            Expected::Present,
        ),
        Rule::optional(
            "BIxPress continue execution on error",
            bixpress_continue_on_error,
            Expected::Equals("True"),
        )
        .with_hint(
            "check 'Continue package execution on Auditing Framework database connection failure' in BIxPress",
        ),
        Rule::optional(
            "BIxPress report error on failure",
            bixpress_report_error,
            Expected::Equals("False"),
        )
        .with_hint("check 'Do not report failure if Auditing Framework fails' in BIxPress"),
    ]
}

fn at_least_one(observed: &str) -> bool {
    observed.parse::<usize>().is_ok_and(|count| count > 0)
}

fn target_server_version(project: &ProjectDescriptor) -> LookupResult<String> {
    project.target_server_version().require("TargetServerVersion")
}

fn project_protection_level(project: &ProjectDescriptor) -> LookupResult<String> {
    project.protection_level().require("SSIS:ProtectionLevel")
}

fn package_reference_count(project: &ProjectDescriptor) -> LookupResult<String> {
    Ok(project.package_references().len().to_string())
}

/// Checks references against files in both directions: every declared
/// package must exist, and every package beside the project file must be
/// declared.
fn package_linkage(project: &ProjectDescriptor) -> LookupResult<String> {
    let directory = project.directory();
    let declared: Vec<(String, PathBuf)> = project
        .package_references()
        .into_iter()
        .map(|name| {
            let path = directory.join(name.replace('\\', "/"));
            (name, path)
        })
        .collect();

    let unresolved: Vec<&str> = declared
        .iter()
        .filter(|(_, path)| !project.package_files.contains(path))
        .map(|(name, _)| name.as_str())
        .collect();

    let declared_paths: BTreeSet<&PathBuf> = declared.iter().map(|(_, path)| path).collect();
    let undeclared: Vec<String> = project
        .package_files
        .iter()
        .filter(|file| file.parent() == Some(directory) && !declared_paths.contains(file))
        .filter_map(|file| file.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect();

    if unresolved.is_empty() && undeclared.is_empty() {
        return Ok(ALL_PACKAGES_LINKED.to_string());
    }

    let mut problems = Vec::new();
    if !unresolved.is_empty() {
        problems.push(format!("unresolved: {}", unresolved.join(", ")));
    }
    if !undeclared.is_empty() {
        problems.push(format!("undeclared: {}", undeclared.join(", ")));
    }
    Ok(problems.join("; "))
}

fn deployment_model(project: &ProjectDescriptor) -> LookupResult<String> {
    project.deployment_model().require("DeploymentModel")
}

/// Map a `LastModifiedProductVersion` such as `13.0.1601.5` to its tool name
pub fn product_version_name(version: &str) -> &'static str {
    let major = PRODUCT_VERSION_MAJOR
        .captures(version)
        .and_then(|caps| caps[1].parse::<u32>().ok());
    match major {
        Some(11) => "SSIS_2012",
        Some(12) => "SSIS_2014",
        Some(13) => "SSIS_2016",
        Some(14) => "SSIS_2017",
        Some(15) => "SSIS_2019",
        _ => "unknown",
    }
}

/// Map a numeric `DTS:ProtectionLevel` to its name
pub fn protection_level_name(code: &str) -> &'static str {
    match code.trim() {
        "0" => "DontSaveSensitive",
        "1" => "EncryptSensitiveWithUserKey",
        "2" => "EncryptSensitiveWithPassword",
        "3" => "EncryptAllWithPassword",
        "4" => "EncryptAllWithUserKey",
        _ => "unknown",
    }
}

fn package_version(package: &PackageDescriptor) -> LookupResult<String> {
    let version = package
        .last_modified_product_version()
        .require("DTS:LastModifiedProductVersion")?;
    Ok(product_version_name(&version).to_string())
}

fn package_protection_level(package: &PackageDescriptor) -> LookupResult<String> {
    let name = match package.protection_level_code() {
        Observed::Present(code) => protection_level_name(&code),
        Observed::Absent => DEFAULT_PACKAGE_PROTECTION_LEVEL,
    };
    Ok(name.to_string())
}

fn bixpress_server_name(package: &PackageDescriptor) -> LookupResult<String> {
    let connection_string = package
        .bixpress_connection_string()
        .require("DTS:ConnectionString")?;
    let server = DATA_SOURCE
        .captures(&connection_string)
        .map(|caps| caps[1].trim().to_string())
        .filter(|server| !server.is_empty());
    Ok(server.unwrap_or(connection_string))
}

/// `DTS:DelayValidation` is omitted when false, so a present connection
/// without the attribute reads as "False".
fn bixpress_continue_on_error(package: &PackageDescriptor) -> LookupResult<String> {
    let connection = package
        .bixpress_connection()
        .ok_or_else(|| LookupError::missing(BIXPRESS_CONNECTION_NAME))?;
    Ok(connection
        .attribute("DTS:DelayValidation")
        .as_deref()
        .unwrap_or("False")
        .to_string())
}

/// A forced result of `0` (success) means failures are not reported.
fn bixpress_report_error(package: &PackageDescriptor) -> LookupResult<String> {
    if !package.has_bixpress_error_handler() {
        return Err(LookupError::missing(BIXPRESS_ERROR_HANDLER_NAME));
    }
    let reported = !package.bixpress_force_execution_result().is("0");
    Ok(if reported { "True" } else { "False" }.to_string())
}
