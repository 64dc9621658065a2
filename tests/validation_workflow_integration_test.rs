mod common;

use std::path::Path;
use std::process::Command;

use common::*;
use ssis_validator::{
    EntityKind, EntityStatus, GitStaging, Observed, ProjectOutcome, ProjectReport, StagedPaths,
    StagingProvider, ValidationEngine,
};

fn labels(project: &ProjectReport, entity: usize) -> Vec<String> {
    project.entities()[entity]
        .status
        .results()
        .iter()
        .map(|r| r.label.clone())
        .collect()
}

#[test]
fn test_package_without_bixpress_has_no_optional_rows() {
    let root = temp_root();
    let dir = write_project(
        root.path(),
        "Sales",
        &dtproj_xml("EncryptSensitiveWithPassword", Some("SQLServer2014"), &["Plain.dtsx"]),
        &[("Plain.dtsx", dtsx_xml("2", "13.0.1601.5", None))],
    );

    let report = ValidationEngine::default().validate_project(&dir, None);

    assert!(report.success());
    assert_eq!(
        labels(&report, 1),
        vec!["Last modified product version", "Package protection level"]
    );
}

#[test]
fn test_wrong_bixpress_setting_fails() {
    let root = temp_root();
    let dir = write_project(
        root.path(),
        "Sales",
        &dtproj_xml("EncryptSensitiveWithPassword", Some("SQLServer2016"), &["Audit.dtsx"]),
        &[(
            "Audit.dtsx",
            dtsx_xml(
                "2",
                "13.0.1601.5",
                Some(Bixpress {
                    force_execution_result: "1",
                    ..Bixpress::default()
                }),
            ),
        )],
    );

    let report = ValidationEngine::default().validate_project(&dir, None);
    let package = &report.entities()[1];
    let failed: Vec<_> = package
        .status
        .results()
        .iter()
        .filter(|r| !r.passed)
        .collect();

    assert!(!report.success());
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].label, "BIxPress report error on failure");
    assert_eq!(failed[0].observed, Observed::Present("True".to_string()));
}

#[test]
fn test_delay_validation_off_fails() {
    let root = temp_root();
    let dir = write_project(
        root.path(),
        "Sales",
        &dtproj_xml("EncryptSensitiveWithPassword", Some("SQLServer2016"), &["Audit.dtsx"]),
        &[(
            "Audit.dtsx",
            dtsx_xml(
                "2",
                "13.0.1601.5",
                Some(Bixpress {
                    delay_validation: "False",
                    ..Bixpress::default()
                }),
            ),
        )],
    );

    let report = ValidationEngine::default().validate_project(&dir, None);
    let package = &report.entities()[1];
    let failed: Vec<_> = package
        .status
        .results()
        .iter()
        .filter(|r| !r.passed)
        .collect();

    assert!(!report.success());
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].label, "BIxPress continue execution on error");
    assert_eq!(failed[0].expected, "True");
    assert_eq!(failed[0].observed, Observed::Present("False".to_string()));
}

#[test]
fn test_bixpress_server_name_is_reported() {
    let root = temp_root();
    let dir = write_project(
        root.path(),
        "Sales",
        &dtproj_xml("EncryptSensitiveWithPassword", Some("SQLServer2016"), &["Audit.dtsx"]),
        &[(
            "Audit.dtsx",
            dtsx_xml(
                "2",
                "13.0.1601.5",
                Some(Bixpress {
                    server: "audit-sql-01",
                    ..Bixpress::default()
                }),
            ),
        )],
    );

    let report = ValidationEngine::default().validate_project(&dir, None);
    let server = report.entities()[1]
        .status
        .results()
        .iter()
        .find(|r| r.label == "BIxPress server_name")
        .cloned()
        .unwrap();

    assert!(server.passed);
    assert_eq!(server.observed, Observed::Present("audit-sql-01".to_string()));
}

#[test]
fn test_missing_target_server_version_fails_as_absent() {
    let root = temp_root();
    let dir = write_project(
        root.path(),
        "Legacy",
        &dtproj_xml("EncryptSensitiveWithPassword", None, &["Package.dtsx"]),
        &[("Package.dtsx", dtsx_xml("2", "13.0.1601.5", None))],
    );

    let report = ValidationEngine::default().validate_project(&dir, None);
    let first = &report.entities()[0].status.results()[0];

    assert_eq!(first.label, "Target server version");
    assert_eq!(first.observed, Observed::Absent);
    assert!(!first.passed);
    assert!(first.hint.is_some());
}

#[test]
fn test_unlinked_packages_fail_linkage() {
    let root = temp_root();
    let dir = write_project(
        root.path(),
        "Sales",
        &dtproj_xml("EncryptSensitiveWithPassword", Some("SQLServer2016"), &["Gone.dtsx"]),
        &[("Stray.dtsx", dtsx_xml("2", "13.0.1601.5", None))],
    );

    let report = ValidationEngine::default().validate_project(&dir, None);
    let linkage = report.entities()[0]
        .status
        .results()
        .iter()
        .find(|r| r.label == "Package linkage")
        .cloned()
        .unwrap();

    assert!(!linkage.passed);
    assert_eq!(
        linkage.observed,
        Observed::Present("unresolved: Gone.dtsx; undeclared: Stray.dtsx".to_string())
    );
}

#[test]
fn test_staged_filter_skips_unstaged_files() {
    let root = temp_root();
    let dir = write_project(
        root.path(),
        "Sales",
        &dtproj_xml(
            "EncryptSensitiveWithPassword",
            Some("SQLServer2016"),
            &["Staged.dtsx", "Untouched.dtsx"],
        ),
        &[
            ("Staged.dtsx", dtsx_xml("2", "13.0.1601.5", None)),
            ("Untouched.dtsx", dtsx_xml("0", "11.0.2100.60", None)),
        ],
    );
    let staged = StagedPaths::new(root.path(), ["Sales/Staged.dtsx"]);

    let report = ValidationEngine::default().validate_project(&dir, Some(&staged));

    assert!(report.success());
    assert_eq!(report.entities().len(), 1);
    assert_eq!(report.entities()[0].kind, EntityKind::Package);
    assert_eq!(report.entities()[0].name, "Staged.dtsx");
}

#[test]
fn test_malformed_package_is_isolated() {
    let root = temp_root();
    let dir = write_project(
        root.path(),
        "Sales",
        &dtproj_xml(
            "EncryptSensitiveWithPassword",
            Some("SQLServer2016"),
            &["Broken.dtsx", "Good.dtsx"],
        ),
        &[
            ("Broken.dtsx", "<DTS:Executable xmlns:DTS=".to_string()),
            ("Good.dtsx", dtsx_xml("2", "13.0.1601.5", None)),
        ],
    );

    let report = ValidationEngine::default().validate_project(&dir, None);
    let ProjectOutcome::Located { entities } = &report.outcome else {
        panic!("Expected located project");
    };

    assert_eq!(entities.len(), 3);
    assert!(matches!(entities[1].status, EntityStatus::HardFailure { .. }));
    assert!(entities[2].success());
    assert_eq!(report.hard_failures(), 1);
}

fn git(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[test]
fn test_git_staging_reads_index() {
    let root = temp_root();
    if !git(root.path(), &["init", "--quiet"]) {
        eprintln!("git unavailable, skipping");
        return;
    }
    let dir = compliant_project(root.path(), "Sales");
    std::fs::write(dir.join("Other.dtsx"), dtsx_xml("2", "13.0.1601.5", None)).unwrap();
    assert!(git(root.path(), &["add", "Sales/Package.dtsx"]));

    let staged = GitStaging.staged_paths(&dir).unwrap();

    assert_eq!(staged.iter().collect::<Vec<_>>(), vec!["Sales/Package.dtsx"]);
    assert!(staged.contains(&dir.join("Package.dtsx")));
    assert!(!staged.contains(&dir.join("Other.dtsx")));
}
