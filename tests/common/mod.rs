//! Fixture builders shared by the integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Settings BIxPress writes into a package
pub struct Bixpress<'a> {
    pub server: &'a str,
    pub delay_validation: &'a str,
    pub force_execution_result: &'a str,
}

impl Default for Bixpress<'_> {
    fn default() -> Self {
        Self {
            server: "server_name",
            delay_validation: "True",
            force_execution_result: "0",
        }
    }
}

/// A `.dtproj` document
pub fn dtproj_xml(
    protection_level: &str,
    target_server_version: Option<&str>,
    packages: &[&str],
) -> String {
    let packages: String = packages
        .iter()
        .map(|name| {
            format!(
                "          <SSIS:Package SSIS:Name=\"{}\" SSIS:EntryPoint=\"1\" />\n",
                name
            )
        })
        .collect();
    let configurations = match target_server_version {
        Some(version) => format!(
            r#"  <Configurations>
    <Configuration>
      <Name>Development</Name>
      <Options>
        <OutputPath>bin</OutputPath>
        <TargetServerVersion>{}</TargetServerVersion>
      </Options>
    </Configuration>
  </Configurations>
"#,
            version
        ),
        None => String::new(),
    };

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<Project xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <DeploymentModel>Project</DeploymentModel>
  <ProductVersion>14.0.1000.169</ProductVersion>
  <DeploymentModelSpecificContent>
    <Manifest>
      <SSIS:Project SSIS:ProtectionLevel="{}" xmlns:SSIS="www.microsoft.com/SqlServer/SSIS">
        <SSIS:Packages>
{}        </SSIS:Packages>
      </SSIS:Project>
    </Manifest>
  </DeploymentModelSpecificContent>
{}</Project>
"#,
        protection_level, packages, configurations
    )
}

/// A `.dtsx` document, with or without the BIxPress connection and handler
pub fn dtsx_xml(protection_level: &str, product_version: &str, bixpress: Option<Bixpress>) -> String {
    let (connections, handlers) = match bixpress {
        Some(bixpress) => (
            format!(
                r#"  <DTS:ConnectionManagers>
    <DTS:ConnectionManager DTS:DelayValidation="{}" DTS:ObjectName="OLEDB_BIxPress_1">
      <DTS:ObjectData>
        <DTS:ConnectionManager DTS:ConnectionString="Data Source={};Initial Catalog=BIxPress;" />
      </DTS:ObjectData>
    </DTS:ConnectionManager>
  </DTS:ConnectionManagers>
"#,
                bixpress.delay_validation, bixpress.server
            ),
            format!(
                r#"  <DTS:EventHandlers>
    <DTS:EventHandler>
      <DTS:Executables>
        <DTS:Executable DTS:ForceExecutionResult="{}" DTS:ObjectName="SSISOpsEhObj_Package_OnError" />
      </DTS:Executables>
    </DTS:EventHandler>
  </DTS:EventHandlers>
"#,
                bixpress.force_execution_result
            ),
        ),
        None => (String::new(), String::new()),
    };

    format!(
        r#"<?xml version='1.0' encoding='utf-8'?>
<DTS:Executable xmlns:DTS="www.microsoft.com/SqlServer/Dts" DTS:ProtectionLevel="{}" DTS:LastModifiedProductVersion="{}">
{}{}</DTS:Executable>
"#,
        protection_level, product_version, connections, handlers
    )
}

/// Write a project directory `root/name` with one `.dtproj` and the given packages
pub fn write_project(root: &Path, name: &str, dtproj: &str, packages: &[(&str, String)]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{}.dtproj", name)), dtproj).unwrap();
    for (file_name, text) in packages {
        fs::write(dir.join(file_name), text).unwrap();
    }
    dir
}

/// A project that satisfies every rule
pub fn compliant_project(root: &Path, name: &str) -> PathBuf {
    write_project(
        root,
        name,
        &dtproj_xml("EncryptSensitiveWithPassword", Some("SQLServer2016"), &["Package.dtsx"]),
        &[(
            "Package.dtsx",
            dtsx_xml("2", "13.0.1601.5", Some(Bixpress::default())),
        )],
    )
}

pub fn temp_root() -> TempDir {
    TempDir::new().unwrap()
}

/// Run the compiled binary with colors off
pub fn run_validator<'a>(args: impl IntoIterator<Item = &'a str>) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ssis-validator"))
        .args(args)
        .arg("--no-color")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute ssis-validator")
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}
