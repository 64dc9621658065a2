//! Parsed project and package files
//!
//! A descriptor pairs a file path with its parsed tree and exposes the
//! handful of SSIS locations the rule table reads from.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::xml::{Namespaces, Node, Observed, XmlDocument};

/// Object name of the BIxPress auditing connection manager
pub const BIXPRESS_CONNECTION_NAME: &str = "OLEDB_BIxPress_1";

/// Object name of the BIxPress package `OnError` handler
pub const BIXPRESS_ERROR_HANDLER_NAME: &str = "SSISOpsEhObj_Package_OnError";

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// A `.dtproj` file
#[derive(Debug, Clone)]
pub struct ProjectDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub document: XmlDocument,
    /// Package files located on disk for this project
    pub package_files: Vec<PathBuf>,
}

impl ProjectDescriptor {
    pub fn load(path: &Path, package_files: Vec<PathBuf>) -> Result<Self> {
        let document = XmlDocument::load(path, Namespaces::ssis())?;
        Ok(Self::new(path, document, package_files))
    }

    pub fn parse(path: &Path, text: &str, package_files: Vec<PathBuf>) -> Result<Self> {
        let document = XmlDocument::parse(text, Namespaces::ssis(), path)?;
        Ok(Self::new(path, document, package_files))
    }

    fn new(path: &Path, document: XmlDocument, package_files: Vec<PathBuf>) -> Self {
        Self {
            name: path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            document,
            package_files,
        }
    }

    /// Directory package references are resolved against
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// `SSIS:Project` element of the deployment manifest
    pub fn manifest(&self) -> Option<Node<'_>> {
        self.document
            .root()
            .select(&["DeploymentModelSpecificContent", "Manifest", "SSIS:Project"])
            .into_iter()
            .next()
    }

    pub fn target_server_version(&self) -> Observed {
        self.document
            .root()
            .select(&["Configurations", "Configuration", "Options", "TargetServerVersion"])
            .first()
            .map_or(Observed::Absent, Node::text)
    }

    pub fn protection_level(&self) -> Observed {
        self.manifest()
            .map_or(Observed::Absent, |m| m.attribute("SSIS:ProtectionLevel"))
    }

    pub fn deployment_model(&self) -> Observed {
        self.document
            .root()
            .descendant("DeploymentModel")
            .map_or(Observed::Absent, |node| node.text())
    }

    /// Package names declared in the manifest, in declaration order
    pub fn package_references(&self) -> Vec<String> {
        let Some(manifest) = self.manifest() else {
            return Vec::new();
        };
        manifest
            .children("SSIS:Packages")
            .iter()
            .flat_map(|packages| packages.children("SSIS:Package"))
            .filter_map(|package| package.attribute("SSIS:Name").as_deref().map(str::to_string))
            .collect()
    }
}

/// A `.dtsx` file
#[derive(Debug, Clone)]
pub struct PackageDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub document: XmlDocument,
}

impl PackageDescriptor {
    pub fn load(path: &Path) -> Result<Self> {
        let document = XmlDocument::load(path, Namespaces::ssis())?;
        Ok(Self::new(path, document))
    }

    pub fn parse(path: &Path, text: &str) -> Result<Self> {
        let document = XmlDocument::parse(text, Namespaces::ssis(), path)?;
        Ok(Self::new(path, document))
    }

    fn new(path: &Path, document: XmlDocument) -> Self {
        Self {
            name: file_name(path),
            path: path.to_path_buf(),
            document,
        }
    }

    /// The package-level `DTS:Executable`
    pub fn executable(&self) -> Option<Node<'_>> {
        self.document.root().select(&["DTS:Executable"]).into_iter().next()
    }

    pub fn protection_level_code(&self) -> Observed {
        self.executable()
            .map_or(Observed::Absent, |e| e.attribute("DTS:ProtectionLevel"))
    }

    pub fn last_modified_product_version(&self) -> Observed {
        self.executable()
            .map_or(Observed::Absent, |e| e.attribute("DTS:LastModifiedProductVersion"))
    }

    /// The BIxPress connection manager, if the package uses the framework
    pub fn bixpress_connection(&self) -> Option<Node<'_>> {
        self.document
            .root()
            .descendants("DTS:ConnectionManager")
            .into_iter()
            .find(|cm| cm.attribute("DTS:ObjectName").is(BIXPRESS_CONNECTION_NAME))
    }

    pub fn bixpress_connection_string(&self) -> Observed {
        self.bixpress_connection()
            .and_then(|cm| {
                cm.select(&["DTS:ObjectData", "DTS:ConnectionManager"])
                    .into_iter()
                    .map(|inner| inner.attribute("DTS:ConnectionString"))
                    .find(Observed::is_present)
            })
            .unwrap_or(Observed::Absent)
    }

    pub fn bixpress_delay_validation(&self) -> Observed {
        self.bixpress_connection()
            .map_or(Observed::Absent, |cm| cm.attribute("DTS:DelayValidation"))
    }

    /// The executable BIxPress installs in the package `OnError` handler
    pub fn bixpress_error_handler(&self) -> Option<Node<'_>> {
        self.document
            .root()
            .descendants("DTS:Executable")
            .into_iter()
            .find(|e| e.attribute("DTS:ObjectName").is(BIXPRESS_ERROR_HANDLER_NAME))
    }

    pub fn has_bixpress_error_handler(&self) -> bool {
        self.bixpress_error_handler().is_some()
    }

    pub fn bixpress_force_execution_result(&self) -> Observed {
        self.bixpress_error_handler()
            .map_or(Observed::Absent, |e| e.attribute("DTS:ForceExecutionResult"))
    }
}
