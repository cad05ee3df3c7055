//! YAML configuration file handling.
//!
//! The configuration file is a mapping of named sections. Connection
//! parameters live under a section chosen on the command line (`postgresql`
//! by default); the optional `report` section describes where the analysis
//! queries find accounts and ledger entries.
//!
//! ```yaml
//! postgresql:
//!   host: localhost
//!   port: 5432
//!   database: bank
//!   user: loader
//!   password: secret
//! report:
//!   attribution:
//!     kind: category_column
//!     column: account_type
//!     checking: CHECKING
//!     loan: LOAN
//! ```

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, de::DeserializeOwned};
use serde_yaml::Value;

use crate::{error::LoadError, report::ReportLayout};

pub const DEFAULT_CONFIG_FILE: &str = "database.yaml";
pub const DEFAULT_SECTION: &str = "postgresql";
pub const REPORT_SECTION: &str = "report";

const DEFAULT_PORT: u16 = 5432;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "ConnectionConfig::default_port")]
    pub port: u16,
    #[serde(alias = "dbname")]
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionConfig {
    pub const fn default_port() -> u16 {
        DEFAULT_PORT
    }

    /// Connection target without the password, for log lines and errors.
    pub fn describe(&self) -> String {
        format!(
            "postgresql://{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}

#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
    root: Value,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let root: Value = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn optional_section<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        match self.root.get(name) {
            Some(value) => {
                let parsed = serde_yaml::from_value(value.clone()).with_context(|| {
                    format!("Parsing section '{name}' of {:?}", self.path)
                })?;
                Ok(Some(parsed))
            }
            None => Ok(None),
        }
    }

    pub fn section<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.optional_section(name)?.ok_or_else(|| {
            LoadError::MissingConfigSection {
                section: name.to_string(),
                path: self.path.clone(),
            }
            .into()
        })
    }

    pub fn connection(&self, section: &str) -> Result<ConnectionConfig> {
        self.section(section)
    }

    pub fn report_layout(&self) -> Result<ReportLayout> {
        Ok(self
            .optional_section(REPORT_SECTION)?
            .unwrap_or_default())
    }
}
