use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::http_client::REQUEST_TIMEOUT;

/// One site that is expected to link back to us.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub link: String,
    #[serde(default, skip_serializing)]
    pub avatar: Option<String>,
    #[serde(default, alias = "descr", skip_serializing)]
    pub description: Option<String>,
}

impl SiteEntry {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            name: None,
            link: link.into(),
            avatar: None,
            description: None,
        }
    }
}

/// Both layouts seen in the wild: a plain list of records, or a map keyed by
/// display name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SiteList {
    List(Vec<SiteEntry>),
    Named(BTreeMap<String, SiteEntry>),
}

/// Run parameters.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// YAML file holding the sites to check.
    pub config_path: PathBuf,
    /// Our own URL; a site passes when its links page carries an href containing it.
    pub self_link: String,
    /// A previous address of ours, accepted when `self_link` is not found.
    pub old_link: Option<String>,
    /// Text expected next to that href.
    pub expected_title: String,
    pub concurrency: usize,
    pub timeout: Duration,
    pub report_path: Option<PathBuf>,
    pub extra_keywords: Vec<String>,
    pub extra_paths: Vec<String>,
}

impl CheckerConfig {
    pub fn new(
        config_path: impl Into<PathBuf>,
        self_link: impl Into<String>,
        expected_title: impl Into<String>,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            self_link: self_link.into(),
            old_link: None,
            expected_title: expected_title.into(),
            concurrency: 1,
            timeout: REQUEST_TIMEOUT,
            report_path: None,
            extra_keywords: Vec::new(),
            extra_paths: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.self_link.trim().is_empty() {
            return Err(Error::InvalidConfig("self link must not be empty".into()));
        }
        if self.old_link.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(Error::InvalidConfig("old link must not be empty".into()));
        }
        if self.expected_title.is_empty() {
            return Err(Error::InvalidConfig("expected title must not be empty".into()));
        }
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig("concurrency must be at least 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be positive".into()));
        }
        Ok(())
    }
}

pub fn load_sites(path: &Path) -> Result<Vec<SiteEntry>> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sites(&content).map_err(|source| Error::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_sites(content: &str) -> std::result::Result<Vec<SiteEntry>, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let sites = match serde_yaml::from_str::<SiteList>(content)? {
        SiteList::List(sites) => sites,
        SiteList::Named(named) => named
            .into_iter()
            .map(|(name, mut site)| {
                site.name.get_or_insert(name);
                site
            })
            .collect(),
    };

    Ok(sites
        .into_iter()
        .filter(|site| {
            let keep = !site.link.trim().is_empty();
            if !keep {
                warn!(name = ?site.name, "skipping site entry with empty link");
            }
            keep
        })
        .collect())
}
