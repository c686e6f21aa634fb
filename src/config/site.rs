use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{DeployError, Result};

/// Columns every site row must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "dao.db",
    "jdbc.URL",
    "tomcat.url",
    "tomcat.host",
    "tomcat.modules",
];

/// Database dialect of a site, derived from its `dao.db` column. The dialect
/// selects the configuration namespace all of the site's keys live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbDialect {
    Oracle,
    SqlServer,
}

impl DbDialect {
    pub fn classify(raw: &str) -> Option<Self> {
        let upper = raw.to_uppercase();
        if upper.contains("ORACLE") {
            Some(Self::Oracle)
        } else if upper.contains("SQLSERVER") || upper.contains("MSSQL") {
            Some(Self::SqlServer)
        } else {
            None
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Oracle => "upd.environment1",
            Self::SqlServer => "upd.environment2",
        }
    }
}

/// One validated site: an ordered key-value map plus the namespace prefix
/// assigned during validation. The deployment core treats the map as opaque
/// and looks keys up by convention (`<prefix>.war.name`).
#[derive(Debug, Clone)]
pub struct SiteConfig {
    prefix: String,
    values: IndexMap<String, String>,
}

impl SiteConfig {
    /// Validate a raw row: classify the dialect and move every key under the
    /// dialect's namespace prefix.
    pub fn validate(raw: IndexMap<String, String>) -> Result<Self> {
        let db = raw
            .get("dao.db")
            .ok_or_else(|| DeployError::MissingKey("dao.db".into()))?;
        let dialect = DbDialect::classify(db)
            .ok_or_else(|| DeployError::UnsupportedDialect(db.clone()))?;

        let prefix = dialect.prefix().to_string();
        let values = raw
            .into_iter()
            .map(|(key, value)| (format!("{prefix}.{key}"), value))
            .collect();

        Ok(Self { prefix, values })
    }

    /// Build a site directly from unprefixed keys. Test and tooling helper;
    /// production rows go through `validate`.
    pub fn from_pairs(
        prefix: impl Into<String>,
        pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let prefix = prefix.into();
        let values = pairs
            .into_iter()
            .map(|(k, v)| (format!("{}.{}", prefix, k.into()), v.into()))
            .collect();
        Self { prefix, values }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Look up a key under the site's prefix, falling back to the bare key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&format!("{}.{}", self.prefix, key))
            .or_else(|| self.values.get(key))
            .map(String::as_str)
    }

    /// Like `get`, but absence is a configuration error rather than a None
    /// that propagates silently. The error names the key as requested, since
    /// the lookup also accepts the bare form.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                DeployError::MissingKey(format!("{key} (site namespace {})", self.prefix))
            })
    }

    /// Display name for logs and result output.
    pub fn name(&self) -> String {
        self.get("project")
            .or_else(|| self.get("war.name"))
            .or_else(|| self.get("tomcat.host"))
            .unwrap_or("unnamed-site")
            .to_string()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Read the tabular site source: one CSV row per site, required columns
/// checked against the header before any row is accepted.
pub fn read_sites(path: &Path) -> Result<Vec<IndexMap<String, String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DeployError::Config(format!("cannot read {}: {e}", path.display())))?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(DeployError::Config(format!(
            "missing required columns in {}: {}",
            path.display(),
            missing.join(", ")
        )));
    }

    let mut sites = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: IndexMap<String, String> = headers
            .iter()
            .cloned()
            .zip(record.iter().map(|v| v.trim().to_string()))
            .collect();
        sites.push(row);
    }

    debug!(path = %path.display(), count = sites.len(), "Read site rows");
    Ok(sites)
}
