//! Process configuration and per-site parameter maps.

mod settings;
mod site;

pub use settings::{
    BuildConfig, DeployConfig, ServiceConfig, ServiceControlMode, SvnConfig, TagConfig,
};
pub use site::{read_sites, DbDialect, SiteConfig, REQUIRED_COLUMNS};
