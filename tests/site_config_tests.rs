use std::io::Write;

use tempfile::NamedTempFile;

use warship::config::{read_sites, SiteConfig};
use warship::error::DeployError;

fn sites_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn reads_rows_with_all_required_columns() {
    let file = sites_file(
        "dao.db,jdbc.URL,tomcat.url,tomcat.host,tomcat.modules,war.name\n\
         Oracle,jdbc:oracle:thin:@db1,http://web01:8080,web01,core,siteA\n\
         SQLServer,jdbc:sqlserver://db2,http://web02:8080,web02,core;admin,siteB\n",
    );

    let rows = read_sites(file.path()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["dao.db"], "Oracle");
    assert_eq!(rows[1]["war.name"], "siteB");
}

#[test]
fn missing_columns_are_reported_by_name() {
    let file = sites_file("dao.db,jdbc.URL\nOracle,jdbc:x\n");

    let err = read_sites(file.path()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("tomcat.url"));
    assert!(message.contains("tomcat.host"));
    assert!(message.contains("tomcat.modules"));
}

#[test]
fn rows_validate_into_prefixed_sites() {
    let file = sites_file(
        "dao.db,jdbc.URL,tomcat.url,tomcat.host,tomcat.modules,war.name\n\
         Oracle,jdbc:oracle:thin:@db1,http://web01:8080,web01,core,siteA\n",
    );

    let rows = read_sites(file.path()).unwrap();
    let site = SiteConfig::validate(rows.into_iter().next().unwrap()).unwrap();

    assert_eq!(site.prefix(), "upd.environment1");
    assert_eq!(site.get("tomcat.host"), Some("web01"));
    assert_eq!(site.require("war.name").unwrap(), "siteA");
    assert_eq!(site.name(), "siteA");
}

#[test]
fn unsupported_dialect_row_is_rejected() {
    let file = sites_file(
        "dao.db,jdbc.URL,tomcat.url,tomcat.host,tomcat.modules\n\
         DB2,jdbc:db2://x,http://web03:8080,web03,core\n",
    );

    let rows = read_sites(file.path()).unwrap();
    let err = SiteConfig::validate(rows.into_iter().next().unwrap()).unwrap_err();
    assert!(matches!(err, DeployError::UnsupportedDialect(_)));
}

#[test]
fn values_are_trimmed() {
    let file = sites_file(
        "dao.db,jdbc.URL,tomcat.url,tomcat.host,tomcat.modules\n\
         Oracle , jdbc:x , http://web01:8080 , web01 , core \n",
    );

    let rows = read_sites(file.path()).unwrap();
    assert_eq!(rows[0]["tomcat.host"], "web01");
}

#[test]
fn missing_file_is_a_config_error() {
    let err = read_sites(std::path::Path::new("/nonexistent/sites.csv")).unwrap_err();
    assert!(matches!(err, DeployError::Config(_)));
}
