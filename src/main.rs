use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use warship::cli::{Cli, Commands, Display, OutputFormat};
use warship::config::{read_sites, DeployConfig, SiteConfig};
use warship::deploy::{DeploymentResult, Orchestrator};
use warship::error::Result;
use warship::process::SystemRunner;
use warship::vcs::FileCounterStore;
use warship::{MavenBuilder, SvnManager, TomcatManager};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(all_succeeded) if all_succeeded => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            Display::new().print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warship=debug")
    } else {
        EnvFilter::new("warship=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

async fn run(cli: Cli) -> Result<bool> {
    let display = Display::new();
    let config = DeployConfig::load(&cli.config).await?;

    match cli.command {
        Commands::Deploy { sites, site } => {
            cmd_deploy(&display, &config, &sites, site.as_deref(), cli.output).await
        }
        Commands::Check { sites } => cmd_check(&display, &config, &sites),
        Commands::Init => cmd_init(&display, &config, &cli.config).await,
    }
}

fn load_sites(path: &Path, filter: Option<&str>) -> Result<Vec<SiteConfig>> {
    let mut sites = Vec::new();
    for row in read_sites(path)? {
        let site = SiteConfig::validate(row)?;
        if let Some(filter) = filter {
            if site.name() != filter {
                continue;
            }
        }
        sites.push(site);
    }
    Ok(sites)
}

async fn cmd_deploy(
    display: &Display,
    config: &DeployConfig,
    sites_path: &Path,
    filter: Option<&str>,
    output: OutputFormat,
) -> Result<bool> {
    let sites = load_sites(sites_path, filter)?;
    if sites.is_empty() {
        display.print_warning("No sites to deploy.");
        return Ok(true);
    }

    let runner = Arc::new(SystemRunner);
    let counter = Arc::new(FileCounterStore::new(config.tag.counter_file.clone()));
    let vcs = Arc::new(SvnManager::new(
        config.svn.clone(),
        config.tag.clone(),
        runner.clone(),
        counter,
    ));
    let builder = Arc::new(MavenBuilder::new(config.build.clone(), runner.clone()));
    let service = Arc::new(TomcatManager::new(config.service.clone(), runner));
    let orchestrator = Orchestrator::new(vcs, builder, service);

    // One site fully deployed before the next begins; no cross-site
    // concurrency.
    let mut results: Vec<DeploymentResult> = Vec::with_capacity(sites.len());
    for site in &sites {
        results.push(orchestrator.deploy(site).await);
    }

    let all_succeeded = results.iter().all(|r| r.success);
    match output {
        OutputFormat::Text => {
            for result in &results {
                display.print_result(result);
            }
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&results)
                    .unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
            );
        }
    }

    Ok(all_succeeded)
}

fn cmd_check(display: &Display, config: &DeployConfig, sites_path: &Path) -> Result<bool> {
    config.validate()?;
    let sites = load_sites(sites_path, None)?;

    display.print_success(&format!("Settings valid, {} site(s) found.", sites.len()));
    for site in &sites {
        let war_name = site.require("war.name")?;
        let host = site.require("tomcat.host")?;
        display.print_info(&format!(
            "{} -> {}/webapps/{}.war on {}",
            site.name(),
            config.service.catalina_home.display(),
            war_name,
            host
        ));
    }
    Ok(true)
}

async fn cmd_init(display: &Display, config: &DeployConfig, path: &Path) -> Result<bool> {
    if path.exists() {
        display.print_warning(&format!("{} already exists.", path.display()));
        return Ok(true);
    }
    config.save(path).await?;
    info!(path = %path.display(), "Wrote default settings");
    display.print_success(&format!("Wrote default settings to {}.", path.display()));
    Ok(true)
}
