use console::style;

use crate::deploy::{DeploymentResult, StepResult};

pub struct Display;

impl Display {
    pub fn new() -> Self {
        Self
    }

    pub fn print_header(&self, text: &str) {
        println!();
        println!("{}", style(text).bold().cyan());
        println!("{}", style("═".repeat(60)).dim());
    }

    pub fn print_result(&self, result: &DeploymentResult) {
        self.print_header(&format!("Site: {}", result.site));

        self.print_step("version control", &result.version_control);
        self.print_step("preparation", &result.preparation);
        self.print_step("service swap", &result.service);

        println!();
        if result.success {
            println!("{}", style("✓ Deployment succeeded").green().bold());
        } else {
            println!("{}", style("✗ Deployment failed").red().bold());
        }
    }

    fn print_step(&self, name: &str, step: &StepResult) {
        let marker = if step.success {
            style("✓").green()
        } else {
            style("✗").red()
        };
        let note = step
            .detail
            .as_deref()
            .or(step.error.as_deref())
            .unwrap_or("");
        println!("  {} {:<16} {}", marker, name, style(note).dim());
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", style("✓").green().bold(), message);
    }

    pub fn print_warning(&self, message: &str) {
        println!("{} {}", style("!").yellow().bold(), message);
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("  {}", style(message).dim());
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}
