//! CLI handlers for the `warden config` subcommand.

use anyhow::Result;
use warden_config::{ResolvedConfig, ShowFormat};

use super::CliContext;
use crate::config_bridge;
use crate::theme::Theme;

/// Show the resolved configuration with source annotations.
pub(crate) fn show_config(
    resolved: &ResolvedConfig,
    format: ShowFormat,
    section: Option<&str>,
) -> Result<()> {
    let output = resolved.show(format, section).map_err(|_| match section {
        Some(name) => anyhow::anyhow!("unknown config section '{name}'"),
        None => anyhow::anyhow!("failed to format config"),
    })?;
    println!("{output}");
    Ok(())
}

/// Print the limits the safety layer would run with.
#[allow(clippy::unnecessary_wraps)]
pub(crate) fn check_config(ctx: &CliContext, loaded_files: &[String]) -> Result<()> {
    let limits = config_bridge::to_rate_limit_config(&ctx.config);
    let sweep = config_bridge::to_sweep_config(&ctx.config);

    println!("{}", Theme::success("Configuration is valid."));
    println!(
        "{}",
        Theme::kv(
            "Approvals",
            &format!("valid for {}s", config_bridge::approval_ttl(&ctx.config).as_secs())
        )
    );
    println!(
        "{}",
        Theme::kv(
            "Rate limit",
            &format!(
                "{} per {}s per principal",
                limits.capacity,
                limits.refill_period.as_secs()
            )
        )
    );
    println!(
        "{}",
        Theme::kv(
            "Sweeper",
            &format!(
                "every {}s, idle buckets dropped after {}s",
                sweep.interval.as_secs(),
                sweep.bucket_idle.as_secs()
            )
        )
    );
    println!(
        "{}",
        Theme::kv(
            "Vault",
            &config_bridge::vault_dir(&ctx.config, &ctx.home)
                .display()
                .to_string()
        )
    );

    if loaded_files.is_empty() {
        println!("\n{}", Theme::dimmed("No config file found; using defaults."));
    } else {
        println!("\nLoaded files:");
        for path in loaded_files {
            println!("  - {path}");
        }
    }
    Ok(())
}
