//! Key command: manage the vault sealing key.

use std::path::PathBuf;

use anyhow::{Result, bail};
use warden_crypto::SealingKey;

use super::CliContext;
use crate::config_bridge::{self, KeySource};
use crate::theme::Theme;

/// Show the id and source of the key the vault would use.
pub(crate) fn show_key(ctx: &CliContext) -> Result<()> {
    ctx.ensure_home()?;
    let (key, source) = config_bridge::resolve_vault_key(&ctx.config, &ctx.home, &ctx.env)?;

    println!("\n{}", Theme::header("Vault Key"));
    println!("{}", Theme::kv("Key ID", &key.key_id().to_hex()));
    println!("{}", Theme::kv("Source", &source.to_string()));
    println!();
    Ok(())
}

/// Path the replaced key is moved to by `key generate --force`.
pub(crate) fn previous_key_path(key_file: &std::path::Path) -> PathBuf {
    let mut name = key_file.as_os_str().to_owned();
    name.push(".previous");
    PathBuf::from(name)
}

/// Generate a key file. An existing key is only replaced with `force`, and
/// is kept next to the new one so records can be rotated.
pub(crate) fn generate_key(ctx: &CliContext, force: bool) -> Result<()> {
    ctx.ensure_home()?;
    let key_path = config_bridge::key_file(&ctx.config, &ctx.home);

    if key_path.exists() {
        if !force {
            bail!(
                "a key already exists at {}; pass --force to replace it",
                key_path.display()
            );
        }
        let previous = previous_key_path(&key_path);
        if previous.exists() {
            bail!(
                "{} still holds the key replaced last time; run `warden vault rotate \
                 --previous-key-file {}` before replacing the key again",
                previous.display(),
                previous.display()
            );
        }
        std::fs::rename(&key_path, &previous)?;
        println!(
            "{}",
            Theme::warning(&format!("Previous key moved to {}", previous.display()))
        );
        println!(
            "{}",
            Theme::info(&format!(
                "Run `warden vault rotate --previous-key-file {}` to re-seal stored credentials.",
                previous.display()
            ))
        );
    }

    let key = SealingKey::load_or_generate(&key_path)?;
    tracing::info!(key_id = %key.key_id(), path = %key_path.display(), "Vault key generated");

    println!("{}", Theme::success("New key generated."));
    println!("{}", Theme::kv("Key ID", &key.key_id().to_hex()));
    println!(
        "{}",
        Theme::kv("Key file", &KeySource::File(key_path).to_string())
    );

    if let Some(var) = [
        config_bridge::VAULT_KEY_VAR,
        config_bridge::LEGACY_VAULT_KEY_VAR,
    ]
    .into_iter()
    .find(|v| ctx.env.contains_key(*v))
    {
        println!(
            "{}",
            Theme::warning(&format!("${var} is set and takes precedence over the key file."))
        );
    }
    println!();
    Ok(())
}
