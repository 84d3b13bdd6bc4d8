//! Vault command: store, read and rotate credentials.

use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use warden_core::PrincipalId;
use warden_crypto::{Keyring, SealingKey};
use zeroize::Zeroizing;

use super::{CliContext, keys};
use crate::config_bridge;
use crate::theme::Theme;

/// Store a credential read from `file`, or stdin when absent.
pub(crate) fn save(ctx: &CliContext, principal: &str, file: Option<&Path>) -> Result<()> {
    ctx.ensure_home()?;
    let principal = PrincipalId::new(principal);
    let secret = match file {
        Some(path) => Zeroizing::new(
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => read_stdin()?,
    };
    if secret.is_empty() {
        bail!("refusing to store an empty credential");
    }

    let (vault, _) = config_bridge::open_vault(&ctx.config, &ctx.home, &ctx.env)?;
    vault.save(&principal, &secret)?;
    eprintln!(
        "{}",
        Theme::success(&format!("Stored credential for {principal}"))
    );
    Ok(())
}

/// Write a credential to stdout, byte for byte.
pub(crate) fn load(ctx: &CliContext, principal: &str) -> Result<()> {
    ctx.ensure_home()?;
    let principal = PrincipalId::new(principal);
    let (vault, _) = config_bridge::open_vault(&ctx.config, &ctx.home, &ctx.env)?;

    let secret = vault.load(&principal).map_err(|e| {
        if e.requires_reauthentication() {
            anyhow::anyhow!("{e}; the principal needs to authenticate again")
        } else {
            e.into()
        }
    })?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&secret)?;
    stdout.flush()?;
    Ok(())
}

/// Remove a stored credential.
pub(crate) fn delete(ctx: &CliContext, principal: &str) -> Result<()> {
    ctx.ensure_home()?;
    let principal = PrincipalId::new(principal);
    let (vault, _) = config_bridge::open_vault(&ctx.config, &ctx.home, &ctx.env)?;

    if vault.delete(&principal)? {
        println!("{}", Theme::success(&format!("Deleted credential for {principal}")));
    } else {
        println!("{}", Theme::info(&format!("No credential stored for {principal}")));
    }
    Ok(())
}

/// List principals with a stored credential.
pub(crate) fn list(ctx: &CliContext) -> Result<()> {
    ctx.ensure_home()?;
    let (vault, _) = config_bridge::open_vault(&ctx.config, &ctx.home, &ctx.env)?;
    let principals = vault.list_principals()?;

    if principals.is_empty() {
        println!("{}", Theme::info("No credentials stored."));
        return Ok(());
    }

    println!("\n{}", Theme::header("Stored credentials"));
    for principal in &principals {
        println!("  {principal}");
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} principal(s) in {}", principals.len(), vault.root().display()))
    );
    Ok(())
}

/// Re-seal every record with the current key, reading old records with the
/// key in `previous_key_file`.
pub(crate) fn rotate(ctx: &CliContext, previous_key_file: &Path) -> Result<()> {
    ctx.ensure_home()?;
    let previous = SealingKey::load(previous_key_file).with_context(|| {
        format!(
            "failed to load previous key from {}",
            previous_key_file.display()
        )
    })?;
    let (current, source) = config_bridge::resolve_vault_key(&ctx.config, &ctx.home, &ctx.env)?;
    if previous.key_id() == current.key_id() {
        bail!("the previous key is the current key ({source}); nothing to rotate");
    }

    let current_id = current.key_id();
    let keyring = Keyring::new(current).with_retired(previous);
    let vault = config_bridge::open_vault_with(&ctx.config, &ctx.home, keyring)?;
    let count = vault.reencrypt_all()?;

    println!(
        "{}",
        Theme::success(&format!("Re-sealed {count} credential(s) with key {current_id}"))
    );

    // No record needs the backup left by `key generate --force` any more.
    let key_path = config_bridge::key_file(&ctx.config, &ctx.home);
    if previous_key_file == keys::previous_key_path(&key_path) {
        std::fs::remove_file(previous_key_file).with_context(|| {
            format!(
                "records were re-sealed but {} could not be removed",
                previous_key_file.display()
            )
        })?;
        tracing::info!(path = %previous_key_file.display(), "Removed retired vault key");
        println!(
            "{}",
            Theme::info(&format!("Removed {}", previous_key_file.display()))
        );
    }
    Ok(())
}

/// Read stdin, dropping one trailing newline left by `echo` or a terminal.
fn read_stdin() -> Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(Vec::new());
    std::io::stdin()
        .read_to_end(&mut buf)
        .context("failed to read credential from stdin")?;
    strip_trailing_newline(&mut buf);
    Ok(buf)
}

fn strip_trailing_newline(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_trailing_newline() {
        let mut a = b"token\n".to_vec();
        strip_trailing_newline(&mut a);
        assert_eq!(a, b"token");

        let mut b = b"token\r\n".to_vec();
        strip_trailing_newline(&mut b);
        assert_eq!(b, b"token");

        let mut c = b"token\n\n".to_vec();
        strip_trailing_newline(&mut c);
        assert_eq!(c, b"token\n");

        let mut d = b"token".to_vec();
        strip_trailing_newline(&mut d);
        assert_eq!(d, b"token");
    }
}
