//! `cooldown config`: print the effective configuration.

use cooldown_core::CooldownConfig;

/// Entry point for `cooldown config`.
pub fn cmd_config(config: &CooldownConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
