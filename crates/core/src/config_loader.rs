use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use crate::config::EngineConfig;

const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "PARLAY_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads engine configuration by merging `config/Parlay.toml` and
    /// `PARLAY_`-prefixed environment variables over the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the merged
    /// values are out of range.
    pub fn load() -> Result<EngineConfig> {
        Self::load_from(CONFIG_DIR, None)
    }

    /// Loads engine configuration with a specific profile
    /// (`config/Parlay.{profile}.toml`) layered over the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the merged
    /// values are out of range.
    pub fn load_with_profile(profile: &str) -> Result<EngineConfig> {
        Self::load_from(CONFIG_DIR, Some(profile))
    }

    /// Loads from an explicit directory. Missing files are skipped and absent
    /// keys keep their defaults.
    ///
    /// Environment keys use `__` between section and field, e.g.
    /// `PARLAY_SEARCH__TOP_N=3`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the merged
    /// values are out of range.
    pub fn load_from(dir: impl AsRef<Path>, profile: Option<&str>) -> Result<EngineConfig> {
        let dir = dir.as_ref();
        let mut figment = Figment::new().merge(Toml::file(dir.join("Parlay.toml")));

        if let Some(profile) = profile {
            figment = figment.merge(Toml::file(dir.join(format!("Parlay.{profile}.toml"))));
        }

        let config: EngineConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to parse engine configuration")?;

        config.check().context("Invalid engine configuration")?;
        Ok(config)
    }
}
