use crate::config::PipelineConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Environment variable prefix; nested keys use `__` (e.g. `COINRISK_ALERTS__THRESHOLD`).
pub const ENV_PREFIX: &str = "COINRISK_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads pipeline configuration by merging defaults, TOML, environment variables, and JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load() -> Result<PipelineConfig> {
        Self::load_from("config/Pipeline.toml")
    }

    /// Loads pipeline configuration from a specific TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<PipelineConfig> {
        let config: PipelineConfig = Self::base()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Pipeline.json"))
            .extract()?;

        config.weights.validate()?;
        tracing::debug!(path = %path.as_ref().display(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Loads pipeline configuration with a specific profile.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<PipelineConfig> {
        let config: PipelineConfig = Self::base()
            .merge(Toml::file("config/Pipeline.toml"))
            .merge(Toml::file(format!("config/Pipeline.{profile}.toml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Pipeline.json"))
            .extract()?;

        config.weights.validate()?;
        tracing::debug!(profile, "Loaded pipeline configuration");
        Ok(config)
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(PipelineConfig::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FillMethod;
    use crate::rule::ResampleRule;
    use crate::weights::RiskComponent;

    #[test]
    fn missing_files_yield_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().expect("defaults should load");
            assert_eq!(config, PipelineConfig::default());
            Ok(())
        });
    }

    #[test]
    fn toml_and_env_override_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Pipeline.toml",
                r#"
                [resample]
                rule = "1 day"

                [normalize]
                fill_method = "drop"

                [weights]
                volatility = 0.5
                momentum = 0.5
                "#,
            )?;
            jail.set_env("COINRISK_ALERTS__THRESHOLD", "0.02");

            let config = ConfigLoader::load().expect("config should load");
            assert_eq!(config.resample.rule, Some(ResampleRule::daily()));
            assert_eq!(config.normalize.fill_method, FillMethod::Drop);
            assert!((config.alerts.threshold - 0.02).abs() < f64::EPSILON);
            assert_eq!(config.weights.get(RiskComponent::Volatility), Some(0.5));
            Ok(())
        });
    }

    #[test]
    fn negative_weight_is_rejected() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Pipeline.toml",
                r#"
                [weights]
                liquidity = -1.0
                "#,
            )?;
            assert!(ConfigLoader::load().is_err());
            Ok(())
        });
    }
}
