pub mod classify;
pub mod model;
pub mod ratios;

use credit_pd_core::ScoringConfig;

/// `--config` file (or defaults) with `CPD_*` environment overrides applied.
pub fn load_config(path: Option<&str>) -> Result<ScoringConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(p) => ScoringConfig::from_file(p)?.with_env_overrides(),
        None => ScoringConfig::from_env(),
    };
    config.validate()?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}
