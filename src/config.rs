//! Run configuration.
//!
//! Settings come from an optional TOML file (`hbs.toml` by default). Binaries apply their command
//! line overrides on top of the loaded value.
use crate::{util, Category, FlagSource, McNemarOptions, Result, Year, DEFAULT_SEED};
use qu::ick_use::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

/// The file looked for when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "hbs.toml";

/// The access profile used when none is named.
pub const DEFAULT_ACCESS: &str = "remote";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Which entry of `access_profiles` to read the database location from.
    pub access: String,
    /// Named database locations, e.g. `[access_profiles.local]` and `[access_profiles.remote]`.
    #[serde(rename = "access_profiles")]
    pub profiles: BTreeMap<String, AccessProfile>,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessProfile {
    /// Path to the SQLite database holding the matched profiles and flag tables.
    pub database: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub category: Category,
    pub sources: Vec<FlagSource>,
    pub first_year: Year,
    pub last_year: Year,
    /// Seed for the per-subclass control sampling.
    pub seed: u64,
    /// Significance level.
    pub alpha: f64,
    /// Use the exact binomial test instead of the chi-square approximation.
    pub exact: bool,
    /// Apply the continuity correction to the chi-square statistic.
    pub correction: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            category: Category::Dementia,
            sources: vec![FlagSource::Observed, FlagSource::Simulated],
            first_year: 1,
            last_year: 30,
            seed: DEFAULT_SEED,
            alpha: 0.05,
            exact: false,
            correction: true,
        }
    }
}

impl AnalysisConfig {
    pub fn years(&self) -> RangeInclusive<Year> {
        self.first_year..=self.last_year
    }

    pub fn mcnemar_options(&self) -> McNemarOptions {
        McNemarOptions {
            exact: self.exact,
            correction: self.correction,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access: DEFAULT_ACCESS.into(),
            profiles: BTreeMap::new(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        fn inner(path: &Path) -> Result<Config> {
            let text = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&text)?;
            config.validate()?;
            Ok(config)
        }
        let path = path.as_ref();
        inner(path).with_context(|| format!("loading config from \"{}\"", path.display()))
    }

    /// Load the config at `path` if given, otherwise `hbs.toml` if it exists, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let path = Path::new(DEFAULT_CONFIG_PATH);
        if util::path_exists(path)? {
            Self::load(path)
        } else {
            event!(
                Level::DEBUG,
                "no config file at \"{}\", using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// The database location for the selected access profile.
    pub fn database(&self) -> Result<&Path> {
        match self.profiles.get(&self.access) {
            Some(profile) => Ok(&profile.database),
            None => bail!(
                "no access profile named \"{}\" (add an [access_profiles.{}] section or pass \
                 --database)",
                self.access,
                self.access
            ),
        }
    }

    pub fn years(&self) -> RangeInclusive<Year> {
        self.analysis.years()
    }

    pub fn validate(&self) -> Result {
        let a = &self.analysis;
        ensure!(a.first_year >= 1, "years start at 1");
        ensure!(
            a.first_year <= a.last_year,
            "first year ({}) is after last year ({})",
            a.first_year,
            a.last_year
        );
        ensure!(
            a.alpha > 0. && a.alpha < 1.,
            "alpha must be in (0, 1), got {}",
            a.alpha
        );
        ensure!(!a.sources.is_empty(), "at least one flag source is needed");
        Ok(())
    }
}
