pub mod config;
pub mod contingency;
pub mod mcnemar;
pub mod pairs;
pub mod queries;
pub mod report;
pub mod sample;
pub mod store;
mod util;

pub use anyhow::{Context, Error};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt, str::FromStr};

pub use crate::{
    config::{AnalysisConfig, Config},
    contingency::ContingencyTable,
    mcnemar::{McNemar, McNemarOptions},
    pairs::MatchedPair,
    report::{Report, YearResult},
    store::Store,
    util::header,
};

pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
pub type ProfileId = i64;
/// Matching stratum assigned by the upstream matching procedure.
pub type Subclass = i64;
/// Simulation year, starting at 1.
pub type Year = u32;

/// The seed used for control sampling unless configured otherwise.
pub const DEFAULT_SEED: u64 = 52;

/// A disease category with a per-year flag in the upstream flag tables.
///
/// Serialized by name. Config files and the command line both parse through `FromStr`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, SerializeDisplay, DeserializeFromStr,
)]
pub enum Category {
    Diabetes,
    Cardio,
    Dementia,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Diabetes, Category::Cardio, Category::Dementia];

    /// The column holding this category's flag in both flag tables.
    pub fn flag_column(self) -> &'static str {
        match self {
            Category::Diabetes => "sp_diabetes_flag",
            Category::Cardio => "cardiovascular",
            Category::Dementia => "dementia_flag",
        }
    }

    /// The name accepted by `FromStr`.
    pub fn name(self) -> &'static str {
        match self {
            Category::Diabetes => "diabetes",
            Category::Cardio => "cardio",
            Category::Dementia => "dementia",
        }
    }

    /// Human readable label, used for table headings.
    pub fn label(self) -> &'static str {
        match self {
            Category::Diabetes => "Diabetes",
            Category::Cardio => "Cardiovascular Disease",
            Category::Dementia => "Dementia",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a category name is not one of `diabetes`, `cardio` or `dementia`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown disease category \"{0}\" (expected one of diabetes, cardio, dementia)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|cat| cat.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

/// Which flag table the treated side of a pair is read from.
///
/// Controls are always read from the observed table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, SerializeDisplay, DeserializeFromStr,
)]
pub enum FlagSource {
    /// Disease status as recorded under the real treatment assignment.
    Observed,
    /// Counterfactual disease status under the simulated treatment.
    Simulated,
}

impl FlagSource {
    pub fn table(self) -> &'static str {
        match self {
            FlagSource::Observed => "annual_matched_profile_flags",
            FlagSource::Simulated => "annual_simulated_treatment_flags",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlagSource::Observed => "Baseline",
            FlagSource::Simulated => "Simulated Treatment",
        }
    }
}

impl fmt::Display for FlagSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FlagSource::Observed => f.write_str("observed"),
            FlagSource::Simulated => f.write_str("simulated"),
        }
    }
}

impl FromStr for FlagSource {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "observed" | "baseline" => Ok(FlagSource::Observed),
            "simulated" => Ok(FlagSource::Simulated),
            other => Err(anyhow::format_err!(
                "unknown flag source \"{}\" (expected observed or simulated)",
                other
            )),
        }
    }
}

/// Disease status of one side of a pair.
///
/// The discriminant is the axis index in a contingency table: disease comes first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Status {
    Disease = 0,
    NoDisease = 1,
}

impl Status {
    /// Only the flag values 1 and 0 carry a status, everything else (including NULL) is missing.
    pub fn from_flag(flag: Option<i64>) -> Option<Self> {
        match flag? {
            1 => Some(Status::Disease),
            0 => Some(Status::NoDisease),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn category_names() {
        assert_eq!("dementia".parse::<Category>().unwrap(), Category::Dementia);
        assert_eq!("Cardio".parse::<Category>().unwrap(), Category::Cardio);
        assert_eq!(Category::Diabetes.flag_column(), "sp_diabetes_flag");
        assert_eq!(Category::Cardio.flag_column(), "cardiovascular");
    }

    #[test]
    fn unknown_category() {
        let err = "asthma".parse::<Category>().unwrap_err();
        assert_eq!(err, UnknownCategory("asthma".into()));
    }

    #[test]
    fn flag_source() {
        assert_eq!("baseline".parse::<FlagSource>().unwrap(), FlagSource::Observed);
        assert_eq!(FlagSource::Simulated.table(), "annual_simulated_treatment_flags");
        assert!("counterfactual".parse::<FlagSource>().is_err());
    }

    #[test]
    fn status_from_flag() {
        assert_eq!(Status::from_flag(Some(1)), Some(Status::Disease));
        assert_eq!(Status::from_flag(Some(0)), Some(Status::NoDisease));
        assert_eq!(Status::from_flag(Some(2)), None);
        assert_eq!(Status::from_flag(None), None);
    }
}
