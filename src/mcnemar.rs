//! McNemar's test for paired binary outcomes.
//!
//! Only the discordant cells of the table matter: `b`, the pairs where only the control has the
//! disease, and `c`, the pairs where only the treated subject has it. Under the null hypothesis
//! (disease status unrelated to treatment arm) a discordant pair is equally likely to fall either
//! way.
use crate::{ContingencyTable, Result};
use serde::{Deserialize, Serialize};
use statrs::{
    distribution::{Binomial, DiscreteCDF},
    function::erf::erfc,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct McNemarOptions {
    /// Use the exact binomial distribution rather than the chi-square approximation.
    pub exact: bool,
    /// Subtract 1 from `|b - c|` before squaring (chi-square only).
    pub correction: bool,
}

impl Default for McNemarOptions {
    fn default() -> Self {
        Self {
            exact: false,
            correction: true,
        }
    }
}

/// The outcome of a McNemar test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct McNemar {
    /// The chi-square statistic, or `min(b, c)` for the exact test.
    pub statistic: f64,
    pub p_value: f64,
}

/// Which arm the discordant pairs lean towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// More pairs where only the control has the disease.
    FavoursTreatment,
    /// More pairs where only the treated subject has the disease.
    FavoursControl,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::FavoursTreatment => f.write_str("favours treatment"),
            Direction::FavoursControl => f.write_str("favours control"),
            Direction::Neutral => f.write_str("neutral"),
        }
    }
}

impl McNemar {
    /// Run the test on a table.
    ///
    /// A table with no discordant pairs gives a statistic of 0 and a p-value of 1.
    pub fn test(table: &ContingencyTable, options: McNemarOptions) -> Result<Self> {
        let b = table.control_only();
        let c = table.treated_only();
        if b + c == 0 {
            return Ok(McNemar {
                statistic: 0.,
                p_value: 1.,
            });
        }
        if options.exact {
            Self::exact(b, c)
        } else {
            Ok(Self::chi_square(b, c, options.correction))
        }
    }

    fn chi_square(b: u64, c: u64, correction: bool) -> Self {
        let diff = (b as f64 - c as f64).abs();
        let diff = if correction { diff - 1. } else { diff };
        let statistic = diff * diff / (b + c) as f64;
        McNemar {
            statistic,
            p_value: chi_square_1_sf(statistic),
        }
    }

    fn exact(b: u64, c: u64) -> Result<Self> {
        let k = b.min(c);
        let binom = Binomial::new(0.5, b + c)?;
        Ok(McNemar {
            statistic: k as f64,
            p_value: (2. * binom.cdf(k)).min(1.),
        })
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }

    pub fn direction(table: &ContingencyTable) -> Direction {
        let b = table.control_only();
        let c = table.treated_only();
        if b > c {
            Direction::FavoursTreatment
        } else if c > b {
            Direction::FavoursControl
        } else {
            Direction::Neutral
        }
    }
}

/// Survival function of the chi-square distribution with one degree of freedom.
///
/// Uses `P(X > x) = erfc(sqrt(x / 2))`, which keeps precision for very small p-values.
fn chi_square_1_sf(x: f64) -> f64 {
    if x <= 0. {
        return 1.;
    }
    erfc((x / 2.).sqrt())
}
