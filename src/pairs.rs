//! Matched-pair retrieval.
//!
//! For a year, each treated subject is joined to the single control sampled from its subclass.
//! Subclasses missing either side produce no pair.
use crate::{
    sample,
    store::{Store, SubjectFlag},
    Category, FlagSource, ProfileId, Result, Status, Subclass, Year,
};
use qu::ick_use::*;
use serde::Serialize;
use std::collections::BTreeMap;

/// A treated subject joined to the control sampled from the same subclass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchedPair {
    pub subclass: Subclass,
    pub profile_id_treated: ProfileId,
    /// The treated subject's category flag; `None` when missing for the year.
    pub flag_treated: Option<i64>,
    pub profile_id_control: ProfileId,
    /// The control subject's category flag; `None` when missing for the year.
    pub flag_control: Option<i64>,
}

impl MatchedPair {
    /// `(control, treated)` status, or `None` if either side has no usable flag.
    pub fn statuses(&self) -> Option<(Status, Status)> {
        Some((
            Status::from_flag(self.flag_control)?,
            Status::from_flag(self.flag_treated)?,
        ))
    }
}

/// Fetch the matched pairs for one year.
///
/// Controls are sampled with `seed`; the same seed against the same data gives the same pairs.
pub fn retrieve(
    store: &Store,
    year: Year,
    category: Category,
    source: FlagSource,
    seed: u64,
) -> Result<Vec<MatchedPair>> {
    let treated = store.treated_subjects(year, category, source)?;
    let candidates = store.control_candidates(year, category)?;
    let candidate_count = candidates.len();
    let controls = sample::first_per_stratum(candidates, seed);
    let pairs = join(&treated, &controls);
    event!(
        Level::DEBUG,
        "year {}: {} treated, {} control candidates in {} subclasses, {} pairs",
        year,
        treated.len(),
        candidate_count,
        controls.len(),
        pairs.len()
    );
    Ok(pairs)
}

/// Inner join of treated subjects to sampled controls on subclass.
///
/// `controls` should hold at most one row per subclass. If it holds more, the first is used.
pub fn join(treated: &[SubjectFlag], controls: &[SubjectFlag]) -> Vec<MatchedPair> {
    let mut by_subclass = BTreeMap::new();
    for control in controls {
        by_subclass.entry(control.subclass).or_insert(control);
    }
    treated
        .iter()
        .filter_map(|t| {
            let c = by_subclass.get(&t.subclass)?;
            Some(MatchedPair {
                subclass: t.subclass,
                profile_id_treated: t.profile_id,
                flag_treated: t.flag,
                profile_id_control: c.profile_id,
                flag_control: c.flag,
            })
        })
        .collect()
}
