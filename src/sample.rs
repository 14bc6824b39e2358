//! Deterministic selection of one control per subclass.
//!
//! Each candidate gets a rank key drawn from its own `Pcg64Mcg` stream, seeded from the run seed
//! and the candidate's profile id. The candidate with the smallest key in a subclass is kept
//! (ties go to the smaller profile id). Because a key depends only on `(seed, profile_id)`, the
//! selection does not depend on the order rows come back from the database, and re-running with
//! the same seed against the same data picks the same controls.
use crate::{ProfileId, Subclass};
use itertools::Itertools;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Anything that belongs to a subclass and has a profile id.
pub trait Stratified {
    fn subclass(&self) -> Subclass;
    fn profile_id(&self) -> ProfileId;
}

/// The rank key of a profile under a given seed. Lower keys win.
pub fn rank_key(seed: u64, profile_id: ProfileId) -> u64 {
    let derived_seed = seed ^ (profile_id as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
    Pcg64Mcg::seed_from_u64(derived_seed).next_u64()
}

/// Keep exactly one row per subclass, chosen by [`rank_key`].
///
/// The output is ordered by subclass. Subclasses with no rows do not appear.
pub fn first_per_stratum<T>(rows: impl IntoIterator<Item = T>, seed: u64) -> Vec<T>
where
    T: Stratified,
{
    let mut kept: Vec<T> = rows
        .into_iter()
        .map(|row| (row.subclass(), row))
        .into_group_map()
        .into_values()
        .filter_map(|group| {
            group
                .into_iter()
                .min_by_key(|row| (rank_key(seed, row.profile_id()), row.profile_id()))
        })
        .collect();
    kept.sort_by_key(|row| row.subclass());
    kept
}
