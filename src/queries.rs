//! SQL for the two sides of a matched pair.
//!
//! Table and column names are only ever taken from [`Category`] and [`FlagSource`], so the
//! generated text is one of a small, fixed set of statements. The year is always bound as `?1`.
//!
//! A subject counts as alive in a year when its flag row has `death_flag < 2`. Subjects with no
//! flag row for the year fail that test and are dropped, even though the join is a left join.
use crate::{Category, FlagSource};

/// Select every treated subject alive in the year, with its disease flag from `source`.
///
/// Columns: `subclass`, `profile_id`, `<flag>`.
pub fn treated_query(category: Category, source: FlagSource) -> String {
    let flag = category.flag_column();
    let table = source.table();
    format!(
        "SELECT mp.subclass, mp.profile_id, f.{flag}
FROM matched_profiles mp
LEFT JOIN {table} f
    ON mp.profile_id = f.profile_id
    AND f.year = ?1
WHERE mp.treated = 1
    AND f.death_flag < 2
ORDER BY mp.subclass, mp.profile_id"
    )
}

/// Select every control subject alive in the year, with its observed disease flag.
///
/// All candidates are returned; picking one per subclass happens in [`crate::sample`].
///
/// Columns: `subclass`, `profile_id`, `<flag>`.
pub fn control_candidates_query(category: Category) -> String {
    let flag = category.flag_column();
    let table = FlagSource::Observed.table();
    format!(
        "SELECT mp.subclass, mp.profile_id, f.{flag}
FROM matched_profiles mp
LEFT JOIN {table} f
    ON mp.profile_id = f.profile_id
    AND f.year = ?1
WHERE mp.treated = 0
    AND f.death_flag < 2
ORDER BY mp.subclass, mp.profile_id"
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn treated_uses_source_table() {
        let observed = treated_query(Category::Dementia, FlagSource::Observed);
        assert!(observed.contains("LEFT JOIN annual_matched_profile_flags f"));
        assert!(observed.contains("f.dementia_flag"));
        assert!(observed.contains("mp.treated = 1"));

        let simulated = treated_query(Category::Diabetes, FlagSource::Simulated);
        assert!(simulated.contains("LEFT JOIN annual_simulated_treatment_flags f"));
        assert!(simulated.contains("f.sp_diabetes_flag"));
    }

    #[test]
    fn controls_always_observed() {
        let sql = control_candidates_query(Category::Cardio);
        assert!(sql.contains("annual_matched_profile_flags"));
        assert!(!sql.contains("simulated"));
        assert!(sql.contains("f.cardiovascular"));
        assert!(sql.contains("mp.treated = 0"));
    }

    #[test]
    fn alive_filter() {
        for category in Category::ALL {
            assert!(control_candidates_query(category).contains("f.death_flag < 2"));
            assert!(treated_query(category, FlagSource::Simulated).contains("f.death_flag < 2"));
        }
    }
}
