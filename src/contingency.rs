//! 2×2 tables of matched-pair outcomes.
use crate::{pairs::MatchedPair, Category, Status};
use serde::Serialize;
use std::{fmt, ops::Index};
use term_data_table as tdt;

/// Counts of matched pairs by (control status, treated status).
///
/// Rows are the control's status and columns the treated subject's, each ordered disease then
/// no disease:
///
/// |                 | treated disease | treated no disease |
/// |-----------------|-----------------|--------------------|
/// | control disease | `[0][0]`        | `[0][1]`           |
/// | control none    | `[1][0]`        | `[1][1]`           |
///
/// Pairs where either side has no usable status are not counted anywhere.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ContingencyTable {
    counts: [[u64; 2]; 2],
}

impl ContingencyTable {
    pub fn new(counts: [[u64; 2]; 2]) -> Self {
        Self { counts }
    }

    /// Count the pairs with a usable status on both sides.
    pub fn tabulate<'a>(pairs: impl IntoIterator<Item = &'a MatchedPair>) -> Self {
        let mut table = Self::default();
        for pair in pairs {
            if let Some((control, treated)) = pair.statuses() {
                table.add(control, treated);
            }
        }
        table
    }

    pub fn add(&mut self, control: Status, treated: Status) {
        self.counts[control.index()][treated.index()] += 1;
    }

    pub fn counts(&self) -> [[u64; 2]; 2] {
        self.counts
    }

    pub fn get(&self, control: Status, treated: Status) -> u64 {
        self.counts[control.index()][treated.index()]
    }

    /// Pairs where only the control has the disease.
    pub fn control_only(&self) -> u64 {
        self.get(Status::Disease, Status::NoDisease)
    }

    /// Pairs where only the treated subject has the disease.
    pub fn treated_only(&self) -> u64 {
        self.get(Status::NoDisease, Status::Disease)
    }

    pub fn discordant(&self) -> u64 {
        self.control_only() + self.treated_only()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Render with control status as rows and treated status as columns.
    pub fn term_table(&self, category: Category) -> tdt::Table<'_> {
        use tdt::{Cell, Row, Table};
        let disease = category.label().to_string();
        let no_disease = format!("No {}", category.label());
        let mut table = Table::new()
            .with_row(
                Row::new()
                    .with_cell(Cell::from(""))
                    .with_cell(Cell::from(""))
                    .with_cell(Cell::from("Treated Group"))
                    .with_cell(Cell::from("")),
            )
            .with_row(
                Row::new()
                    .with_cell(Cell::from(""))
                    .with_cell(Cell::from(""))
                    .with_cell(Cell::from(disease.clone()))
                    .with_cell(Cell::from(no_disease.clone())),
            );
        for (idx, label) in [disease, no_disease].into_iter().enumerate() {
            let group = if idx == 0 { "Control Group" } else { "" };
            table.add_row(
                Row::new()
                    .with_cell(Cell::from(group))
                    .with_cell(Cell::from(label))
                    .with_cell(Cell::from(self.counts[idx][0].to_string()))
                    .with_cell(Cell::from(self.counts[idx][1].to_string())),
            );
        }
        table
    }
}

impl Index<(Status, Status)> for ContingencyTable {
    type Output = u64;
    fn index(&self, (control, treated): (Status, Status)) -> &u64 {
        &self.counts[control.index()][treated.index()]
    }
}

impl<'a> FromIterator<&'a MatchedPair> for ContingencyTable {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = &'a MatchedPair>,
    {
        Self::tabulate(iter)
    }
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [[a, b], [c, d]] = self.counts;
        write!(f, "[[{a}, {b}], [{c}, {d}]]")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::iter;

    fn pair(control: Option<i64>, treated: Option<i64>) -> MatchedPair {
        MatchedPair {
            subclass: 0,
            profile_id_treated: 1,
            flag_treated: treated,
            profile_id_control: 2,
            flag_control: control,
        }
    }

    fn repeat(control: i64, treated: i64, n: usize) -> impl Iterator<Item = MatchedPair> {
        iter::repeat(pair(Some(control), Some(treated))).take(n)
    }

    #[test]
    fn baseline_year_one() {
        let pairs: Vec<_> = repeat(1, 1, 6572)
            .chain(repeat(1, 0, 5210))
            .chain(repeat(0, 1, 5377))
            .chain(repeat(0, 0, 32841))
            .collect();
        let table = ContingencyTable::tabulate(&pairs);
        assert_eq!(table.counts(), [[6572, 5210], [5377, 32841]]);
        assert_eq!(table.control_only(), 5210);
        assert_eq!(table.treated_only(), 5377);
        assert_eq!(table.total(), 50000);
    }

    #[test]
    fn empty() {
        let table = ContingencyTable::tabulate(&Vec::new());
        assert_eq!(table.counts(), [[0, 0], [0, 0]]);
        assert_eq!(table.total(), 0);
    }

    #[test]
    fn missing_status_not_counted() {
        let mut pairs: Vec<_> = repeat(1, 0, 3).chain(repeat(0, 0, 2)).collect();
        let before = ContingencyTable::tabulate(&pairs);
        pairs.push(pair(Some(1), None));
        pairs.push(pair(None, Some(0)));
        pairs.push(pair(Some(2), Some(1)));
        let after = ContingencyTable::tabulate(&pairs);
        assert_eq!(before, after);
        assert_eq!(after.total(), 5);
    }

    #[test]
    fn total_counts_complete_pairs() {
        let pairs: Vec<_> = (0..200)
            .map(|i| {
                let flag = |n: i64| match n % 4 {
                    0 => None,
                    1 => Some(1),
                    _ => Some(0),
                };
                pair(flag(i), flag(i / 3))
            })
            .collect();
        let complete = pairs.iter().filter(|p| p.statuses().is_some()).count() as u64;
        assert_eq!(ContingencyTable::tabulate(&pairs).total(), complete);
    }

    #[test]
    fn idempotent() {
        let pairs: Vec<_> = repeat(0, 1, 4).chain(repeat(1, 1, 7)).collect();
        assert_eq!(
            ContingencyTable::tabulate(&pairs),
            ContingencyTable::tabulate(&pairs)
        );
        let collected: ContingencyTable = pairs.iter().collect();
        assert_eq!(collected, ContingencyTable::tabulate(&pairs));
    }

    #[test]
    fn index_by_status() {
        let table = ContingencyTable::new([[1, 2], [3, 4]]);
        assert_eq!(table[(Status::Disease, Status::NoDisease)], 2);
        assert_eq!(table[(Status::NoDisease, Status::Disease)], 3);
        assert_eq!(table.to_string(), "[[1, 2], [3, 4]]");
    }
}
