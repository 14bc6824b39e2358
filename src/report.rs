//! Results of a run over a range of years.
use crate::{
    mcnemar::{Direction, McNemar, McNemarOptions},
    pairs::{self, MatchedPair},
    util, AnalysisConfig, Category, ContingencyTable, FlagSource, ProfileId, Result, Store,
    Subclass, Year,
};
use qu::ick_use::*;
use serde::Serialize;
use std::{fs, path::Path};
use term_data_table as tdt;

/// Everything computed for one year.
#[derive(Debug, Clone)]
pub struct YearResult {
    pub year: Year,
    /// Number of pairs retrieved, including those with a missing status.
    pub pairs: usize,
    pub table: ContingencyTable,
    pub test: McNemar,
}

impl YearResult {
    pub fn new(year: Year, pairs: &[MatchedPair], options: McNemarOptions) -> Result<Self> {
        let table = ContingencyTable::tabulate(pairs);
        let test = McNemar::test(&table, options)
            .with_context(|| format!("running McNemar test for year {year}"))?;
        Ok(Self {
            year,
            pairs: pairs.len(),
            table,
            test,
        })
    }

    pub fn direction(&self) -> Direction {
        McNemar::direction(&self.table)
    }
}

/// A row of the summary CSV.
#[derive(Debug, Serialize)]
struct SummaryRecord {
    category: Category,
    source: FlagSource,
    year: Year,
    pairs: usize,
    both_disease: u64,
    control_only: u64,
    treated_only: u64,
    neither: u64,
    statistic: f64,
    p_value: f64,
    significant: bool,
    direction: Direction,
}

/// A row of the pairs CSV.
#[derive(Debug, Serialize)]
struct PairRecord {
    year: Year,
    subclass: Subclass,
    profile_id_treated: ProfileId,
    flag_treated: Option<i64>,
    profile_id_control: ProfileId,
    flag_control: Option<i64>,
}

/// The per-year results for one category and flag source.
#[derive(Debug, Clone)]
pub struct Report {
    pub category: Category,
    pub source: FlagSource,
    pub alpha: f64,
    pub years: Vec<YearResult>,
}

impl Report {
    pub fn new(category: Category, source: FlagSource, alpha: f64) -> Self {
        Self {
            category,
            source,
            alpha,
            years: vec![],
        }
    }

    pub fn push(&mut self, result: YearResult) {
        self.years.push(result);
    }

    /// Retrieve, tabulate and test every configured year, one after another.
    ///
    /// If `pairs_out` is given, every retrieved pair is passed to it along with its year.
    pub fn run(
        store: &Store,
        source: FlagSource,
        analysis: &AnalysisConfig,
        mut pairs_out: Option<&mut dyn FnMut(Year, &[MatchedPair]) -> Result>,
    ) -> Result<Self> {
        let category = analysis.category;
        let options = analysis.mcnemar_options();
        let mut report = Report::new(category, source, analysis.alpha);
        for year in analysis.years() {
            let pairs = pairs::retrieve(store, year, category, source, analysis.seed)?;
            if let Some(out) = pairs_out.as_mut() {
                out(year, pairs.as_slice())?;
            }
            let result = YearResult::new(year, &pairs, options)?;
            event!(
                Level::INFO,
                "{} {} year {}: {} pairs, table {}, p = {:.6}",
                source,
                category,
                year,
                result.pairs,
                result.table,
                result.test.p_value
            );
            report.push(result);
        }
        Ok(report)
    }

    pub fn title(&self) -> String {
        format!(
            "{} McNemar tests: matched pairs of {} status",
            self.source.label(),
            self.category.label().to_lowercase()
        )
    }

    /// Years where the p-value is below `alpha`.
    pub fn significant_years(&self) -> impl Iterator<Item = &YearResult> + '_ {
        self.years
            .iter()
            .filter(|r| r.test.is_significant(self.alpha))
    }

    /// One line per year: all four cells, statistic, p-value and the direction of the discordant
    /// pairs.
    pub fn summary_table(&self) -> tdt::Table<'_> {
        use tdt::{Cell, Row, Table};
        let row = |cells: Vec<String>| {
            cells
                .into_iter()
                .fold(Row::new(), |row, cell| row.with_cell(Cell::from(cell)))
        };
        let mut table = Table::new().with_row(row(self.summary_header()));
        for r in self.years.iter() {
            table.add_row(row(self.summary_cells(r)));
        }
        table
    }

    fn summary_header(&self) -> Vec<String> {
        [
            "year",
            "pairs",
            "both disease",
            "control only",
            "treated only",
            "neither",
            "statistic",
            "p-value",
        ]
        .into_iter()
        .map(String::from)
        .chain([format!("p < {}", self.alpha), "direction".into()])
        .collect()
    }

    fn summary_cells(&self, r: &YearResult) -> Vec<String> {
        let [[both, control_only], [treated_only, neither]] = r.table.counts();
        let significant = if r.test.is_significant(self.alpha) {
            "yes"
        } else {
            "no"
        };
        vec![
            r.year.to_string(),
            r.pairs.to_string(),
            both.to_string(),
            control_only.to_string(),
            treated_only.to_string(),
            neither.to_string(),
            format!("{:.6}", r.test.statistic),
            format!("{:.6e}", r.test.p_value),
            significant.into(),
            r.direction().to_string(),
        ]
    }

    /// Print the summary, followed by each year's contingency table if `tables` is set.
    pub fn print(&self, tables: bool) {
        util::header(&self.title());
        println!("{}", self.summary_table().for_terminal());
        let significant = self.significant_years().count();
        println!(
            "{} of {} years significant at alpha = {}",
            significant,
            self.years.len(),
            self.alpha
        );
        let favouring = self
            .years
            .iter()
            .filter(|r| r.direction() == Direction::FavoursTreatment)
            .count();
        println!(
            "{} of {} years have more discordant pairs where only the control has {}",
            favouring,
            self.years.len(),
            self.category.label().to_lowercase()
        );
        if tables {
            for r in self.years.iter() {
                println!("\nYear {}:", r.year);
                println!("{}", r.table.term_table(self.category).for_terminal());
            }
        }
    }

    /// Append the summary rows to a CSV writer. Headers are written by the writer on first use.
    pub fn write_csv<W: std::io::Write>(&self, writer: &mut csv::Writer<W>) -> Result {
        for r in self.years.iter() {
            let counts = r.table.counts();
            writer.serialize(SummaryRecord {
                category: self.category,
                source: self.source,
                year: r.year,
                pairs: r.pairs,
                both_disease: counts[0][0],
                control_only: counts[0][1],
                treated_only: counts[1][0],
                neither: counts[1][1],
                statistic: r.test.statistic,
                p_value: r.test.p_value,
                significant: r.test.is_significant(self.alpha),
                direction: r.direction(),
            })?;
        }
        Ok(())
    }
}

/// Create a CSV file, refusing to replace an existing file unless `overwrite` is set.
pub fn create_csv(path: impl AsRef<Path>, overwrite: bool) -> Result<csv::Writer<fs::File>> {
    fn inner(path: &Path, overwrite: bool) -> Result<csv::Writer<fs::File>> {
        ensure!(
            overwrite || !util::path_exists(path)?,
            "file already exists (pass --overwrite to replace it)"
        );
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("could not create parent")?;
        }
        Ok(csv::Writer::from_path(path)?)
    }
    let path = path.as_ref();
    inner(path, overwrite).with_context(|| format!("creating \"{}\"", path.display()))
}

/// Write the summaries of several reports to one CSV file.
pub fn save_summaries(reports: &[Report], path: impl AsRef<Path>, overwrite: bool) -> Result {
    let path = path.as_ref();
    let mut writer = create_csv(path, overwrite)?;
    for report in reports {
        report.write_csv(&mut writer)?;
    }
    writer
        .flush()
        .with_context(|| format!("writing summary to \"{}\"", path.display()))?;
    event!(Level::INFO, "wrote summary to \"{}\"", path.display());
    Ok(())
}

/// Write matched pairs to CSV, tagged with their year.
pub fn write_pairs<W: std::io::Write>(
    writer: &mut csv::Writer<W>,
    year: Year,
    pairs: &[MatchedPair],
) -> Result {
    for pair in pairs {
        writer.serialize(PairRecord {
            year,
            subclass: pair.subclass,
            profile_id_treated: pair.profile_id_treated,
            flag_treated: pair.flag_treated,
            profile_id_control: pair.profile_id_control,
            flag_control: pair.flag_control,
        })?;
    }
    Ok(())
}
