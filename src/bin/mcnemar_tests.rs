// Matched case-control McNemar tests on baseline and simulated treatment profiles.
//
// Each matched pair holds one treated subject and one control picked at random (but
// reproducibly) from the treated subject's subclass. If treatment is unrelated to disease
// status, discordant pairs should split about evenly between "only the control has it" and
// "only the treated subject has it"; the test statistic measures the imbalance.
use clap::Parser;
use hbs_analysis::{report, Category, Config, FlagSource, MatchedPair, Report, Store, Year};
use qu::ick_use::*;
use std::path::PathBuf;

#[derive(Parser)]
struct Opt {
    /// Config file. Defaults to `hbs.toml` in the working directory, if present.
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Access profile from the config file to take the database location from.
    #[clap(short, long)]
    access: Option<String>,
    /// Database to read, overriding the access profile.
    #[clap(short, long)]
    database: Option<PathBuf>,
    /// Disease category: diabetes, cardio or dementia.
    #[clap(long)]
    category: Option<Category>,
    /// Flag source(s) for treated subjects: observed or simulated. Repeatable.
    #[clap(short, long)]
    source: Vec<FlagSource>,
    #[clap(long)]
    from_year: Option<Year>,
    #[clap(long)]
    to_year: Option<Year>,
    /// Seed for sampling one control per subclass.
    #[clap(long)]
    seed: Option<u64>,
    /// Significance level.
    #[clap(long)]
    alpha: Option<f64>,
    /// Use the exact binomial test.
    #[clap(long)]
    exact: bool,
    /// Don't apply the continuity correction.
    #[clap(long)]
    no_correction: bool,
    /// Only print the summary, not each year's contingency table.
    #[clap(long)]
    no_tables: bool,
    /// Write the per-year statistics to this CSV file.
    #[clap(long)]
    summary_out: Option<PathBuf>,
    /// Write every matched pair to this CSV file.
    #[clap(long)]
    pairs_out: Option<PathBuf>,
    /// If set, allow overwriting existing output files
    #[clap(long)]
    overwrite: bool,
}

impl Opt {
    fn apply(&self, config: &mut Config) {
        if let Some(access) = &self.access {
            config.access = access.clone();
        }
        let analysis = &mut config.analysis;
        if let Some(category) = self.category {
            analysis.category = category;
        }
        if !self.source.is_empty() {
            analysis.sources = self.source.clone();
        }
        if let Some(year) = self.from_year {
            analysis.first_year = year;
        }
        if let Some(year) = self.to_year {
            analysis.last_year = year;
        }
        if let Some(seed) = self.seed {
            analysis.seed = seed;
        }
        if let Some(alpha) = self.alpha {
            analysis.alpha = alpha;
        }
        analysis.exact |= self.exact;
        if self.no_correction {
            analysis.correction = false;
        }
    }
}

#[qu::ick]
pub fn main(opt: Opt) -> Result {
    let mut config = Config::load_or_default(opt.config.as_deref())?;
    opt.apply(&mut config);
    config.validate()?;

    let database = match &opt.database {
        Some(path) => path.clone(),
        None => config.database()?.to_owned(),
    };
    let store = Store::open(&database)?;
    event!(
        Level::INFO,
        "{} matched profiles in \"{}\"",
        store.count_profiles()?,
        database.display()
    );

    let mut pairs_writer = match &opt.pairs_out {
        Some(path) => Some(report::create_csv(path, opt.overwrite)?),
        None => None,
    };

    let mut reports = vec![];
    for source in config.analysis.sources.iter().copied() {
        let source_report = match pairs_writer.as_mut() {
            Some(writer) => {
                let mut write = |year: Year, pairs: &[MatchedPair]| {
                    report::write_pairs(writer, year, pairs)
                };
                Report::run(&store, source, &config.analysis, Some(&mut write))?
            }
            None => Report::run(&store, source, &config.analysis, None)?,
        };
        source_report.print(!opt.no_tables);
        reports.push(source_report);
    }

    if let Some(mut writer) = pairs_writer {
        writer.flush().context("writing pairs")?;
    }

    if let Some(path) = &opt.summary_out {
        report::save_summaries(&reports, path, opt.overwrite)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn year_tables_printed_by_default() {
        let opt = Opt::try_parse_from(["mcnemar_tests"]).unwrap();
        assert!(!opt.no_tables);
        let opt = Opt::try_parse_from(["mcnemar_tests", "--no-tables"]).unwrap();
        assert!(opt.no_tables);
    }

    #[test]
    fn flags_override_config() {
        let opt = Opt::try_parse_from([
            "mcnemar_tests",
            "--category",
            "Cardio",
            "-s",
            "simulated",
            "--to-year",
            "5",
            "--no-correction",
        ])
        .unwrap();
        let mut config = Config::default();
        opt.apply(&mut config);
        config.validate().unwrap();
        assert_eq!(config.analysis.category, Category::Cardio);
        assert_eq!(config.analysis.sources, [FlagSource::Simulated]);
        assert_eq!(config.years(), 1..=5);
        assert!(!config.analysis.correction);
    }
}
