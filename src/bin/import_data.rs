use clap::Parser;
use hbs_analysis::{
    store::{Extract, Store},
    FlagSource,
};
use qu::ick_use::*;
use std::path::PathBuf;

/// Load CSV extracts of the matched cohort into a SQLite database.
///
/// Column headers must match the table columns: `profile_id,subclass,treated` for profiles and
/// `profile_id,year,sp_diabetes_flag,cardiovascular,dementia_flag,death_flag` for flag tables.
#[derive(Parser)]
struct Opt {
    /// The database to create or add to.
    database: PathBuf,
    /// Extract of `matched_profiles`.
    #[clap(long)]
    profiles: Option<PathBuf>,
    /// Extract of `annual_matched_profile_flags`.
    #[clap(long)]
    observed: Option<PathBuf>,
    /// Extract of `annual_simulated_treatment_flags`.
    #[clap(long)]
    simulated: Option<PathBuf>,
}

#[qu::ick]
fn main(opt: Opt) -> Result {
    let imports = [
        (Extract::MatchedProfiles, opt.profiles),
        (Extract::Flags(FlagSource::Observed), opt.observed),
        (Extract::Flags(FlagSource::Simulated), opt.simulated),
    ];
    ensure!(
        imports.iter().any(|(_, path)| path.is_some()),
        "nothing to import: pass at least one of --profiles, --observed, --simulated"
    );

    let mut store = Store::create(&opt.database)?;
    for (extract, path) in imports {
        if let Some(path) = path {
            store.import_csv(extract, &path)?;
        }
    }
    event!(
        Level::INFO,
        "\"{}\" now holds {} matched profiles",
        opt.database.display(),
        store.count_profiles()?
    );
    Ok(())
}
