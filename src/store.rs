//! SQLite access to the matched cohort and its yearly flag tables.
//!
//! Only this module talks to the database. Everything else works on the rows it returns.
use crate::{
    queries,
    util::{bool_01, optional_flag},
    Category, FlagSource, ProfileId, Result, Subclass, Year,
};
use qu::ick_use::*;
use rusqlite::{params, Connection, OpenFlags, Statement};
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path, str::FromStr};

/// A row of `matched_profiles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub profile_id: ProfileId,
    pub subclass: Subclass,
    #[serde(deserialize_with = "bool_01")]
    pub treated: bool,
}

/// A row of either yearly flag table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRow {
    pub profile_id: ProfileId,
    pub year: Year,
    #[serde(deserialize_with = "optional_flag")]
    pub sp_diabetes_flag: Option<i64>,
    #[serde(deserialize_with = "optional_flag")]
    pub cardiovascular: Option<i64>,
    #[serde(deserialize_with = "optional_flag")]
    pub dementia_flag: Option<i64>,
    #[serde(deserialize_with = "optional_flag")]
    pub death_flag: Option<i64>,
}

impl FlagRow {
    /// A row with every flag missing.
    pub fn new(profile_id: ProfileId, year: Year) -> Self {
        Self {
            profile_id,
            year,
            sp_diabetes_flag: None,
            cardiovascular: None,
            dementia_flag: None,
            death_flag: None,
        }
    }

    pub fn with_flag(mut self, category: Category, flag: Option<i64>) -> Self {
        match category {
            Category::Diabetes => self.sp_diabetes_flag = flag,
            Category::Cardio => self.cardiovascular = flag,
            Category::Dementia => self.dementia_flag = flag,
        }
        self
    }

    pub fn with_death_flag(mut self, death_flag: Option<i64>) -> Self {
        self.death_flag = death_flag;
        self
    }
}

/// One side of a matched pair, as returned by the treated and control queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectFlag {
    pub subclass: Subclass,
    pub profile_id: ProfileId,
    /// The category flag for the queried year; `None` when NULL in the database.
    pub flag: Option<i64>,
}

impl crate::sample::Stratified for SubjectFlag {
    fn subclass(&self) -> Subclass {
        self.subclass
    }
    fn profile_id(&self) -> ProfileId {
        self.profile_id
    }
}

/// The upstream extracts that can be imported from CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    MatchedProfiles,
    Flags(FlagSource),
}

impl Extract {
    pub fn table(self) -> &'static str {
        match self {
            Extract::MatchedProfiles => "matched_profiles",
            Extract::Flags(source) => source.table(),
        }
    }
}

impl fmt::Display for Extract {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.table())
    }
}

impl FromStr for Extract {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profiles" | "matched_profiles" => Ok(Extract::MatchedProfiles),
            "observed" | "annual_matched_profile_flags" => {
                Ok(Extract::Flags(FlagSource::Observed))
            }
            "simulated" | "annual_simulated_treatment_flags" => {
                Ok(Extract::Flags(FlagSource::Simulated))
            }
            other => bail!(
                "unknown extract \"{}\" (expected profiles, observed or simulated)",
                other
            ),
        }
    }
}

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open an existing database for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )
        .with_context(|| format!("opening database \"{}\"", path.display()))?;
        event!(Level::DEBUG, "opened \"{}\" read-only", path.display());
        Ok(Self { conn })
    }

    /// Open a database for writing, creating it and its tables if needed.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )
        .with_context(|| format!("creating database \"{}\"", path.display()))?;
        let this = Self { conn };
        this.migrate()?;
        Ok(this)
    }

    /// An empty in-memory database with the tables created.
    pub fn in_memory() -> Result<Self> {
        let this = Self {
            conn: Connection::open_in_memory()?,
        };
        this.migrate()?;
        Ok(this)
    }

    /// Create the tables if they don't exist.
    pub fn migrate(&self) -> Result {
        self.conn
            .execute_batch(include_str!("../migrations/001_hbs_schema.sql"))
            .context("creating schema")?;
        Ok(())
    }

    pub fn insert_profile(&self, row: &ProfileRow) -> Result {
        self.conn.execute(
            "INSERT INTO matched_profiles (profile_id, subclass, treated) VALUES (?1, ?2, ?3)",
            params![row.profile_id, row.subclass, row.treated],
        )?;
        Ok(())
    }

    pub fn insert_flags(&self, source: FlagSource, row: &FlagRow) -> Result {
        let mut stmt = self.conn.prepare_cached(&insert_flags_sql(source))?;
        execute_insert_flags(&mut stmt, row)
    }

    /// Load a CSV extract into its table, in one transaction. Returns the number of rows loaded.
    ///
    /// Column headers must match the table's column names.
    pub fn import_csv(&mut self, extract: Extract, path: impl AsRef<Path>) -> Result<usize> {
        fn inner(store: &mut Store, extract: Extract, path: &Path) -> Result<usize> {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .trim(csv::Trim::All)
                .from_path(path)?;
            let tx = store.conn.transaction()?;
            let mut count = 0;
            match extract {
                Extract::MatchedProfiles => {
                    let mut stmt = tx.prepare(
                        "INSERT INTO matched_profiles (profile_id, subclass, treated) \
                         VALUES (?1, ?2, ?3)",
                    )?;
                    for row in reader.deserialize() {
                        let row: ProfileRow = row?;
                        stmt.execute(params![row.profile_id, row.subclass, row.treated])?;
                        count += 1;
                    }
                }
                Extract::Flags(source) => {
                    let mut stmt = tx.prepare(&insert_flags_sql(source))?;
                    for row in reader.deserialize() {
                        let row: FlagRow = row?;
                        execute_insert_flags(&mut stmt, &row)?;
                        count += 1;
                    }
                }
            }
            tx.commit()?;
            Ok(count)
        }

        let path = path.as_ref();
        let count = inner(self, extract, path).with_context(|| {
            format!("importing \"{}\" into {}", path.display(), extract)
        })?;
        event!(
            Level::INFO,
            "imported {} rows from \"{}\" into {}",
            count,
            path.display(),
            extract
        );
        Ok(count)
    }

    /// Treated subjects alive in `year`, with their `category` flag from `source`.
    pub fn treated_subjects(
        &self,
        year: Year,
        category: Category,
        source: FlagSource,
    ) -> Result<Vec<SubjectFlag>> {
        self.subject_flags(&queries::treated_query(category, source), year)
            .with_context(|| format!("querying treated subjects for year {year}"))
    }

    /// Every control subject alive in `year`, with its observed `category` flag.
    pub fn control_candidates(&self, year: Year, category: Category) -> Result<Vec<SubjectFlag>> {
        self.subject_flags(&queries::control_candidates_query(category), year)
            .with_context(|| format!("querying control candidates for year {year}"))
    }

    pub fn count_profiles(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM matched_profiles", [], |r| r.get(0))?;
        Ok(count as usize)
    }

    fn subject_flags(&self, sql: &str, year: Year) -> Result<Vec<SubjectFlag>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![year], |row| {
            Ok(SubjectFlag {
                subclass: row.get(0)?,
                profile_id: row.get(1)?,
                flag: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

fn insert_flags_sql(source: FlagSource) -> String {
    format!(
        "INSERT INTO {} (profile_id, year, sp_diabetes_flag, cardiovascular, dementia_flag, \
         death_flag) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        source.table()
    )
}

fn execute_insert_flags(stmt: &mut Statement<'_>, row: &FlagRow) -> Result {
    stmt.execute(params![
        row.profile_id,
        row.year,
        row.sp_diabetes_flag,
        row.cardiovascular,
        row.dementia_flag,
        row.death_flag
    ])?;
    Ok(())
}
