//! The round table: one CSV row of settings per round.
//!
//! Row order is round order. The table is parsed once into typed
//! [`RoundConfig`] values; every later lookup borrows from that parse, so the
//! settings used by payoff integration and by the export are always the
//! same.
//!
//! Field conventions follow the experimenters' spreadsheets: a boolean is
//! true only when the cell reads `TRUE`, and an empty numeric cell means 0.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use bimatrix_types::{PayoffCell, PayoffMatrix, RoundConfig};
use serde::Deserialize;

use crate::config::ConfigError;

/// Column names of the round table, in the order the export appends them.
pub const ROUND_TABLE_COLUMNS: [&str; 16] = [
    "period_length",
    "num_subperiods",
    "pure_strategy",
    "shuffle_role",
    "show_at_worst",
    "show_best_response",
    "rate_limit",
    "mean_matching",
    "payoff1Aa",
    "payoff2Aa",
    "payoff1Ab",
    "payoff2Ab",
    "payoff1Ba",
    "payoff2Ba",
    "payoff1Bb",
    "payoff2Bb",
];

/// A round-table row exactly as written in the CSV file.
#[derive(Debug, Deserialize)]
struct RawRoundRow {
    #[serde(default)]
    shuffle_role: String,
    period_length: String,
    num_subperiods: String,
    #[serde(default)]
    pure_strategy: String,
    #[serde(default)]
    show_at_worst: String,
    #[serde(default)]
    show_best_response: String,
    #[serde(default)]
    rate_limit: String,
    #[serde(default)]
    mean_matching: String,
    #[serde(rename = "payoff1Aa")]
    payoff1_aa: String,
    #[serde(rename = "payoff2Aa")]
    payoff2_aa: String,
    #[serde(rename = "payoff1Ab")]
    payoff1_ab: String,
    #[serde(rename = "payoff2Ab")]
    payoff2_ab: String,
    #[serde(rename = "payoff1Ba")]
    payoff1_ba: String,
    #[serde(rename = "payoff2Ba")]
    payoff2_ba: String,
    #[serde(rename = "payoff1Bb")]
    payoff1_bb: String,
    #[serde(rename = "payoff2Bb")]
    payoff2_bb: String,
}

impl RawRoundRow {
    fn into_config(self, round: usize) -> Result<RoundConfig, ConfigError> {
        let period_length: u32 = number(round, "period_length", &self.period_length)?;
        if period_length == 0 {
            return Err(ConfigError::Parse {
                round,
                field: "period_length",
                value: self.period_length,
                reason: "round length must be at least one second".to_owned(),
            });
        }

        let cell = |row_field: &'static str,
                    row_text: &str,
                    col_field: &'static str,
                    col_text: &str| {
            Ok::<_, ConfigError>(PayoffCell::new(
                number(round, row_field, row_text)?,
                number(round, col_field, col_text)?,
            ))
        };

        Ok(RoundConfig {
            shuffle_role: flag(&self.shuffle_role),
            period_length,
            num_subperiods: number(round, "num_subperiods", &self.num_subperiods)?,
            pure_strategy: flag(&self.pure_strategy),
            show_at_worst: flag(&self.show_at_worst),
            show_best_response: flag(&self.show_best_response),
            rate_limit: number(round, "rate_limit", &self.rate_limit)?,
            mean_matching: flag(&self.mean_matching),
            payoff_matrix: PayoffMatrix::new(
                cell("payoff1Aa", &self.payoff1_aa, "payoff2Aa", &self.payoff2_aa)?,
                cell("payoff1Ab", &self.payoff1_ab, "payoff2Ab", &self.payoff2_ab)?,
                cell("payoff1Ba", &self.payoff1_ba, "payoff2Ba", &self.payoff2_ba)?,
                cell("payoff1Bb", &self.payoff1_bb, "payoff2Bb", &self.payoff2_bb)?,
            ),
        })
    }
}

fn flag(text: &str) -> bool {
    text.trim() == "TRUE"
}

fn number<T>(round: usize, field: &'static str, text: &str) -> Result<T, ConfigError>
where
    T: FromStr + Default,
    T::Err: core::fmt::Display,
{
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(T::default());
    }
    trimmed.parse().map_err(|e: T::Err| ConfigError::Parse {
        round,
        field,
        value: text.to_owned(),
        reason: e.to_string(),
    })
}

/// Parsed settings for every round of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundTable {
    rounds: Vec<RoundConfig>,
}

impl RoundTable {
    /// Wrap already-built round settings, first entry being round 1.
    pub const fn from_rounds(rounds: Vec<RoundConfig>) -> Self {
        Self { rounds }
    }

    /// Load and parse a round table CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be opened, and any
    /// error of [`Self::from_reader`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            rounds = table.num_rounds(),
            "Round table loaded"
        );
        Ok(table)
    }

    /// Parse a round table from CSV text.
    ///
    /// # Errors
    ///
    /// See [`Self::from_reader`].
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Self::from_reader(text.as_bytes())
    }

    /// Parse a round table from any CSV source with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Csv`] for structurally broken CSV or a missing
    /// column, and [`ConfigError::Parse`] for a malformed numeric cell or a
    /// zero `period_length`.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut rounds = Vec::new();
        for (index, record) in csv_reader.deserialize::<RawRoundRow>().enumerate() {
            let round = index.saturating_add(1);
            rounds.push(record?.into_config(round)?);
        }
        Ok(Self { rounds })
    }

    /// Number of rounds the table defines.
    pub fn num_rounds(&self) -> usize {
        self.rounds.len()
    }

    /// Whether `round_number` (1-based) has settings, i.e. is played.
    pub fn is_active(&self, round_number: u32) -> bool {
        self.config_for_round(round_number).is_ok()
    }

    /// Settings for the 1-based `round_number`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the round lies beyond the table
    /// (or is 0). Callers treat this as an inactive round.
    pub fn config_for_round(&self, round_number: u32) -> Result<&RoundConfig, ConfigError> {
        let missing = || ConfigError::Missing {
            round: round_number,
            available: self.rounds.len(),
        };
        let index = usize::try_from(round_number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(missing)?;
        self.rounds.get(index).ok_or_else(missing)
    }

    /// Iterate over `(round_number, settings)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &RoundConfig)> {
        (1..=u32::MAX).zip(self.rounds.iter())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bimatrix_types::Role;

    use super::*;

    const HEADER: &str = "shuffle_role,period_length,num_subperiods,pure_strategy,show_at_worst,show_best_response,rate_limit,mean_matching,payoff1Aa,payoff2Aa,payoff1Ab,payoff2Ab,payoff1Ba,payoff2Ba,payoff1Bb,payoff2Bb";

    fn table(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn parses_rows_in_round_order() {
        let text = table(&[
            "TRUE,60,0,FALSE,TRUE,FALSE,,FALSE,3,3,0,5,5,0,1,1",
            "FALSE,120,10,TRUE,FALSE,TRUE,4,TRUE,-2,7,0,0,0,0,7,-2",
        ]);
        let table = RoundTable::parse(&text).unwrap();
        assert_eq!(table.num_rounds(), 2);

        let first = table.config_for_round(1).unwrap();
        assert!(first.shuffle_role);
        assert_eq!(first.period_length, 60);
        assert_eq!(first.num_subperiods, 0);
        assert!(!first.pure_strategy);
        assert!(first.show_at_worst);
        assert_eq!(first.rate_limit, 0);
        assert_eq!(first.payoff_matrix.ab, PayoffCell::new(0, 5));
        assert!(!first.is_discrete());

        let second = table.config_for_round(2).unwrap();
        assert!(second.pure_strategy);
        assert!(second.mean_matching);
        assert_eq!(second.rate_limit, 4);
        assert_eq!(second.payoff_matrix.aa.for_role(Role::Row), -2);
        assert!(second.is_discrete());
    }

    #[test]
    fn only_uppercase_true_is_true() {
        let text = table(&["true,60,0,Yes,1,TRUE ,,FALSE,1,1,1,1,1,1,1,1"]);
        let config = RoundTable::parse(&text).unwrap();
        let config = config.config_for_round(1).unwrap();
        assert!(!config.shuffle_role);
        assert!(!config.pure_strategy);
        assert!(!config.show_at_worst);
        // Cells are trimmed before comparison.
        assert!(config.show_best_response);
    }

    #[test]
    fn empty_numeric_fields_are_zero() {
        let text = table(&["FALSE,30,,FALSE,FALSE,FALSE,,FALSE,,,,,,,,"]);
        let table = RoundTable::parse(&text).unwrap();
        let config = table.config_for_round(1).unwrap();
        assert_eq!(config.num_subperiods, 0);
        assert_eq!(config.rate_limit, 0);
        assert_eq!(config.payoff_matrix.bb, PayoffCell::new(0, 0));
    }

    #[test]
    fn malformed_number_names_round_and_field() {
        let text = table(&[
            "FALSE,30,0,FALSE,FALSE,FALSE,,FALSE,1,1,1,1,1,1,1,1",
            "FALSE,30,0,FALSE,FALSE,FALSE,,FALSE,1,1,x,1,1,1,1,1",
        ]);
        let err = RoundTable::parse(&text).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Parse { round: 2, field: "payoff1Ab", .. }
        ));
    }

    #[test]
    fn zero_period_length_is_rejected() {
        let text = table(&["FALSE,0,0,FALSE,FALSE,FALSE,,FALSE,1,1,1,1,1,1,1,1"]);
        let err = RoundTable::parse(&text).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Parse { field: "period_length", .. }
        ));
    }

    #[test]
    fn missing_column_is_a_csv_error() {
        let text = "period_length,num_subperiods\n60,0";
        assert!(matches!(
            RoundTable::parse(text),
            Err(ConfigError::Csv { .. })
        ));
    }

    #[test]
    fn rounds_beyond_the_table_are_inactive() {
        let text = table(&["FALSE,30,0,FALSE,FALSE,FALSE,,FALSE,1,1,1,1,1,1,1,1"]);
        let table = RoundTable::parse(&text).unwrap();
        assert!(table.is_active(1));
        assert!(!table.is_active(2));
        assert!(!table.is_active(0));
        assert!(matches!(
            table.config_for_round(5),
            Err(ConfigError::Missing { round: 5, available: 1 })
        ));
    }

    #[test]
    fn reparsing_is_idempotent() {
        let text = table(&["TRUE,60,0,FALSE,TRUE,FALSE,,FALSE,3,3,0,5,5,0,1,1"]);
        assert_eq!(RoundTable::parse(&text).unwrap(), RoundTable::parse(&text).unwrap());
    }

    #[test]
    fn iter_numbers_rounds_from_one() {
        let text = table(&[
            "FALSE,30,0,FALSE,FALSE,FALSE,,FALSE,1,1,1,1,1,1,1,1",
            "FALSE,45,0,FALSE,FALSE,FALSE,,FALSE,1,1,1,1,1,1,1,1",
        ]);
        let table = RoundTable::parse(&text).unwrap();
        let numbers: Vec<(u32, u32)> = table
            .iter()
            .map(|(n, config)| (n, config.period_length))
            .collect();
        assert_eq!(numbers, vec![(1, 30), (2, 45)]);
    }
}
