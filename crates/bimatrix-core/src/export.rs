//! Tabular export of a group's round.
//!
//! The event log is projected onto rows in one of two ways, chosen by the
//! round's `num_subperiods`:
//!
//! - **Fixed tick** (`num_subperiods == 0`): one row every
//!   `1 / ticks_per_second` seconds from the earliest to the latest `state`
//!   event. A single [`EventCursor`](bimatrix_events::EventCursor) advances
//!   in lockstep with the tick clock, so every event is visited once.
//! - **Event tick** (`num_subperiods > 0`): one row per `group_decisions`
//!   event, with `target` events carried forward onto later rows.
//!
//! Each row is `session_code, subsession_id, id_in_subsession, tick`, then
//! per-player strategy, target, and code columns padded to
//! `max_group_size`, then the round's settings.

use std::fmt;
use std::io;

use bimatrix_events::RoundEvents;
use bimatrix_types::{Event, EventKind, GroupRound, Player, RoundConfig};
use chrono::TimeDelta;

use crate::round_table::ROUND_TABLE_COLUMNS;

/// Default sampling rate of fixed-tick exports.
pub const TICKS_PER_SECOND: u32 = 2;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Identity columns leading every row.
const IDENTITY_COLUMNS: [&str; 4] = ["session_code", "subsession_id", "id_in_subsession", "tick"];

/// Errors that can occur while building or writing an export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Fixed-tick sampling needs at least one tick per second.
    #[error("ticks_per_second must be positive")]
    ZeroTickRate,

    /// The group has more players than the table has column groups.
    #[error("group has {players} players but the export holds {max_group_size}")]
    GroupTooLarge {
        /// Players in the group.
        players: usize,
        /// Configured column groups.
        max_group_size: usize,
    },

    /// Two tables with different columns cannot be concatenated.
    #[error("export headers differ: {left} vs {right} columns")]
    HeaderMismatch {
        /// Columns of the receiving table.
        left: usize,
        /// Columns of the appended table.
        right: usize,
    },

    /// Writing CSV output failed.
    #[error("failed to write CSV: {source}")]
    Csv {
        /// The underlying CSV error.
        #[from]
        source: csv::Error,
    },

    /// Flushing the output failed.
    #[error("failed to flush export: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: io::Error,
    },
}

/// Export sampling and layout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Fixed-tick sampling rate.
    pub ticks_per_second: u32,
    /// Column groups per row; smaller groups are padded.
    pub max_group_size: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ticks_per_second: TICKS_PER_SECOND,
            max_group_size: 2,
        }
    }
}

/// One value in an export row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Free text, such as a code.
    Text(String),
    /// A whole number.
    Integer(i64),
    /// A real number; NaN renders as `nan`.
    Number(f64),
    /// A flag, rendered `TRUE` or `FALSE`.
    Flag(bool),
    /// Padding for an absent player.
    Empty,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Number(value) if value.is_nan() => f.write_str("nan"),
            Self::Number(value) => write!(f, "{value}"),
            Self::Flag(true) => f.write_str("TRUE"),
            Self::Flag(false) => f.write_str("FALSE"),
            Self::Empty => Ok(()),
        }
    }
}

/// Column names plus equal-length rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    /// Column names, in order.
    pub header: Vec<String>,
    /// Rows, each as long as `header`.
    pub rows: Vec<Vec<Cell>>,
}

impl ExportTable {
    /// Whether the table has neither a header nor rows.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() && self.rows.is_empty()
    }

    /// Append `other`'s rows, adopting its header if this table has none.
    ///
    /// Empty tables are skipped.
    pub fn append(&mut self, other: Self) -> Result<(), ExportError> {
        if other.is_empty() {
            return Ok(());
        }
        if self.header.is_empty() {
            self.header = other.header;
        } else if self.header != other.header {
            return Err(ExportError::HeaderMismatch {
                left: self.header.len(),
                right: other.header.len(),
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    /// Write the header (when present) and all rows as CSV.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut wtr = csv::Writer::from_writer(writer);
        if !self.header.is_empty() {
            wtr.write_record(&self.header)?;
        }
        for row in &self.rows {
            wtr.write_record(row.iter().map(ToString::to_string))?;
        }
        wtr.flush()?;
        tracing::debug!(rows = self.rows.len(), columns = self.header.len(), "Wrote export CSV");
        Ok(())
    }
}

/// Column names for a table with `max_group_size` column groups.
pub fn export_header(max_group_size: usize) -> Vec<String> {
    IDENTITY_COLUMNS
        .iter()
        .map(|name| (*name).to_owned())
        .chain(per_player(max_group_size, "strategy"))
        .chain(per_player(max_group_size, "target"))
        .chain(per_player(max_group_size, "code"))
        .chain(ROUND_TABLE_COLUMNS.iter().map(|name| (*name).to_owned()))
        .collect()
}

fn per_player(max_group_size: usize, suffix: &str) -> impl Iterator<Item = String> + '_ {
    (1..=max_group_size).map(move |i| format!("p{i}_{suffix}"))
}

/// Project a group's round onto export rows.
///
/// Returns an empty table for a round without events, and a header with no
/// rows for a fixed-tick round without `state` events.
///
/// # Errors
///
/// [`ExportError::ZeroTickRate`] and [`ExportError::GroupTooLarge`] for
/// unusable options.
pub fn build_export_rows(
    round: &GroupRound,
    config: &RoundConfig,
    options: ExportOptions,
) -> Result<ExportTable, ExportError> {
    if round.events.is_empty() {
        tracing::debug!(
            group = round.group.id_in_subsession,
            "No events recorded, exporting empty table"
        );
        return Ok(ExportTable::default());
    }
    if options.ticks_per_second == 0 {
        return Err(ExportError::ZeroTickRate);
    }
    if round.players.len() > options.max_group_size {
        return Err(ExportError::GroupTooLarge {
            players: round.players.len(),
            max_group_size: options.max_group_size,
        });
    }

    let mut players: Vec<&Player> = round.players.iter().collect();
    players.sort_by_key(|player| player.id_in_group);
    let layout = RowLayout::new(round, config, players, options.max_group_size);
    let events = RoundEvents::freeze(&round.events);

    let rows = if config.is_discrete() {
        event_tick_rows(&events, &layout)
    } else {
        fixed_tick_rows(&events, &layout, options.ticks_per_second)
    };
    tracing::debug!(
        group = round.group.id_in_subsession,
        rows = rows.len(),
        discrete = config.is_discrete(),
        "Built export rows"
    );

    Ok(ExportTable {
        header: export_header(options.max_group_size),
        rows,
    })
}

fn fixed_tick_rows(
    events: &RoundEvents,
    layout: &RowLayout<'_>,
    ticks_per_second: u32,
) -> Vec<Vec<Cell>> {
    let Some((first, last)) = events.state_span() else {
        return Vec::new();
    };
    let ticks = last
        .signed_duration_since(first)
        .num_seconds()
        .saturating_mul(i64::from(ticks_per_second));

    let mut cursor = events.cursor();
    let mut columns = PlayerColumns::new(layout.players.len());
    let mut rows = Vec::new();
    for tick in 0..ticks {
        let Some(now) = tick_offset(tick, ticks_per_second)
            .and_then(|offset| first.checked_add_signed(offset))
        else {
            break;
        };
        for event in cursor.advance_through(now) {
            columns.observe(event, &layout.players);
        }
        rows.push(layout.row(tick, &columns));
    }
    rows
}

fn event_tick_rows(events: &RoundEvents, layout: &RowLayout<'_>) -> Vec<Vec<Cell>> {
    let mut columns = PlayerColumns::new(layout.players.len());
    let mut rows = Vec::new();
    let mut tick = 0_i64;
    for event in events {
        columns.observe(event, &layout.players);
        if matches!(event.kind, EventKind::GroupDecisionChanged(_)) {
            rows.push(layout.row(tick, &columns));
            tick = tick.saturating_add(1);
        }
    }
    rows
}

/// Time of tick `tick` relative to the first `state` event.
fn tick_offset(tick: i64, ticks_per_second: u32) -> Option<TimeDelta> {
    tick.checked_mul(NANOS_PER_SECOND)?
        .checked_div(i64::from(ticks_per_second))
        .map(TimeDelta::nanoseconds)
}

/// Latest observed strategy and target per player, NaN until observed.
struct PlayerColumns {
    strategies: Vec<f64>,
    targets: Vec<f64>,
}

impl PlayerColumns {
    fn new(players: usize) -> Self {
        Self {
            strategies: vec![f64::NAN; players],
            targets: vec![f64::NAN; players],
        }
    }

    fn observe(&mut self, event: &Event, players: &[&Player]) {
        match &event.kind {
            EventKind::GroupDecisionChanged(snapshot) => {
                for (slot, player) in self.strategies.iter_mut().zip(players) {
                    if let Some(value) = snapshot.get(&player.participant) {
                        *slot = *value;
                    }
                }
            }
            EventKind::TargetChanged(value) => {
                for (slot, player) in self.targets.iter_mut().zip(players) {
                    if event.participant.as_ref() == Some(&player.participant) {
                        *slot = *value;
                    }
                }
            }
            EventKind::DecisionChanged(_) | EventKind::StateMarker(_) => {}
        }
    }
}

/// The parts of a row that do not change from tick to tick.
struct RowLayout<'a> {
    identity: [Cell; 3],
    players: Vec<&'a Player>,
    settings: Vec<Cell>,
    max_group_size: usize,
}

impl<'a> RowLayout<'a> {
    fn new(
        round: &GroupRound,
        config: &RoundConfig,
        players: Vec<&'a Player>,
        max_group_size: usize,
    ) -> Self {
        Self {
            identity: [
                Cell::Text(round.group.session_code.as_str().to_owned()),
                Cell::Integer(i64::from(round.group.subsession_id)),
                Cell::Integer(i64::from(round.group.id_in_subsession)),
            ],
            players,
            settings: settings_cells(config),
            max_group_size,
        }
    }

    fn row(&self, tick: i64, columns: &PlayerColumns) -> Vec<Cell> {
        let padded = |values: &[f64]| {
            (0..self.max_group_size)
                .map(|i| values.get(i).map_or(Cell::Empty, |value| Cell::Number(*value)))
                .collect::<Vec<_>>()
        };
        let codes = (0..self.max_group_size).map(|i| {
            self.players.get(i).map_or(Cell::Empty, |player| {
                Cell::Text(player.participant.as_str().to_owned())
            })
        });

        self.identity
            .iter()
            .cloned()
            .chain(std::iter::once(Cell::Integer(tick)))
            .chain(padded(&columns.strategies))
            .chain(padded(&columns.targets))
            .chain(codes)
            .chain(self.settings.iter().cloned())
            .collect()
    }
}

/// Round settings in [`ROUND_TABLE_COLUMNS`] order.
fn settings_cells(config: &RoundConfig) -> Vec<Cell> {
    let mut cells = vec![
        Cell::Integer(i64::from(config.period_length)),
        Cell::Integer(i64::from(config.num_subperiods)),
        Cell::Flag(config.pure_strategy),
        Cell::Flag(config.shuffle_role),
        Cell::Flag(config.show_at_worst),
        Cell::Flag(config.show_best_response),
        Cell::Integer(i64::from(config.rate_limit)),
        Cell::Flag(config.mean_matching),
    ];
    for cell in config.payoff_matrix.cells() {
        cells.push(Cell::Integer(i64::from(cell.row)));
        cells.push(Cell::Integer(i64::from(cell.column)));
    }
    cells
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use bimatrix_types::{
        GroupIdentity, ParticipantCode, PayoffCell, PayoffMatrix, PeriodMarker, SessionCode,
    };
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap() + TimeDelta::milliseconds(millis)
    }

    fn config(num_subperiods: u32) -> RoundConfig {
        RoundConfig {
            shuffle_role: true,
            period_length: 5,
            num_subperiods,
            pure_strategy: false,
            show_at_worst: false,
            show_best_response: true,
            rate_limit: 0,
            mean_matching: false,
            payoff_matrix: PayoffMatrix::new(
                PayoffCell::new(3, 3),
                PayoffCell::new(0, 5),
                PayoffCell::new(5, 0),
                PayoffCell::new(1, 1),
            ),
        }
    }

    fn snapshot(p1: f64, p2: f64) -> BTreeMap<ParticipantCode, f64> {
        let mut values = BTreeMap::new();
        values.insert(ParticipantCode::from("p1"), p1);
        values.insert(ParticipantCode::from("p2"), p2);
        values
    }

    fn round(events: Vec<Event>) -> GroupRound {
        GroupRound {
            group: GroupIdentity {
                session_code: SessionCode::from("sess1"),
                subsession_id: 7,
                id_in_subsession: 3,
                round_number: 1,
            },
            players: vec![Player::new("p2", 2), Player::new("p1", 1)],
            events,
        }
    }

    fn five_second_round() -> GroupRound {
        round(vec![
            Event::state(at(0), PeriodMarker::PeriodStart),
            Event::group_decision(at(0), snapshot(0.1, 0.2)),
            Event::group_decision(at(3_000), snapshot(0.9, 0.8)),
            Event::target(at(3_000), "p2", 0.6),
            Event::state(at(5_000), PeriodMarker::PeriodEnd),
        ])
    }

    fn number(cell: &Cell) -> f64 {
        match cell {
            Cell::Number(value) => *value,
            Cell::Text(_) | Cell::Integer(_) | Cell::Flag(_) | Cell::Empty => f64::NAN,
        }
    }

    #[test]
    fn header_layout() {
        let header = export_header(2);
        assert_eq!(
            &header[..10],
            [
                "session_code",
                "subsession_id",
                "id_in_subsession",
                "tick",
                "p1_strategy",
                "p2_strategy",
                "p1_target",
                "p2_target",
                "p1_code",
                "p2_code",
            ]
        );
        assert_eq!(header.len(), 4 + 3 * 2 + ROUND_TABLE_COLUMNS.len());
        assert_eq!(header[10], "period_length");
        assert_eq!(header.last().unwrap(), "payoff2Bb");
    }

    #[test]
    fn header_repeats_each_player_block_per_seat() {
        let header = export_header(3);
        assert_eq!(
            &header[4..13],
            [
                "p1_strategy",
                "p2_strategy",
                "p3_strategy",
                "p1_target",
                "p2_target",
                "p3_target",
                "p1_code",
                "p2_code",
                "p3_code",
            ]
        );
        assert_eq!(export_header(0).len(), 4 + ROUND_TABLE_COLUMNS.len());
    }

    #[test]
    fn fixed_tick_samples_latest_snapshot() {
        let table =
            build_export_rows(&five_second_round(), &config(0), ExportOptions::default()).unwrap();
        assert_eq!(table.rows.len(), 10);

        for (i, row) in table.rows.iter().enumerate() {
            assert_eq!(row.len(), table.header.len());
            assert_eq!(row[3], Cell::Integer(i64::try_from(i).unwrap()));
            let expected = if i < 6 { 0.1 } else { 0.9 };
            assert!((number(&row[4]) - expected).abs() < 1e-12, "row {i}");
        }
        assert!(number(&table.rows[5][7]).is_nan());
        assert!((number(&table.rows[6][7]) - 0.6).abs() < 1e-12);
        assert_eq!(table.rows[0][8], Cell::Text("p1".to_owned()));
        assert_eq!(table.rows[0][0], Cell::Text("sess1".to_owned()));
        assert_eq!(table.rows[0][1], Cell::Integer(7));
    }

    #[test]
    fn fixed_tick_row_count_follows_rate() {
        let options = ExportOptions {
            ticks_per_second: 4,
            max_group_size: 2,
        };
        let table = build_export_rows(&five_second_round(), &config(0), options).unwrap();
        assert_eq!(table.rows.len(), 20);
        // Tick 12 falls at 3.0s.
        assert!((number(&table.rows[12][4]) - 0.9).abs() < 1e-12);
        assert!((number(&table.rows[11][4]) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn event_tick_emits_one_row_per_snapshot() {
        let mut events = five_second_round().events;
        events.push(Event::group_decision(at(4_000), snapshot(0.5, 0.5)));
        let table =
            build_export_rows(&round(events), &config(4), ExportOptions::default()).unwrap();

        assert_eq!(table.rows.len(), 3);
        let ticks: Vec<&Cell> = table.rows.iter().map(|row| &row[3]).collect();
        assert_eq!(ticks, [&Cell::Integer(0), &Cell::Integer(1), &Cell::Integer(2)]);
        assert!((number(&table.rows[1][5]) - 0.8).abs() < 1e-12);
        // The target at 3.0s arrives after the snapshot sharing its timestamp.
        assert!(number(&table.rows[1][7]).is_nan());
        assert!((number(&table.rows[2][7]) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn small_group_is_padded() {
        let mut solo = five_second_round();
        solo.players.retain(|player| player.id_in_group == 1);
        let options = ExportOptions {
            ticks_per_second: 2,
            max_group_size: 3,
        };
        let table = build_export_rows(&solo, &config(1), options).unwrap();
        let row = &table.rows[0];
        assert_eq!(row.len(), table.header.len());
        assert!((number(&row[4]) - 0.1).abs() < 1e-12);
        assert_eq!(row[5], Cell::Empty);
        assert_eq!(row[6], Cell::Empty);
        assert_eq!(row[10], Cell::Text("p1".to_owned()));
        assert_eq!(row[11], Cell::Empty);
    }

    #[test]
    fn no_events_yields_empty_table() {
        let table = build_export_rows(&round(Vec::new()), &config(0), ExportOptions::default())
            .unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn no_state_events_yields_header_only() {
        let events = vec![Event::group_decision(at(0), snapshot(0.1, 0.2))];
        let table = build_export_rows(&round(events), &config(0), ExportOptions::default())
            .unwrap();
        assert_eq!(table.header, export_header(2));
        assert!(table.rows.is_empty());
    }

    #[test]
    fn unusable_options_are_rejected() {
        let zero_rate = ExportOptions {
            ticks_per_second: 0,
            max_group_size: 2,
        };
        assert!(matches!(
            build_export_rows(&five_second_round(), &config(0), zero_rate),
            Err(ExportError::ZeroTickRate)
        ));
        let narrow = ExportOptions {
            ticks_per_second: 2,
            max_group_size: 1,
        };
        assert!(matches!(
            build_export_rows(&five_second_round(), &config(0), narrow),
            Err(ExportError::GroupTooLarge { players: 2, max_group_size: 1 })
        ));
    }

    #[test]
    fn csv_renders_nan_flags_and_padding() {
        let table =
            build_export_rows(&five_second_round(), &config(0), ExportOptions::default()).unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("session_code,subsession_id"));
        assert_eq!(
            lines.next().unwrap(),
            "sess1,7,3,0,0.1,0.2,nan,nan,p1,p2,5,0,FALSE,TRUE,FALSE,TRUE,0,FALSE,3,3,0,5,5,0,1,1"
        );
        assert_eq!(text.lines().count(), 11);
    }

    #[test]
    fn append_requires_matching_headers() {
        let mut all = ExportTable::default();
        let fixed =
            build_export_rows(&five_second_round(), &config(0), ExportOptions::default()).unwrap();
        let event_tick =
            build_export_rows(&five_second_round(), &config(2), ExportOptions::default()).unwrap();
        all.append(fixed).unwrap();
        all.append(ExportTable::default()).unwrap();
        all.append(event_tick).unwrap();
        assert_eq!(all.rows.len(), 12);

        let wide = build_export_rows(
            &five_second_round(),
            &config(0),
            ExportOptions {
                ticks_per_second: 2,
                max_group_size: 3,
            },
        )
        .unwrap();
        assert!(matches!(
            all.append(wide),
            Err(ExportError::HeaderMismatch { .. })
        ));
    }
}
