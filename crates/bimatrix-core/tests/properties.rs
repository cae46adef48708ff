//! Property-based tests for payoff integration, trajectories, and export.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::BTreeMap;

use bimatrix_core::export::{ExportOptions, build_export_rows};
use bimatrix_core::payoff::integrate_payoff;
use bimatrix_core::trajectory::{DecisionChannel, reconstruct};
use bimatrix_events::RoundEvents;
use bimatrix_types::{
    Event, GroupIdentity, GroupRound, ParticipantCode, PayoffCell, PayoffMatrix, PeriodMarker,
    Player, Role, RoundConfig, SessionCode,
};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use proptest::prelude::*;

fn at(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).unwrap() + TimeDelta::milliseconds(millis)
}

/// Strategy: a payoff matrix with small integer entries.
fn matrix_strategy() -> impl Strategy<Value = PayoffMatrix> {
    prop::array::uniform8(-10..=10i32).prop_map(|v| {
        PayoffMatrix::new(
            PayoffCell::new(v[0], v[1]),
            PayoffCell::new(v[2], v[3]),
            PayoffCell::new(v[4], v[5]),
            PayoffCell::new(v[6], v[7]),
        )
    })
}

/// Strategy: decisions `(millis, is_row, value)`, some outside a 10s period.
fn decisions_strategy() -> impl Strategy<Value = Vec<(i64, bool, f64)>> {
    prop::collection::vec((-2_000..12_000i64, any::<bool>(), 0.0..=1.0f64), 0..40)
}

fn round_events(decisions: &[(i64, bool, f64)], period_millis: i64) -> RoundEvents {
    let mut events: Vec<Event> = decisions
        .iter()
        .map(|(millis, is_row, value)| {
            Event::decision(at(*millis), if *is_row { "row" } else { "col" }, *value)
        })
        .collect();
    events.push(Event::state(at(0), PeriodMarker::PeriodStart));
    events.push(Event::state(at(period_millis), PeriodMarker::PeriodEnd));
    RoundEvents::from_vec(events)
}

fn players() -> Vec<Player> {
    vec![Player::new("row", 1), Player::new("col", 2)]
}

fn config(num_subperiods: u32) -> RoundConfig {
    RoundConfig {
        shuffle_role: false,
        period_length: 10,
        num_subperiods,
        pure_strategy: false,
        show_at_worst: false,
        show_best_response: false,
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

fn group_round(snapshots: &[i64], seconds: i64) -> GroupRound {
    let mut events = vec![
        Event::state(at(0), PeriodMarker::PeriodStart),
        Event::state(at(seconds * 1_000), PeriodMarker::PeriodEnd),
    ];
    for millis in snapshots {
        let mut values = BTreeMap::new();
        values.insert(ParticipantCode::from("row"), 0.5);
        values.insert(ParticipantCode::from("col"), 0.5);
        events.push(Event::group_decision(at(*millis), values));
    }
    GroupRound {
        group: GroupIdentity {
            session_code: SessionCode::from("s"),
            subsession_id: 1,
            id_in_subsession: 1,
            round_number: 1,
        },
        players: players(),
        events,
    }
}

proptest! {
    // 1. The payoff is a time average of convex combinations of cells.
    #[test]
    fn payoff_within_cell_bounds(
        matrix in matrix_strategy(),
        decisions in decisions_strategy(),
        row in any::<bool>(),
    ) {
        let role = if row { Role::Row } else { Role::Column };
        let events = round_events(&decisions, 10_000);
        let payoff = integrate_payoff(&events, &matrix, role, &players());
        let (low, high) = matrix.bounds_for(role);
        prop_assert!(payoff >= f64::from(low) - 1e-9, "payoff={payoff} low={low}");
        prop_assert!(payoff <= f64::from(high) + 1e-9, "payoff={payoff} high={high}");
    }

    // 2. Recomputing from the same events is bit-for-bit stable.
    #[test]
    fn payoff_is_idempotent(matrix in matrix_strategy(), decisions in decisions_strategy()) {
        let events = round_events(&decisions, 10_000);
        let first = integrate_payoff(&events, &matrix, Role::Row, &players());
        let second = integrate_payoff(&events, &matrix, Role::Row, &players());
        prop_assert_eq!(first.to_bits(), second.to_bits());
    }

    // 3. Trajectories tile the period exactly.
    #[test]
    fn trajectory_covers_period(decisions in decisions_strategy(), initial in 0.0..=1.0f64) {
        let events = round_events(&decisions, 10_000);
        let trajectory = reconstruct(
            &events,
            &ParticipantCode::from("row"),
            DecisionChannel::Individual,
            initial,
        )
        .unwrap();
        prop_assert!(trajectory.covers_period());
        let average = trajectory.time_average();
        prop_assert!((-1e-9..=1.0 + 1e-9).contains(&average), "average={average}");
    }

    // 4. Fixed-tick exports sample whole seconds at the configured rate.
    #[test]
    fn fixed_tick_row_count(
        seconds in 1..30i64,
        snapshots in prop::collection::vec(0..30_000i64, 0..10),
        ticks_per_second in 1..5u32,
    ) {
        let options = ExportOptions { ticks_per_second, max_group_size: 2 };
        let table = build_export_rows(&group_round(&snapshots, seconds), &config(0), options)
            .unwrap();
        let expected = seconds * i64::from(ticks_per_second);
        prop_assert_eq!(i64::try_from(table.rows.len()).unwrap(), expected);
    }

    // 5. Event-tick exports emit one row per group snapshot.
    #[test]
    fn event_tick_row_count(snapshots in prop::collection::vec(0..10_000i64, 0..25)) {
        let round = group_round(&snapshots, 10);
        let table = build_export_rows(&round, &config(3), ExportOptions::default()).unwrap();
        prop_assert_eq!(table.rows.len(), snapshots.len());
    }
}
