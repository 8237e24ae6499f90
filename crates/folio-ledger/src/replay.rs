use crate::ordering::replay_order;
use crate::types::{AccountState, EventKind, LedgerEvent, Position, PositionKey};
use crate::CLOSE_EPSILON;

/// Apply one event to the account state (incremental).
///
/// Deterministic, pure logic, no IO. Never fails for well-formed events:
/// out-of-range and insufficient-funds checks happen once, at the point a new
/// event enters the log ([`Book::append`](crate::Book::append)), never during
/// replay of historical events.
///
/// Cash rules per kind:
/// - CashDeposit:    `cash += total`; first nonzero deposit fixes `base_value`
/// - CashWithdrawal: `cash += total` (total already negative)
/// - OpenLong:       `cash -= total / leverage`
/// - CloseLong:      `cash += total`
/// - OpenShort:      `cash -= total` (margin posted at entry price)
/// - CloseShort:     `cash += margin_return + realized_pl` where
///                   `margin_return = shares * avg_price` and
///                   `realized_pl = shares * avg_price - total`
pub fn apply_event(state: &mut AccountState, event: &LedgerEvent) {
    match event.kind {
        EventKind::CashDeposit => {
            state.cash += event.total;
            if state.base_value == 0.0 && event.total > 0.0 {
                state.base_value = event.total;
            }
        }
        EventKind::CashWithdrawal => {
            state.cash += event.total;
        }
        EventKind::OpenLong => {
            state.cash -= event.total / event.leverage;
            increase_book(state, event, false);
        }
        EventKind::CloseLong => {
            state.cash += event.total;
            reduce_book(state, event, false);
        }
        EventKind::OpenShort => {
            state.cash -= event.total;
            increase_book(state, event, true);
        }
        EventKind::CloseShort => {
            // Margin posted at open returns at the entry price; the spread to
            // the buy-back cost is the realized P&L. A missing book means the
            // log bypassed entry validation; falling back to the execution
            // price keeps the fold total (realized_pl = 0).
            let avg_price = state
                .position(&event.symbol, true)
                .map(|p| p.avg_price)
                .unwrap_or(event.price);
            let margin_return = event.shares * avg_price;
            let realized_pl = margin_return - event.total;
            state.cash += margin_return + realized_pl;
            reduce_book(state, event, true);
        }
    }
}

/// Rebuild account state by folding [`apply_event`] over the events in
/// ascending `(date, insertion_order)` from an empty initial state.
///
/// Input order does not matter; the events are sorted into replay order
/// internally. Used for full rebuild after an edit or delete of the log.
pub fn replay(events: &[LedgerEvent]) -> AccountState {
    let mut ordered: Vec<&LedgerEvent> = events.iter().collect();
    ordered.sort_by(|a, b| replay_order(a, b));

    let mut state = AccountState::empty();
    for event in ordered {
        apply_event(&mut state, event);
    }
    state
}

/// Upsert one book: volume-weighted average price over shares at execution
/// price; leverage carried from the most recent increasing trade.
fn increase_book(state: &mut AccountState, event: &LedgerEvent, is_short: bool) {
    let key = PositionKey::new(event.symbol.clone(), is_short);
    match state.positions.get_mut(&key) {
        Some(pos) => {
            let new_shares = pos.shares + event.shares;
            pos.avg_price =
                (pos.shares * pos.avg_price + event.shares * event.price) / new_shares;
            pos.shares = new_shares;
            pos.leverage = event.leverage;
        }
        None => {
            state.positions.insert(
                key,
                Position {
                    symbol: event.symbol.clone(),
                    shares: event.shares,
                    avg_price: event.price,
                    leverage: event.leverage,
                    is_short,
                },
            );
        }
    }
}

/// Reduce one book; remaining shares keep the unchanged average price.
/// Remainders at or below CLOSE_EPSILON delete the position.
fn reduce_book(state: &mut AccountState, event: &LedgerEvent, is_short: bool) {
    let key = PositionKey::new(event.symbol.clone(), is_short);
    if let Some(pos) = state.positions.get_mut(&key) {
        pos.shares -= event.shares;
        if pos.shares <= CLOSE_EPSILON {
            state.positions.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind::*;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn trade(kind: EventKind, sym: &str, shares: f64, price: f64, lev: f64, day: &str) -> LedgerEvent {
        LedgerEvent::trade(kind, sym, shares, price, lev, d(day))
    }

    #[test]
    fn deposit_adds_cash_and_fixes_base_value() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &LedgerEvent::deposit(5_000.0, d("2024-01-02")));
        apply_event(&mut st, &LedgerEvent::deposit(1_000.0, d("2024-01-03")));

        assert_eq!(st.cash, 6_000.0);
        // base_value is the FIRST nonzero injection, fixed thereafter
        assert_eq!(st.base_value, 5_000.0);
    }

    #[test]
    fn withdrawal_reduces_cash_without_touching_base_value() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &LedgerEvent::deposit(5_000.0, d("2024-01-02")));
        apply_event(&mut st, &LedgerEvent::withdrawal(1_200.0, d("2024-01-03")));

        assert_eq!(st.cash, 3_800.0);
        assert_eq!(st.base_value, 5_000.0);
    }

    #[test]
    fn open_long_deducts_total_over_leverage() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &LedgerEvent::deposit(1_000.0, d("2024-01-02")));
        apply_event(&mut st, &trade(OpenLong, "AAA", 10.0, 100.0, 4.0, "2024-01-03"));

        // only total/leverage = 250 leaves cash
        assert_eq!(st.cash, 750.0);
        let pos = st.position("AAA", false).expect("long book exists");
        assert_eq!(pos.shares, 10.0);
        assert_eq!(pos.avg_price, 100.0);
        assert_eq!(pos.leverage, 4.0);
    }

    #[test]
    fn long_round_trip_nets_the_spread() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenLong, "AAA", 10.0, 100.0, 1.0, "2024-01-02"));
        apply_event(&mut st, &trade(CloseLong, "AAA", 10.0, 110.0, 1.0, "2024-01-03"));

        // -1000 + 1100
        assert_eq!(st.cash, 100.0);
        assert!(st.is_flat());
    }

    #[test]
    fn increasing_long_volume_weights_avg_price() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenLong, "AAA", 10.0, 100.0, 1.0, "2024-01-02"));
        apply_event(&mut st, &trade(OpenLong, "AAA", 30.0, 120.0, 1.0, "2024-01-03"));

        let pos = st.position("AAA", false).unwrap();
        assert_eq!(pos.shares, 40.0);
        // (10*100 + 30*120) / 40 = 115
        assert_eq!(pos.avg_price, 115.0);
    }

    #[test]
    fn close_long_keeps_avg_price_on_remainder() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenLong, "AAA", 10.0, 100.0, 1.0, "2024-01-02"));
        apply_event(&mut st, &trade(CloseLong, "AAA", 4.0, 130.0, 1.0, "2024-01-03"));

        let pos = st.position("AAA", false).unwrap();
        assert_eq!(pos.shares, 6.0);
        assert_eq!(pos.avg_price, 100.0);
    }

    #[test]
    fn short_round_trip_nets_profit_when_price_falls() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenShort, "BBB", 5.0, 50.0, 1.0, "2024-01-02"));
        // margin posted
        assert_eq!(st.cash, -250.0);

        apply_event(&mut st, &trade(CloseShort, "BBB", 5.0, 40.0, 1.0, "2024-01-03"));
        // margin_return 250 + realized 50
        assert_eq!(st.cash, 50.0);
        assert!(st.is_flat());
    }

    #[test]
    fn short_partial_closes_realize_against_avg() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenShort, "BBB", 10.0, 50.0, 1.0, "2024-01-02"));
        apply_event(&mut st, &trade(CloseShort, "BBB", 4.0, 40.0, 1.0, "2024-01-03"));
        // margin back 4*50=200, realized 200-160=40
        assert_eq!(st.cash, -500.0 + 240.0);

        apply_event(&mut st, &trade(CloseShort, "BBB", 6.0, 60.0, 1.0, "2024-01-04"));
        // margin back 300, realized 300-360=-60
        assert_eq!(st.cash, -500.0 + 240.0 + 240.0);
        assert!(st.is_flat());
    }

    #[test]
    fn increasing_short_volume_weights_avg_price() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenShort, "BBB", 5.0, 50.0, 1.0, "2024-01-02"));
        apply_event(&mut st, &trade(OpenShort, "BBB", 5.0, 60.0, 1.0, "2024-01-03"));

        let pos = st.position("BBB", true).unwrap();
        assert_eq!(pos.shares, 10.0);
        assert_eq!(pos.avg_price, 55.0);

        // closing everything at exactly avg is breakeven
        apply_event(&mut st, &trade(CloseShort, "BBB", 10.0, 55.0, 1.0, "2024-01-04"));
        assert_eq!(st.cash, 0.0);
    }

    #[test]
    fn long_and_short_books_coexist_for_one_symbol() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenLong, "XYZ", 10.0, 100.0, 1.0, "2024-01-02"));
        apply_event(&mut st, &trade(OpenShort, "XYZ", 3.0, 100.0, 1.0, "2024-01-02"));

        assert_eq!(st.positions.len(), 2);
        assert_eq!(st.held_shares("XYZ", false), 10.0);
        assert_eq!(st.held_shares("XYZ", true), 3.0);
    }

    #[test]
    fn residue_below_epsilon_closes_the_position() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenLong, "AAA", 10.0, 100.0, 1.0, "2024-01-02"));
        apply_event(&mut st, &trade(CloseLong, "AAA", 9.9995, 100.0, 1.0, "2024-01-03"));

        // remainder 0.0005 <= 0.001 — gone
        assert!(st.position("AAA", false).is_none());
    }

    #[test]
    fn remainder_above_epsilon_survives() {
        let mut st = AccountState::empty();
        apply_event(&mut st, &trade(OpenLong, "AAA", 10.0, 100.0, 1.0, "2024-01-02"));
        apply_event(&mut st, &trade(CloseLong, "AAA", 9.99, 100.0, 1.0, "2024-01-03"));

        let pos = st.position("AAA", false).expect("0.01 shares remain open");
        assert!((pos.shares - 0.01).abs() < 1e-9);
    }

    #[test]
    fn replay_sorts_by_date_then_insertion_order() {
        let events = vec![
            trade(CloseLong, "AAA", 10.0, 120.0, 1.0, "2024-01-03").with_order(3),
            LedgerEvent::deposit(10_000.0, d("2024-01-02")).with_order(1),
            trade(OpenLong, "AAA", 10.0, 100.0, 1.0, "2024-01-02").with_order(2),
        ];

        // shuffled input; replay must order deposit -> open -> close
        let st = replay(&events);
        assert_eq!(st.cash, 10_000.0 - 1_000.0 + 1_200.0);
        assert!(st.is_flat());
    }

    #[test]
    fn replay_of_empty_log_is_empty_state() {
        let st = replay(&[]);
        assert_eq!(st.cash, 0.0);
        assert_eq!(st.base_value, 0.0);
        assert!(st.is_flat());
    }

    #[test]
    fn replay_is_idempotent() {
        let events = vec![
            LedgerEvent::deposit(10_000.0, d("2024-01-02")).with_order(1),
            trade(OpenLong, "AAA", 10.0, 100.0, 1.0, "2024-01-03").with_order(2),
            trade(OpenShort, "BBB", 5.0, 50.0, 1.0, "2024-01-04").with_order(3),
            trade(CloseShort, "BBB", 5.0, 40.0, 1.0, "2024-01-05").with_order(4),
        ];

        let a = replay(&events);
        let b = replay(&events);
        assert_eq!(a, b);
    }
}
