use folio_ledger::{LedgerError, TradeAction};
use folio_service::{CashDirection, CashRequest, ServiceError};
use folio_testkit::{memory_service, memory_service_with_cap, parse_date, trade};
use uuid::Uuid;

async fn fund(
    svc: &folio_service::PortfolioService<
        folio_testkit::InMemoryEventStore,
        folio_testkit::InMemoryPortfolioStore,
    >,
    user: Uuid,
    amount: f64,
) {
    svc.record_cash(
        user,
        1,
        CashRequest {
            direction: CashDirection::Deposit,
            amount,
            date: parse_date("2024-05-01"),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn scenario_insufficient_cash_rejects_the_open() {
    let svc = memory_service();
    let user = Uuid::new_v4();
    fund(&svc, user, 500.0).await;

    let err = svc
        .record_trade(user, 1, trade("AAPL", TradeAction::Buy, false, 10.0, 100.0, "2024-05-02"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Ledger(LedgerError::InsufficientCash { .. })
    ));

    // nothing entered the log
    assert_eq!(svc.list_trades(user, 1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn scenario_leverage_stretches_available_cash() {
    let svc = memory_service();
    let user = Uuid::new_v4();
    fund(&svc, user, 500.0).await;

    let mut req = trade("AAPL", TradeAction::Buy, false, 10.0, 100.0, "2024-05-02");
    req.leverage = Some(4.0);
    let out = svc.record_trade(user, 1, req).await.unwrap();

    assert_eq!(out.snapshot.cash, 250.0);
}

#[tokio::test]
async fn scenario_oversell_is_rejected_at_entry() {
    let svc = memory_service();
    let user = Uuid::new_v4();
    fund(&svc, user, 10_000.0).await;

    svc.record_trade(user, 1, trade("AAPL", TradeAction::Buy, false, 10.0, 100.0, "2024-05-02"))
        .await
        .unwrap();
    let err = svc
        .record_trade(user, 1, trade("AAPL", TradeAction::Sell, false, 11.0, 100.0, "2024-05-03"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Ledger(LedgerError::Oversell { .. })
    ));
}

#[tokio::test]
async fn scenario_withdrawal_cannot_exceed_cash() {
    let svc = memory_service();
    let user = Uuid::new_v4();
    fund(&svc, user, 100.0).await;

    let err = svc
        .record_cash(
            user,
            1,
            CashRequest {
                direction: CashDirection::Withdraw,
                amount: 150.0,
                date: parse_date("2024-05-02"),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Ledger(LedgerError::InsufficientCash { .. })
    ));
}

#[tokio::test]
async fn scenario_trade_cap_blocks_the_next_trade() {
    let svc = memory_service_with_cap(2);
    let user = Uuid::new_v4();
    fund(&svc, user, 100_000.0).await;

    for day in ["2024-05-02", "2024-05-03"] {
        svc.record_trade(user, 1, trade("AAPL", TradeAction::Buy, false, 1.0, 100.0, day))
            .await
            .unwrap();
    }

    let err = svc
        .record_trade(user, 1, trade("AAPL", TradeAction::Buy, false, 1.0, 100.0, "2024-05-04"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::TradeCapExceeded { cap: 2 }));

    // cash events do not count against the trade cap
    fund(&svc, user, 1.0).await;
}

#[tokio::test]
async fn scenario_short_open_needs_no_cash() {
    let svc = memory_service();
    let user = Uuid::new_v4();

    // no deposit at all — short opens are exempt from the cash check
    let out = svc
        .record_trade(user, 1, trade("TSLA", TradeAction::Sell, true, 5.0, 50.0, "2024-05-02"))
        .await
        .unwrap();
    assert_eq!(out.snapshot.cash, -250.0);
    assert_eq!(out.snapshot.positions.len(), 1);
    assert!(out.snapshot.positions[0].is_short);
}
