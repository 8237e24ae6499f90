use folio_ledger::{replay, EventKind, TradeAction};
use folio_service::{CashDirection, CashRequest, Snapshot};
use folio_testkit::{memory_service, parse_date, trade};
use uuid::Uuid;

#[tokio::test]
async fn scenario_deposit_trade_close_flow() {
    let svc = memory_service();
    let user = Uuid::new_v4();

    svc.record_cash(
        user,
        1,
        CashRequest {
            direction: CashDirection::Deposit,
            amount: 10_000.0,
            date: parse_date("2024-05-01"),
        },
    )
    .await
    .unwrap();

    let bought = svc
        .record_trade(user, 1, trade("AAPL", TradeAction::Buy, false, 10.0, 180.0, "2024-05-02"))
        .await
        .unwrap();
    assert_eq!(bought.event.kind, EventKind::OpenLong);
    assert_eq!(bought.snapshot.cash, 8_200.0);

    let sold = svc
        .record_trade(user, 1, trade("AAPL", TradeAction::Sell, false, 10.0, 200.0, "2024-05-09"))
        .await
        .unwrap();
    assert_eq!(sold.event.kind, EventKind::CloseLong);
    // 10000 - 1800 + 2000
    assert_eq!(sold.snapshot.cash, 10_200.0);
    assert!(sold.snapshot.positions.is_empty());
    assert_eq!(sold.snapshot.base_value, 10_000.0);

    // the materialized snapshot is exactly the replay of the stored log
    let log = svc.list_trades(user, 1).await.unwrap();
    assert_eq!(Snapshot::from_state(&replay(&log)), sold.snapshot);
}

#[tokio::test]
async fn scenario_delete_trade_rebuilds_from_remaining_log() {
    let svc = memory_service();
    let user = Uuid::new_v4();

    svc.record_cash(
        user,
        1,
        CashRequest {
            direction: CashDirection::Deposit,
            amount: 10_000.0,
            date: parse_date("2024-05-01"),
        },
    )
    .await
    .unwrap();
    let first = svc
        .record_trade(user, 1, trade("AAPL", TradeAction::Buy, false, 10.0, 100.0, "2024-05-02"))
        .await
        .unwrap();
    svc.record_trade(user, 1, trade("AAPL", TradeAction::Buy, false, 10.0, 120.0, "2024-05-03"))
        .await
        .unwrap();

    // deleting the first lot leaves only the 120 lot
    let snapshot = svc.delete_trade(user, 1, first.event.id).await.unwrap();
    assert_eq!(snapshot.cash, 10_000.0 - 1_200.0);
    assert_eq!(snapshot.positions.len(), 1);
    assert_eq!(snapshot.positions[0].avg_price, 120.0);
    assert_eq!(snapshot.positions[0].shares, 10.0);

    let log = svc.list_trades(user, 1).await.unwrap();
    assert_eq!(log.len(), 2); // deposit + surviving lot
}

#[tokio::test]
async fn scenario_edit_trade_rebuilds_and_keeps_ordering() {
    let svc = memory_service();
    let user = Uuid::new_v4();

    svc.record_cash(
        user,
        1,
        CashRequest {
            direction: CashDirection::Deposit,
            amount: 10_000.0,
            date: parse_date("2024-05-01"),
        },
    )
    .await
    .unwrap();
    let open = svc
        .record_trade(user, 1, trade("AAPL", TradeAction::Buy, false, 10.0, 100.0, "2024-05-02"))
        .await
        .unwrap();
    svc.record_trade(user, 1, trade("AAPL", TradeAction::Sell, false, 10.0, 110.0, "2024-05-03"))
        .await
        .unwrap();

    // reprice the open from 100 to 90; the close's P&L shifts accordingly
    let updated = svc
        .update_trade(
            user,
            1,
            open.event.id,
            trade("AAPL", TradeAction::Buy, false, 10.0, 90.0, "2024-05-02"),
        )
        .await
        .unwrap();

    assert_eq!(updated.event.id, open.event.id);
    assert_eq!(updated.event.insertion_order, open.event.insertion_order);
    // 10000 - 900 + 1100
    assert_eq!(updated.snapshot.cash, 10_200.0);
    assert!(updated.snapshot.positions.is_empty());
}

#[tokio::test]
async fn scenario_deleting_unknown_event_is_not_found() {
    let svc = memory_service();
    let user = Uuid::new_v4();

    svc.record_cash(
        user,
        1,
        CashRequest {
            direction: CashDirection::Deposit,
            amount: 100.0,
            date: parse_date("2024-05-01"),
        },
    )
    .await
    .unwrap();

    let err = svc.delete_trade(user, 1, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, folio_service::ServiceError::EventNotFound));
}
