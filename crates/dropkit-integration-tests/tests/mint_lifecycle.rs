//! End to end tests of the mint lifecycle against the fake ledger
//!
//! Every test runs on a paused tokio clock: the controller's wall clock is an
//! `InstantClock`, so `tokio::time::advance` moves the sale countdown and confirmation
//! delays resolve instantly.

use std::time::Duration;

use anyhow::Result;
use dropkit::button::ButtonLabel;
use dropkit::controller::{GuardRejection, MintAttempt, Phase};
use dropkit::mint::MintOutcome;
use dropkit::status::{
    Severity, INSUFFICIENT_FUNDS, MINT_FAILED, MINT_REJECTED, MINT_SUCCEEDED, REFRESH_FAILED,
    SALE_NOT_STARTED, SOLD_OUT,
};
use dropkit::MintFailure;
use dropkit_common::{Lamports, ProgramErrorCode};
use dropkit_fake_ledger::FakeMintBehavior;
use dropkit_integration_tests::*;

/// Sale starting one second from now:
/// 1. Inactive with a one second countdown
/// 2. Active once a second has elapsed, and stays active
#[tokio::test(start_paused = true)]
async fn test_sale_starts_after_countdown() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().starts_in_ms(1_000).build()?;
    drop.connect_wallet().await;

    let ui = drop.controller.ui_state();
    assert!(!ui.is_active);
    let view = drop.controller.button_view().expect("wallet connected");
    assert!(view.disabled);
    assert_eq!(view.label.to_string(), "0 hours, 0 minutes, 1 seconds");

    let countdown = drop.controller.start_countdown();

    tokio::time::advance(Duration::from_millis(1_000)).await;
    countdown.await?;

    assert!(drop.controller.ui_state().is_active);
    let view = drop.controller.button_view().expect("wallet connected");
    assert_eq!(view.label, ButtonLabel::Mint);
    assert!(!view.disabled);

    Ok(())
}

/// Mounting after the start date is active immediately
#[tokio::test(start_paused = true)]
async fn test_late_mount_is_active() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default()
        .starts_in_ms(-86_400_000)
        .build()?;
    drop.connect_wallet().await;
    drop.controller.on_mount().await;

    assert!(drop.controller.ui_state().is_active);
    assert_eq!(drop.controller.phase(), Phase::Idle);

    Ok(())
}

/// The ledger's go live date replaces the configured one once loaded
#[tokio::test(start_paused = true)]
async fn test_go_live_from_ledger() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().starts_in_ms(-1_000).build()?;
    drop.ledger.set_go_live(NOW_MS + 60_000);
    drop.connect_wallet().await;

    assert!(!drop.controller.ui_state().is_active);
    assert_eq!(drop.controller.snapshot().sale_start_ms, NOW_MS + 60_000);

    Ok(())
}

/// All items redeemed:
/// 1. Sold out with a disabled SOLD OUT button
/// 2. Mint is ignored without a notification
#[tokio::test(start_paused = true)]
async fn test_sold_out_from_counters() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().items(10, 10).build()?;
    drop.connect_wallet().await;

    let snapshot = drop.controller.snapshot();
    let sale = snapshot.sale.expect("sale state loaded");
    assert_eq!(sale.items_remaining, 0);
    assert!(snapshot.ui.is_sold_out);

    let view = drop.controller.button_view().expect("wallet connected");
    assert_eq!(view.label, ButtonLabel::SoldOut);
    assert_eq!(view.label.to_string(), "SOLD OUT");
    assert!(view.disabled);

    assert_eq!(
        drop.controller.mint().await,
        MintAttempt::Rejected(GuardRejection::SoldOut)
    );
    assert_eq!(drop.controller.notifications_shown(), 0);
    assert_eq!(drop.ledger.submissions(), 0);

    Ok(())
}

/// Submission rejected with the empty code while counters still show supply
#[tokio::test(start_paused = true)]
async fn test_sold_out_code_forces_sold_out() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().items(10, 3).build()?;
    drop.connect_wallet().await;
    assert!(!drop.controller.ui_state().is_sold_out);

    drop.ledger.set_next_mint(FakeMintBehavior::FailWithCode { code: 311 });
    let attempt = drop.controller.mint().await;

    assert_eq!(
        attempt,
        MintAttempt::Completed(MintOutcome::Failed(MintFailure::SoldOut))
    );

    let ui = drop.controller.ui_state();
    assert!(ui.is_sold_out);
    assert!(!ui.is_minting);
    let message = ui.status_message.expect("notification");
    assert_eq!(message.severity, Severity::Error);
    assert_eq!(message.text, SOLD_OUT);

    Ok(())
}

/// Empty code with a slow ledger:
/// 1. Sold out with a disabled button as soon as the attempt settles, before the refresh lands
/// 2. A mint pressed during the refresh is ignored and never submitted
#[tokio::test(start_paused = true)]
async fn test_sold_out_code_closes_sale_while_settling() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().items(10, 3).build()?;
    drop.connect_wallet().await;
    drop.ledger.set_read_delay(Duration::from_secs(3));
    drop.ledger.set_next_mint(FakeMintBehavior::FailWithCode { code: 311 });

    let mut snapshots = drop.controller.subscribe();
    let controller = drop.controller.clone();
    let attempt = tokio::spawn(async move { controller.mint().await });

    let settling = snapshots
        .wait_for(|snapshot| matches!(snapshot.phase, Phase::SettlingPostMint { .. }))
        .await?
        .clone();
    assert!(settling.ui.is_sold_out);
    assert!(!settling.ui.is_minting);

    let view = drop.controller.button_view().expect("wallet connected");
    assert_eq!(view.label, ButtonLabel::SoldOut);
    assert!(view.disabled);
    assert!(matches!(
        drop.controller.mint().await,
        MintAttempt::Rejected(_)
    ));

    assert_eq!(
        attempt.await?,
        MintAttempt::Completed(MintOutcome::Failed(MintFailure::SoldOut))
    );
    assert_eq!(drop.controller.phase(), Phase::Idle);
    assert!(drop.controller.ui_state().is_sold_out);
    assert_eq!(drop.ledger.submissions(), 1);
    assert_eq!(drop.controller.notifications_shown(), 1);

    Ok(())
}

/// Submission rejected with the not live code
#[tokio::test(start_paused = true)]
async fn test_not_live_code() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().build()?;
    drop.connect_wallet().await;

    drop.ledger.set_next_mint(FakeMintBehavior::FailWithCode { code: 312 });
    drop.controller.mint().await;

    let ui = drop.controller.ui_state();
    assert!(!ui.is_sold_out);
    assert!(!ui.is_minting);
    let message = ui.status_message.expect("notification");
    assert_eq!(message.text, SALE_NOT_STARTED);
    assert_eq!(message.severity, Severity::Error);

    Ok(())
}

/// Wallet short of the price: the program rejects with the funds code
#[tokio::test(start_paused = true)]
async fn test_insufficient_funds() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default()
        .price(Lamports::from_sol(2))
        .wallet_funds(Lamports::from_sol(1))
        .build()?;
    drop.connect_wallet().await;

    let attempt = drop.controller.mint().await;
    assert_eq!(
        attempt,
        MintAttempt::Completed(MintOutcome::Failed(MintFailure::InsufficientFunds))
    );
    assert_eq!(
        drop.controller.ui_state().status_message.map(|m| m.text),
        Some(INSUFFICIENT_FUNDS.to_string())
    );
    assert_eq!(drop.ledger.items_redeemed(), 0);

    Ok(())
}

/// Hexadecimal codes in a raw transaction message map to the same reasons as the numeric ones
#[tokio::test(start_paused = true)]
async fn test_raw_message_codes() -> Result<()> {
    setup_tracing();
    let cases = [
        (ProgramErrorCode::NotEnoughSol, INSUFFICIENT_FUNDS),
        (ProgramErrorCode::CandyMachineEmpty, SOLD_OUT),
        (ProgramErrorCode::CandyMachineNotLive, SALE_NOT_STARTED),
    ];

    for (code, text) in cases {
        let drop = TestDropBuilder::default().build()?;
        drop.connect_wallet().await;

        drop.ledger.set_next_mint(FakeMintBehavior::FailWithMessage {
            message: format!(
                "Transaction simulation failed: Error processing Instruction 0: custom program error: 0x{:x}",
                code.to_code()
            ),
        });
        drop.controller.mint().await;

        assert_eq!(
            drop.controller.ui_state().status_message.map(|m| m.text),
            Some(text.to_string()),
            "{code}"
        );
    }

    Ok(())
}

/// Confirmation without an error
#[tokio::test(start_paused = true)]
async fn test_successful_mint() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().items(10, 4).build()?;
    drop.connect_wallet().await;

    let attempt = drop.controller.mint().await;
    assert!(matches!(
        attempt,
        MintAttempt::Completed(MintOutcome::Confirmed { .. })
    ));

    let notification = drop.controller.visible_notification().expect("notification");
    assert_eq!(notification.message.severity, Severity::Success);
    assert_eq!(notification.message.text, MINT_SUCCEEDED);

    let summary = drop.controller.wallet_summary().expect("wallet connected");
    assert_eq!(summary.items_redeemed, 5);
    assert_eq!(summary.items_remaining, 5);
    assert_eq!(summary.balance_sol, 4.0);
    assert_eq!(
        drop.ledger.balance_of(&address(TREASURY)),
        Lamports::from_sol(1)
    );

    Ok(())
}

/// Every way a submitted mint can settle leaves minting cleared and exactly one notification
#[tokio::test(start_paused = true)]
async fn test_every_outcome_settles() -> Result<()> {
    setup_tracing();
    let cases = [
        (FakeMintBehavior::Land, MINT_SUCCEEDED),
        (
            FakeMintBehavior::LandWithError {
                err: "InstructionError(0, Custom(1))".to_string(),
            },
            MINT_REJECTED,
        ),
        (FakeMintBehavior::Drop, MINT_FAILED),
        (FakeMintBehavior::FailWithCode { code: 311 }, SOLD_OUT),
        (FakeMintBehavior::FailWithCode { code: 6000 }, "custom program error: 0x1770"),
        (
            FakeMintBehavior::FailWithMessage {
                message: "Blockhash not found".to_string(),
            },
            "Blockhash not found",
        ),
    ];

    for (behavior, text) in cases {
        let drop = TestDropBuilder::default()
            .settings("[rpc]\ntx_timeout_ms = 2000")
            .build()?;
        drop.connect_wallet().await;
        let shown_before = drop.controller.notifications_shown();

        drop.ledger.set_next_mint(behavior.clone());
        let attempt = drop.controller.mint().await;
        assert!(matches!(attempt, MintAttempt::Completed(_)), "{behavior:?}");

        let ui = drop.controller.ui_state();
        assert!(!ui.is_minting, "{behavior:?}");
        assert_eq!(drop.controller.phase(), Phase::Idle, "{behavior:?}");
        assert_eq!(
            drop.controller.notifications_shown(),
            shown_before + 1,
            "{behavior:?}"
        );
        assert_eq!(
            ui.status_message.map(|m| m.text),
            Some(text.to_string()),
            "{behavior:?}"
        );
        assert_eq!(drop.ledger.submissions(), 1, "{behavior:?}");
    }

    Ok(())
}

/// Confirmation budget expiring: reported as failed, the mint is not retried
#[tokio::test(start_paused = true)]
async fn test_timeout_is_abandoned() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default()
        .settings("[rpc]\ntx_timeout_ms = 5000")
        .build()?;
    drop.ledger.set_confirmation_delay(Duration::from_secs(10));
    drop.connect_wallet().await;

    let started = tokio::time::Instant::now();
    let attempt = drop.controller.mint().await;
    assert!(started.elapsed() < Duration::from_secs(10));

    let MintAttempt::Completed(outcome) = attempt else {
        panic!("mint was not submitted");
    };
    assert!(matches!(outcome, MintOutcome::TimedOut { .. }));
    assert!(outcome.transaction_id().is_some());
    assert_eq!(drop.ledger.submissions(), 1);
    // the abandoned transaction landed anyway, the refresh already shows it
    assert_eq!(drop.controller.snapshot().sale.map(|s| s.items_redeemed), Some(1));

    Ok(())
}

/// A second mint while one is in flight is ignored
#[tokio::test(start_paused = true)]
async fn test_double_click() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().build()?;
    drop.connect_wallet().await;

    let (first, second) = tokio::join!(drop.controller.mint(), drop.controller.mint());

    assert!(matches!(first, MintAttempt::Completed(_)));
    assert_eq!(second, MintAttempt::Rejected(GuardRejection::AlreadyMinting));
    assert_eq!(drop.ledger.submissions(), 1);
    assert_eq!(drop.controller.notifications_shown(), 1);

    Ok(())
}

/// No wallet: refreshes are silent no-ops and mints are ignored
#[tokio::test(start_paused = true)]
async fn test_no_wallet() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().build()?;
    drop.controller.on_mount().await;

    assert_eq!(drop.controller.snapshot().sale, None);
    assert_eq!(drop.controller.notifications_shown(), 0);
    assert_eq!(drop.controller.button_view(), None);
    assert_eq!(
        drop.controller.mint().await,
        MintAttempt::Rejected(GuardRejection::NoWallet)
    );
    assert_eq!(drop.ledger.state_reads(), 0);

    Ok(())
}

/// Ledger unreachable on load: one generic failure notification, nothing retried
#[tokio::test(start_paused = true)]
async fn test_ledger_unavailable() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().build()?;
    drop.ledger.set_unavailable(true);
    drop.connect_wallet().await;

    let notification = drop.controller.visible_notification().expect("notification");
    assert_eq!(notification.message.text, REFRESH_FAILED);
    assert_eq!(notification.message.severity, Severity::Error);
    assert_eq!(drop.controller.notifications_shown(), 1);
    assert_eq!(drop.controller.phase(), Phase::Idle);

    // the program never loaded
    assert_eq!(
        drop.controller.mint().await,
        MintAttempt::Rejected(GuardRejection::ProgramNotLoaded)
    );

    Ok(())
}

/// Ledger going away while a mint is being confirmed still settles, with stale balances
#[tokio::test(start_paused = true)]
async fn test_outage_during_settle() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().build()?;
    drop.connect_wallet().await;

    let ledger = drop.ledger.clone();
    let mut snapshots = drop.controller.subscribe();
    let watcher = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            if snapshots.borrow_and_update().phase == Phase::Minting {
                ledger.set_unavailable(true);
            }
        }
    });

    let attempt = drop.controller.mint().await;
    assert!(matches!(
        attempt,
        MintAttempt::Completed(MintOutcome::Confirmed { .. })
    ));

    let ui = drop.controller.ui_state();
    assert!(!ui.is_minting);
    assert_eq!(ui.balance_lamports, Some(Lamports::from_sol(5)));
    assert_eq!(
        ui.status_message.map(|m| m.text),
        Some(MINT_SUCCEEDED.to_string())
    );
    assert_eq!(drop.controller.phase(), Phase::Idle);
    assert_eq!(drop.controller.notifications_shown(), 1);

    drop.controller.unmount();
    watcher.abort();

    Ok(())
}

/// One snapshot per transition, none when nothing changed
#[tokio::test(start_paused = true)]
async fn test_snapshots_follow_transitions() -> Result<()> {
    setup_tracing();
    let drop = TestDropBuilder::default().build()?;
    let mut snapshots = drop.controller.subscribe();

    drop.connect_wallet().await;
    assert!(snapshots.has_changed()?);
    let snapshot = snapshots.borrow_and_update().clone();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.ui.is_active);
    assert_eq!(snapshot.ui.balance_lamports, Some(Lamports::from_sol(5)));

    // nothing changed, nothing published
    drop.controller.tick();
    assert!(!snapshots.has_changed()?);

    Ok(())
}
