//! Mint lifecycle controller
//!
//! Orchestrates state refreshes, the mint button and the post-mint settle step. All state is
//! owned by the controller and only touched between awaits, the lock is never held across an
//! await point.

use std::sync::Arc;
use std::time::Duration;

use dropkit_common::{
    duration_ms, Address, Commitment, Error, Lamports, LedgerProgramClient, ProgramHandle,
    TimeSource, WalletAdapter, WalletSession,
};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::button::MintButtonView;
use crate::clock::SaleActivationClock;
use crate::ledger::{LedgerStateReader, SaleSnapshot};
use crate::mint::{MintOperation, MintOutcome};
use crate::status::{MintFailure, Notification, StatusMessage, REFRESH_FAILED};

mod state;

pub use state::{
    GuardRejection, MintAttempt, MintUiSnapshot, MintUiState, Phase, WalletSummary,
};

/// Characters kept at each end of a shortened wallet address
const SHORT_ADDRESS_CHARS: usize = 4;

/// Everything the controller needs to know about the drop
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Mint program id
    pub program_id: Address,
    /// Program config account
    pub config_address: Address,
    /// Treasury credited by mints
    pub treasury: Address,
    /// Sale start used until the ledger reports the go live date, unix time in milliseconds
    pub start_date_ms: u64,
    /// Confirmation budget per mint
    pub tx_timeout: Duration,
    /// Commitment level waited for
    pub commitment: Commitment,
    /// Skip preflight checks when confirming
    pub skip_preflight: bool,
    /// How often the countdown is re-evaluated
    pub countdown_tick: Duration,
    /// How long a notification stays visible
    pub notification_auto_hide: Duration,
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    wallet: Option<WalletSession>,
    sale: Option<SaleSnapshot>,
    sale_start_ms: u64,
    balance: Option<Lamports>,
    program_reported_sold_out: bool,
    /// Increases with every mint that passes the guard
    attempt: u64,
    clock: SaleActivationClock,
    notification: Option<Notification>,
    notifications_shown: u64,
}

impl Inner {
    fn is_sold_out(&self) -> bool {
        self.program_reported_sold_out
            || self
                .sale
                .as_ref()
                .map(|snapshot| snapshot.sale.is_sold_out())
                .unwrap_or(false)
    }

    fn ui_state(&self) -> MintUiState {
        let is_sold_out = self.is_sold_out();

        MintUiState {
            is_active: self.clock.is_active(),
            is_sold_out,
            // a sold out drop never shows the spinner, even while the last attempt settles
            is_minting: self.phase.is_minting() && !is_sold_out,
            balance_lamports: self.balance,
            status_message: self
                .notification
                .as_ref()
                .map(|notification| notification.message.clone()),
        }
    }

    fn snapshot(&self) -> MintUiSnapshot {
        MintUiSnapshot {
            phase: self.phase.clone(),
            ui: self.ui_state(),
            sale: self.sale.as_ref().map(|snapshot| snapshot.sale),
            sale_start_ms: self.sale_start_ms,
            notification: self.notification.clone(),
        }
    }

    fn evaluate_activation(&mut self) {
        if self.clock.evaluate(self.sale_start_ms) {
            tracing::info!("Sale is active");
        }
    }

    fn apply_sale(&mut self, snapshot: SaleSnapshot) {
        self.sale_start_ms = snapshot.sale.sale_start_ms;
        self.sale = Some(snapshot);
        self.evaluate_activation();
    }

    fn notify(&mut self, message: StatusMessage) {
        tracing::info!("Notification ({}): {}", message.severity, message.text);
        self.notification = Some(Notification::new(message, self.clock.now_ms()));
        self.notifications_shown += 1;
    }

    fn finish_refresh(&mut self) {
        if self.phase == Phase::Refreshing {
            self.phase = Phase::Idle;
        }
        self.evaluate_activation();
    }
}

/// Mint lifecycle controller
///
/// Created when the view mounts and dropped (after [`MintLifecycleController::unmount`]) when
/// it unmounts. Nothing survives it, the ledger is the only durable store.
#[derive(Debug)]
pub struct MintLifecycleController {
    reader: LedgerStateReader,
    operation: MintOperation,
    config: ControllerConfig,
    inner: Mutex<Inner>,
    snapshot_tx: watch::Sender<MintUiSnapshot>,
    cancel: CancellationToken,
}

impl MintLifecycleController {
    /// Create new [`MintLifecycleController`]
    pub fn new(
        wallet_adapter: Arc<dyn WalletAdapter>,
        client: Arc<dyn LedgerProgramClient>,
        time: Arc<dyn TimeSource>,
        config: ControllerConfig,
    ) -> Self {
        let reader =
            LedgerStateReader::new(wallet_adapter, client.clone(), config.program_id.clone());
        let operation = MintOperation::new(client, config.commitment, config.skip_preflight);

        let inner = Inner {
            phase: Phase::Idle,
            wallet: None,
            sale: None,
            sale_start_ms: config.start_date_ms,
            balance: None,
            program_reported_sold_out: false,
            attempt: 0,
            clock: SaleActivationClock::new(time),
            notification: None,
            notifications_shown: 0,
        };

        let (snapshot_tx, _) = watch::channel(inner.snapshot());

        Self {
            reader,
            operation,
            config,
            inner: Mutex::new(inner),
            snapshot_tx,
            cancel: CancellationToken::new(),
        }
    }

    /// Subscribe to state snapshots, one is published after every transition
    pub fn subscribe(&self) -> watch::Receiver<MintUiSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> MintUiSnapshot {
        self.inner.lock().snapshot()
    }

    /// Current UI flags
    pub fn ui_state(&self) -> MintUiState {
        self.inner.lock().ui_state()
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.inner.lock().phase.clone()
    }

    /// Number of notifications shown since mount
    pub fn notifications_shown(&self) -> u64 {
        self.inner.lock().notifications_shown
    }

    /// Notification still visible, honouring dismissal and auto hide
    pub fn visible_notification(&self) -> Option<Notification> {
        let inner = self.inner.lock();
        let now_ms = inner.clock.now_ms();
        let auto_hide_ms = duration_ms(self.config.notification_auto_hide);

        inner
            .notification
            .as_ref()
            .filter(|notification| notification.is_visible(now_ms, auto_hide_ms))
            .cloned()
    }

    /// Close the current notification
    pub fn dismiss_notification(&self) {
        let mut inner = self.inner.lock();
        if let Some(notification) = inner.notification.as_mut() {
            notification.dismiss();
        }
        self.publish(&inner);
    }

    /// Mint button, `None` while no wallet is connected
    pub fn button_view(&self) -> Option<MintButtonView> {
        let inner = self.inner.lock();
        inner.wallet.as_ref()?;

        Some(MintButtonView::from_state(
            &inner.ui_state(),
            inner.clock.countdown(inner.sale_start_ms),
        ))
    }

    /// Wallet header, `None` while no wallet is connected
    pub fn wallet_summary(&self) -> Option<WalletSummary> {
        let inner = self.inner.lock();
        let wallet = inner.wallet.as_ref()?;
        let sale = inner
            .sale
            .as_ref()
            .map(|snapshot| snapshot.sale)
            .unwrap_or_default();

        Some(WalletSummary {
            short_address: wallet.address.shorten(SHORT_ADDRESS_CHARS),
            balance_sol: inner.balance.unwrap_or_default().to_sol(),
            items_available: sale.items_available,
            items_redeemed: sale.items_redeemed,
            items_remaining: sale.items_remaining,
        })
    }

    /// View mounted
    pub async fn on_mount(&self) {
        self.refresh_and_report().await;
    }

    /// Wallet connected, disconnected or switched
    pub async fn on_wallet_changed(&self) {
        let session = self.reader.current_session();
        {
            let mut inner = self.inner.lock();
            if inner.wallet != session {
                match &session {
                    Some(wallet) => tracing::info!("Wallet {} connected", wallet.address),
                    None => {
                        tracing::info!("Wallet disconnected");
                        inner.balance = None;
                    }
                }
                inner.wallet = session;
            }
            self.publish(&inner);
        }

        self.refresh_and_report().await;
    }

    /// Re-read sale state and balance
    ///
    /// A missing wallet makes this a no-op.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), Error> {
        let wallet = self.reader.current_session();
        {
            let mut inner = self.inner.lock();
            inner.wallet = wallet.clone();
            if inner.phase == Phase::Idle {
                inner.phase = Phase::Refreshing;
            }
            self.publish(&inner);
        }

        let Some(wallet) = wallet else {
            let mut inner = self.inner.lock();
            inner.finish_refresh();
            self.publish(&inner);
            return Ok(());
        };

        let (sale, balance) = tokio::join!(
            self.reader.refresh_sale_state(Some(&wallet)),
            self.reader.refresh_balance(Some(&wallet))
        );

        let mut inner = self.inner.lock();
        let mut result = Ok(());

        match sale {
            Ok(snapshot) => inner.apply_sale(snapshot),
            Err(Error::NoWallet) => (),
            Err(err) => result = Err(err),
        }

        match balance {
            Ok(balance) => inner.balance = Some(balance),
            Err(Error::NoWallet) => (),
            Err(err) => {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        inner.finish_refresh();
        self.publish(&inner);

        result
    }

    /// Re-evaluate the sale activation, returns whether the sale is active
    pub fn tick(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.evaluate_activation();
        self.publish(&inner);
        inner.clock.is_active()
    }

    /// Spawn the countdown ticker
    ///
    /// The task stops once the sale is active or when the controller is unmounted.
    pub fn start_countdown(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let cancel = self.cancel.child_token();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(controller.config.countdown_tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Countdown cancelled");
                        break;
                    }
                    _ = interval.tick() => {
                        if controller.tick() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// View unmounted, stops background tasks
    pub fn unmount(&self) {
        self.cancel.cancel();
    }

    /// User pressed the mint button
    ///
    /// Guarded: ignored while sold out, minting, before the sale starts or without a wallet.
    /// Otherwise exactly one mint is submitted, exactly one notification is shown and the
    /// settle step always runs.
    #[instrument(skip(self))]
    pub async fn mint(&self) -> MintAttempt {
        let (attempt, wallet, handle) = match self.begin_mint() {
            Ok(begun) => begun,
            Err(rejection) => {
                tracing::debug!("Mint ignored: {}", rejection);
                return MintAttempt::Rejected(rejection);
            }
        };

        let guard = MintingGuard::new(self, attempt);

        let outcome = self
            .operation
            .submit_mint(
                &wallet,
                &handle,
                &self.config.config_address,
                &self.config.treasury,
                self.config.tx_timeout,
            )
            .await;

        self.settle(outcome.clone()).await;
        guard.disarm();

        MintAttempt::Completed(outcome)
    }

    fn begin_mint(&self) -> Result<(u64, WalletSession, ProgramHandle), GuardRejection> {
        let wallet = self.reader.current_session();

        let mut inner = self.inner.lock();
        inner.evaluate_activation();

        let wallet = wallet.ok_or(GuardRejection::NoWallet)?;

        if inner.phase.is_minting() {
            return Err(GuardRejection::AlreadyMinting);
        }

        if inner.is_sold_out() {
            return Err(GuardRejection::SoldOut);
        }

        if !inner.clock.is_active() {
            return Err(GuardRejection::SaleInactive);
        }

        let handle = inner
            .sale
            .as_ref()
            .map(|snapshot| snapshot.handle.clone())
            .ok_or(GuardRejection::ProgramNotLoaded)?;

        inner.attempt += 1;
        inner.phase = Phase::Minting;
        self.publish(&inner);

        Ok((inner.attempt, wallet, handle))
    }

    /// Runs on every exit path of a mint: shows the outcome, refreshes the balance and the
    /// sale state, and clears the minting flag
    ///
    /// The phase stays [`Phase::SettlingPostMint`] until both refreshes finished, so no other
    /// mint passes the guard in between.
    async fn settle(&self, outcome: MintOutcome) {
        let wallet = self.reader.current_session();
        {
            let mut inner = self.inner.lock();
            // Sticky: a lagging refresh must not reopen the sale
            if outcome == MintOutcome::Failed(MintFailure::SoldOut) {
                inner.program_reported_sold_out = true;
            }
            inner.notify(outcome.status_message());
            inner.phase = Phase::SettlingPostMint { outcome };
            self.publish(&inner);
        }

        // Refresh failures here are logged only, the attempt already has its notification
        let (sale, balance) = tokio::join!(
            self.reader.refresh_sale_state(wallet.as_ref()),
            self.reader.refresh_balance(wallet.as_ref())
        );

        let mut inner = self.inner.lock();
        match balance {
            Ok(balance) => inner.balance = Some(balance),
            Err(Error::NoWallet) => (),
            Err(err) => tracing::warn!("Could not refresh balance after mint: {}", err),
        }
        match sale {
            Ok(snapshot) => inner.apply_sale(snapshot),
            Err(Error::NoWallet) => (),
            Err(err) => tracing::warn!("Could not refresh sale state after mint: {}", err),
        }
        inner.phase = Phase::Idle;
        inner.evaluate_activation();
        self.publish(&inner);
    }

    async fn refresh_and_report(&self) {
        if let Err(err) = self.refresh().await {
            tracing::error!("Could not refresh sale state: {}", err);
            let mut inner = self.inner.lock();
            inner.notify(StatusMessage::error(REFRESH_FAILED));
            self.publish(&inner);
        }
    }

    fn publish(&self, inner: &Inner) {
        let snapshot = inner.snapshot();
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

/// Clears the minting phase if a mint future is dropped before it settled
///
/// Only the attempt that set the phase may clear it.
struct MintingGuard<'a> {
    controller: &'a MintLifecycleController,
    attempt: u64,
    armed: bool,
}

impl<'a> MintingGuard<'a> {
    fn new(controller: &'a MintLifecycleController, attempt: u64) -> Self {
        Self {
            controller,
            attempt,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for MintingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut inner = self.controller.inner.lock();
        if inner.attempt == self.attempt && inner.phase.is_minting() {
            tracing::warn!(
                "Mint attempt {} abandoned before it settled, clearing minting state",
                self.attempt
            );
            inner.phase = Phase::Idle;
            self.controller.publish(&inner);
        }
    }
}
