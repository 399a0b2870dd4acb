//! Test harness driving a [`MintLifecycleController`] against the fake ledger

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use dropkit::controller::{ControllerConfig, MintLifecycleController};
use dropkit::settings::Settings;
use dropkit_common::{Address, InstantClock, Lamports, ProgramHandle, TimeSource};
use dropkit_fake_ledger::{FakeLedger, FakeWalletAdapter};
use tracing_subscriber::EnvFilter;

pub const PROGRAM_ID: &str = "cndyAnrLdpjq1Ssp1z8xxDsB8dxe7u4HL5Nxi2K5WXZ";
pub const CONFIG_ADDRESS: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
pub const MACHINE: &str = "Gk6fyfy8Ym4vBtCTDnUpDRUZAmmLHfyqBNXoqzFdLbXb";
pub const TREASURY: &str = "7iDQ9iyhNSPCmJUsdHDjmQjHjvsGJPBPM3ajkwiE3FkS";
pub const WALLET: &str = "HN7cABqLq46Es1jh92dQQisAq662SmxELLLsHHe4YWrH";

/// Wall clock time the tests start at, 2022-01-01T00:00:00Z
pub const NOW_MS: u64 = 1_640_995_200_000;

pub fn setup_tracing() {
    let default_filter = "debug";

    let env_filter = EnvFilter::new(default_filter);

    // Ok if successful, Err if already initialized
    // Allows us to setup tracing at the start of several parallel tests
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}

pub fn address(s: &str) -> Address {
    Address::from_str(s).expect("valid address")
}

/// A drop served by the fake ledger and the controller looking at it
#[derive(Debug)]
pub struct TestDrop {
    pub ledger: Arc<FakeLedger>,
    pub wallet: Arc<FakeWalletAdapter>,
    pub controller: Arc<MintLifecycleController>,
}

impl TestDrop {
    /// Connect the test wallet and notify the controller
    pub async fn connect_wallet(&self) {
        self.wallet.connect(address(WALLET));
        self.controller.on_wallet_changed().await;
    }

    /// Address of the test wallet
    pub fn wallet_address(&self) -> Address {
        address(WALLET)
    }
}

/// Builds a [`TestDrop`]
///
/// Time is an [`InstantClock`] anchored at [`NOW_MS`], run tests with a paused tokio clock to
/// control it.
#[derive(Debug, Clone)]
pub struct TestDropBuilder {
    items_available: u64,
    items_redeemed: u64,
    start_offset_ms: i64,
    price: Lamports,
    wallet_funds: Lamports,
    settings_toml: Option<String>,
}

impl Default for TestDropBuilder {
    fn default() -> Self {
        Self {
            items_available: 10,
            items_redeemed: 0,
            start_offset_ms: -1_000,
            price: Lamports::from_sol(1),
            wallet_funds: Lamports::from_sol(5),
            settings_toml: None,
        }
    }
}

impl TestDropBuilder {
    pub fn items(mut self, available: u64, redeemed: u64) -> Self {
        self.items_available = available;
        self.items_redeemed = redeemed;
        self
    }

    /// Sale start relative to [`NOW_MS`]
    pub fn starts_in_ms(mut self, offset_ms: i64) -> Self {
        self.start_offset_ms = offset_ms;
        self
    }

    pub fn price(mut self, price: Lamports) -> Self {
        self.price = price;
        self
    }

    pub fn wallet_funds(mut self, funds: Lamports) -> Self {
        self.wallet_funds = funds;
        self
    }

    /// Extra TOML merged over the generated `[program]` section
    pub fn settings(mut self, toml: &str) -> Self {
        self.settings_toml = Some(toml.to_string());
        self
    }

    pub fn build(self) -> Result<TestDrop> {
        let start_ms = NOW_MS.saturating_add_signed(self.start_offset_ms);
        let time: Arc<dyn TimeSource> = Arc::new(InstantClock::starting_at(NOW_MS));

        let ledger = Arc::new(FakeLedger::new(
            ProgramHandle {
                program_id: address(PROGRAM_ID),
                machine: address(MACHINE),
            },
            self.items_available,
            start_ms,
            self.price,
            time.clone(),
        ));
        ledger.set_items_redeemed(self.items_redeemed);
        ledger.fund(&address(WALLET), self.wallet_funds);

        let wallet = Arc::new(FakeWalletAdapter::new(ledger.clone()));

        let toml = format!(
            r#"
            [program]
            program_id = "{PROGRAM_ID}"
            config_address = "{CONFIG_ADDRESS}"
            treasury = "{TREASURY}"
            start_date = {start_ms}

            {}
            "#,
            self.settings_toml.unwrap_or_default()
        );
        let settings = Settings::from_toml_str(&toml)?;
        let config = ControllerConfig::try_from(&settings)?;

        let controller = Arc::new(MintLifecycleController::new(
            wallet.clone(),
            ledger.clone(),
            time,
            config,
        ));

        Ok(TestDrop {
            ledger,
            wallet,
            controller,
        })
    }
}
