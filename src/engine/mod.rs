//! Vending transaction engine.
//!
//! The engine owns the item inventory, the change vault and the single
//! purchase in progress. A purchase moves from idle to awaiting payment when
//! coins are paid in, and back to idle once the item is sold or the purchase
//! is cancelled. Also supports async stream of commands.

use std::collections::BTreeSet;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};

use crate::Cents;
use crate::config::MachineConfig;
use crate::model::{Coins, Command, ItemKind, Items};

mod change;
pub use change::make_change;

mod state;
pub use state::{ChangeVault, InventoryLedger, PendingPurchase};

mod error;
pub use error::{InsufficientChange, VendError};

/// Successful result of a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Items(BTreeSet<ItemKind>),
    Price(Cents),
    /// Item sold; the change paid out (possibly none).
    Change(Coins),
    /// Purchase cancelled; the deposit handed back.
    Returned(Coins),
    Total(Cents),
    Loaded,
}

/// Record of one command applied by [`Engine::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub seq: usize,
    pub op: &'static str,
    pub result: Result<Outcome, VendError>,
}

/// The vending engine.
///
/// Operations are not synchronized; callers serving several customers must
/// funnel them through a single owner.
#[derive(Debug, Default)]
pub struct Engine {
    inventory: InventoryLedger,
    vault: ChangeVault,
    /// The open purchase, `None` when idle
    pending: Option<PendingPurchase>,
}

/// Public API
impl Engine {
    /// An empty machine: no stock, no change.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stock(items: Items, coins: Coins) -> Self {
        Self {
            inventory: InventoryLedger::new(items),
            vault: ChangeVault::new(coins),
            pending: None,
        }
    }

    /// A machine stocked as described by `config`.
    pub fn from_config(config: &MachineConfig) -> Self {
        Self::with_stock(config.initial_items(), config.initial_coins())
    }

    /// Run the engine with the given command stream.
    ///
    /// Rejected commands do not stop the run; every command gets a receipt.
    pub async fn run(&mut self, mut stream: impl Stream<Item = Command> + Unpin) -> Vec<Receipt> {
        let mut receipts = Vec::new();
        while let Some(command) = stream.next().await {
            let op = command.name();
            let result = self.apply(command);
            receipts.push(Receipt {
                seq: receipts.len() + 1,
                op,
                result,
            });
        }
        receipts
    }

    /// Apply a single command on top of the current engine state
    pub fn apply(&mut self, command: Command) -> Result<Outcome, VendError> {
        let op = command.name();
        let result = match command {
            Command::ListItems => Ok(Outcome::Items(self.available_items())),
            Command::Price(item) => Ok(Outcome::Price(self.price_of(item))),
            Command::Buy { item, coins } => self.buy(item, &coins).map(Outcome::Change),
            Command::TopUp { coins } => self.top_up(&coins).map(Outcome::Change),
            Command::Cancel => Ok(Outcome::Returned(self.cancel())),
            Command::LoadChange { coins } => {
                self.load_change(&coins);
                Ok(Outcome::Loaded)
            }
            Command::ChangeTotal => Ok(Outcome::Total(self.total_change_value())),
            Command::LoadStock { items } => {
                self.load_stock(&items);
                Ok(Outcome::Loaded)
            }
        };
        self.log_result(op, &result);
        result
    }

    /// Item kinds currently in stock.
    pub fn available_items(&self) -> BTreeSet<ItemKind> {
        self.inventory.available()
    }

    pub fn price_of(&self, item: ItemKind) -> Cents {
        item.price()
    }

    pub fn stock_count(&self, item: ItemKind) -> u32 {
        self.inventory.stock_count(item)
    }

    pub fn vault(&self) -> &ChangeVault {
        &self.vault
    }

    pub fn pending(&self) -> Option<&PendingPurchase> {
        self.pending.as_ref()
    }

    /// Select `item` and pay `coins` towards it.
    ///
    /// Coins go into the vault straight away and stay credited to the
    /// purchase until it completes or is cancelled. Selecting an item while
    /// another is pending switches the selection and keeps the deposit.
    pub fn buy(&mut self, item: ItemKind, coins: &Coins) -> Result<Coins, VendError> {
        self.pay(item, coins)
    }

    /// Add `coins` to the pending purchase and try to complete it.
    pub fn top_up(&mut self, coins: &Coins) -> Result<Coins, VendError> {
        let item = self
            .pending
            .as_ref()
            .map(|pending| pending.item)
            .ok_or(VendError::NoPendingPurchase)?;
        self.pay(item, coins)
    }

    /// Abandon the pending purchase and hand back exactly the coins paid in.
    pub fn cancel(&mut self) -> Coins {
        match self.pending.take() {
            Some(pending) => {
                self.vault.withdraw_bulk(&pending.deposited);
                pending.deposited
            }
            None => Coins::new(),
        }
    }

    pub fn load_change(&mut self, coins: &Coins) {
        self.vault.deposit(coins);
    }

    pub fn total_change_value(&self) -> Cents {
        self.vault.total_value()
    }

    pub fn load_stock(&mut self, items: &Items) {
        self.inventory.add_stock(items);
    }
}

/// Private API
impl Engine {
    fn log_result(&self, op: &str, result: &Result<Outcome, VendError>) {
        let pending = self.pending.as_ref().map(|p| p.item.as_str()).unwrap_or("none");
        match result {
            Ok(_) => {
                info!(
                    pending,
                    vault = %self.vault.total_value(),
                    "{op} applied"
                );
            }
            Err(e) => {
                info!(
                    pending,
                    vault = %self.vault.total_value(),
                    reason = %e,
                    "{op} rejected"
                );
            }
        }
    }

    /// Shared path of `buy` and `top_up`:
    /// - Ensure the item is in stock (nothing changes otherwise)
    /// - Credit the coins to the vault and to the pending purchase
    /// - Compare what was paid with the price
    /// - Make change, then release the item and close the purchase
    fn pay(&mut self, item: ItemKind, coins: &Coins) -> Result<Coins, VendError> {
        if self.inventory.stock_count(item) == 0 {
            return Err(VendError::ItemUnavailable(item));
        }

        self.vault.deposit(coins);
        let pending = self
            .pending
            .get_or_insert_with(|| PendingPurchase::new(item));
        pending.item = item;
        pending.add_coins(coins);

        let paid = pending.paid();
        let price = item.price();
        let Some(owed) = paid.checked_sub(price) else {
            return Err(VendError::InsufficientFunds {
                item,
                deficit: price - paid,
            });
        };

        // on failure the deposit stays in the vault and on the purchase
        let change = make_change(owed, &mut self.vault)?;

        self.inventory.dispense(item);
        self.pending = None;
        debug!(item = %item, paid = %paid, owed = %owed, "item sold");

        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Denomination;

    // test utils

    fn coins(pairs: &[(Denomination, u32)]) -> Coins {
        pairs.iter().copied().collect()
    }

    fn crisps_only() -> Engine {
        Engine::with_stock(Items::from([(ItemKind::Crisps, 1)]), Coins::new())
    }

    fn cola_and_crisps() -> Engine {
        Engine::with_stock(
            Items::from([(ItemKind::CocaCola, 2), (ItemKind::Crisps, 1)]),
            Coins::new(),
        )
    }

    #[test]
    fn new_engine_is_empty() {
        let engine = Engine::new();
        assert!(engine.available_items().is_empty());
        assert_eq!(engine.total_change_value(), Cents::ZERO);
        assert!(engine.pending().is_none());
    }

    #[test]
    fn available_items_and_prices() {
        let engine = cola_and_crisps();
        assert_eq!(
            engine.available_items(),
            BTreeSet::from([ItemKind::CocaCola, ItemKind::Crisps])
        );
        assert_eq!(engine.price_of(ItemKind::MarsBar), Cents::new(75));
    }

    // Buy

    #[test]
    fn exact_payment_sells_without_change() {
        let mut engine = crisps_only();
        let change = engine
            .buy(ItemKind::Crisps, &coins(&[(Denomination::FiftyCents, 1)]))
            .unwrap();

        assert!(change.is_empty());
        assert_eq!(engine.stock_count(ItemKind::Crisps), 0);
        assert!(engine.available_items().is_empty());
        assert!(engine.pending().is_none());
        assert_eq!(engine.total_change_value(), Cents::new(50));
    }

    #[test]
    fn overpayment_is_paid_back_from_deposit() {
        let mut engine = cola_and_crisps();
        let change = engine
            .buy(ItemKind::Crisps, &coins(&[(Denomination::TenCents, 6)]))
            .unwrap();

        assert_eq!(change, coins(&[(Denomination::TenCents, 1)]));
        assert_eq!(engine.vault().count(Denomination::TenCents), 5);
    }

    #[test]
    fn buy_unavailable_item_changes_nothing() {
        let mut engine = crisps_only();
        let result = engine.buy(ItemKind::CocaCola, &coins(&[(Denomination::OneDollar, 2)]));

        assert_eq!(result, Err(VendError::ItemUnavailable(ItemKind::CocaCola)));
        assert_eq!(engine.total_change_value(), Cents::ZERO);
        assert!(engine.pending().is_none());
        assert_eq!(engine.stock_count(ItemKind::Crisps), 1);
    }

    #[test]
    fn buy_unavailable_item_keeps_pending_purchase() {
        let mut engine = crisps_only();
        let _ = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::TenCents, 2)]));

        let result = engine.buy(ItemKind::MarsBar, &coins(&[(Denomination::OneDollar, 1)]));

        assert_eq!(result, Err(VendError::ItemUnavailable(ItemKind::MarsBar)));
        let pending = engine.pending().unwrap();
        assert_eq!(pending.item, ItemKind::Crisps);
        assert_eq!(pending.deposited, coins(&[(Denomination::TenCents, 2)]));
        assert_eq!(engine.total_change_value(), Cents::new(20));
        assert_eq!(engine.vault().count(Denomination::OneDollar), 0);
        assert_eq!(engine.stock_count(ItemKind::Crisps), 1);
    }

    #[test]
    fn insufficient_funds_reports_deficit_and_keeps_deposit() {
        let mut engine = crisps_only();
        let result = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::TenCents, 2)]));

        assert_eq!(
            result,
            Err(VendError::InsufficientFunds {
                item: ItemKind::Crisps,
                deficit: Cents::new(30)
            })
        );
        assert_eq!(engine.stock_count(ItemKind::Crisps), 1);
        assert_eq!(engine.total_change_value(), Cents::new(20));

        let pending = engine.pending().unwrap();
        assert_eq!(pending.item, ItemKind::Crisps);
        assert_eq!(pending.paid(), Cents::new(20));
    }

    #[test]
    fn repeated_short_payments_only_grow_the_deposit() {
        let mut engine = crisps_only();
        let dime = coins(&[(Denomination::TenCents, 1)]);

        for round in 1..=4u64 {
            let result = engine.buy(ItemKind::Crisps, &dime);
            assert!(matches!(result, Err(VendError::InsufficientFunds { .. })));
            assert_eq!(engine.stock_count(ItemKind::Crisps), 1);
            assert_eq!(engine.pending().unwrap().paid(), Cents::new(10 * round));
        }

        // the fifth dime completes the purchase
        assert!(engine.buy(ItemKind::Crisps, &dime).unwrap().is_empty());
        assert_eq!(engine.stock_count(ItemKind::Crisps), 0);
    }

    #[test]
    fn insufficient_change_keeps_purchase_open() {
        let mut engine = crisps_only();
        let result = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::OneDollar, 1)]));

        assert_eq!(
            result,
            Err(VendError::InsufficientChange(InsufficientChange {
                owed: Cents::new(50)
            }))
        );
        assert_eq!(engine.stock_count(ItemKind::Crisps), 1);
        assert_eq!(engine.total_change_value(), Cents::new(100));
        assert_eq!(engine.pending().unwrap().paid(), Cents::new(100));
    }

    #[test]
    fn selecting_another_item_carries_deposit_over() {
        let mut engine = cola_and_crisps();
        let result = engine.buy(ItemKind::CocaCola, &coins(&[(Denomination::FiftyCents, 1)]));
        assert!(matches!(
            result,
            Err(VendError::InsufficientFunds { deficit, .. }) if deficit == Cents::new(100)
        ));

        // switching to crisps: the 50 already paid covers it
        let change = engine.buy(ItemKind::Crisps, &Coins::new()).unwrap();
        assert!(change.is_empty());
        assert_eq!(engine.stock_count(ItemKind::Crisps), 0);
        assert_eq!(engine.stock_count(ItemKind::CocaCola), 2);
    }

    #[test]
    fn buy_all_of_an_item() {
        let mut engine = cola_and_crisps();
        let payment = coins(&[(Denomination::FiftyCents, 1), (Denomination::OneDollar, 1)]);

        engine.buy(ItemKind::CocaCola, &payment).unwrap();
        assert_eq!(
            engine.available_items(),
            BTreeSet::from([ItemKind::CocaCola, ItemKind::Crisps])
        );

        engine.buy(ItemKind::CocaCola, &payment).unwrap();
        assert_eq!(engine.available_items(), BTreeSet::from([ItemKind::Crisps]));
    }

    #[test]
    fn deposit_is_cleared_after_sale() {
        let mut engine = Engine::with_stock(Items::from([(ItemKind::Crisps, 2)]), Coins::new());
        engine
            .buy(ItemKind::Crisps, &coins(&[(Denomination::FiftyCents, 1)]))
            .unwrap();

        // a fresh purchase starts from zero
        let result = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::TenCents, 1)]));
        assert!(matches!(
            result,
            Err(VendError::InsufficientFunds { deficit, .. }) if deficit == Cents::new(40)
        ));
    }

    // Top-up

    #[test]
    fn top_up_completes_purchase() {
        let mut engine = crisps_only();
        let _ = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::TenCents, 2)]));

        let change = engine.top_up(&coins(&[(Denomination::TenCents, 4)])).unwrap();
        assert_eq!(change, coins(&[(Denomination::TenCents, 1)]));
        assert_eq!(engine.stock_count(ItemKind::Crisps), 0);
        assert_eq!(engine.total_change_value(), Cents::new(50));
        assert!(engine.pending().is_none());
    }

    #[test]
    fn top_up_with_exact_amount_returns_no_change() {
        let mut engine = cola_and_crisps();
        let _ = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::TenCents, 1)]));

        let change = engine.top_up(&coins(&[(Denomination::TenCents, 4)])).unwrap();
        assert!(change.is_empty());
    }

    #[test]
    fn top_up_without_pending_purchase_fails() {
        let mut engine = crisps_only();
        let result = engine.top_up(&coins(&[(Denomination::TenCents, 5)]));

        assert_eq!(result, Err(VendError::NoPendingPurchase));
        assert_eq!(engine.total_change_value(), Cents::ZERO);
        assert_eq!(engine.stock_count(ItemKind::Crisps), 1);
    }

    #[test]
    fn top_up_after_insufficient_change_and_reload() {
        let mut engine = crisps_only();
        let _ = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::OneDollar, 1)]));

        engine.load_change(&coins(&[(Denomination::FiftyCents, 1)]));
        let change = engine.top_up(&Coins::new()).unwrap();
        assert_eq!(change, coins(&[(Denomination::FiftyCents, 1)]));
        assert_eq!(engine.total_change_value(), Cents::new(100));
    }

    // Cancel

    #[test]
    fn cancel_returns_deposited_coins() {
        let mut engine = crisps_only();
        let _ = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::TenCents, 1)]));
        let _ = engine.top_up(&coins(&[(Denomination::FiveCents, 2)]));

        let returned = engine.cancel();
        assert_eq!(
            returned,
            coins(&[(Denomination::TenCents, 1), (Denomination::FiveCents, 2)])
        );
        assert_eq!(engine.total_change_value(), Cents::ZERO);
        assert!(engine.pending().is_none());
        assert_eq!(engine.stock_count(ItemKind::Crisps), 1);
    }

    #[test]
    fn cancel_after_insufficient_change_restores_vault() {
        let mut engine = crisps_only();
        let result = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::OneDollar, 1)]));
        assert!(matches!(result, Err(VendError::InsufficientChange(_))));

        assert_eq!(engine.cancel(), coins(&[(Denomination::OneDollar, 1)]));
        assert_eq!(engine.total_change_value(), Cents::ZERO);
    }

    #[test]
    fn cancel_when_idle_is_a_no_op() {
        let mut engine = Engine::with_stock(Items::new(), coins(&[(Denomination::OneCent, 7)]));
        assert!(engine.cancel().is_empty());
        assert_eq!(engine.vault().count(Denomination::OneCent), 7);
    }

    #[test]
    fn cancel_then_buy_after_loading_change() {
        let mut engine = cola_and_crisps();
        let dollar = coins(&[(Denomination::OneDollar, 1)]);
        let _ = engine.buy(ItemKind::Crisps, &dollar);
        engine.cancel();
        engine.load_change(&coins(&[(Denomination::FiftyCents, 1)]));

        let change = engine.buy(ItemKind::Crisps, &dollar).unwrap();
        assert_eq!(change, coins(&[(Denomination::FiftyCents, 1)]));
    }

    // Loading

    #[test]
    fn loading_past_u32_max_saturates() {
        let mut engine = Engine::new();
        engine.load_change(&coins(&[(Denomination::TenCents, u32::MAX)]));
        engine.load_change(&coins(&[(Denomination::TenCents, 1)]));
        assert_eq!(engine.vault().count(Denomination::TenCents), u32::MAX);

        engine.load_stock(&Items::from([(ItemKind::Crisps, u32::MAX)]));
        engine.load_stock(&Items::from([(ItemKind::Crisps, 1)]));
        assert_eq!(engine.stock_count(ItemKind::Crisps), u32::MAX);
    }

    #[test]
    fn loading_is_allowed_mid_purchase() {
        let mut engine = crisps_only();
        let _ = engine.buy(ItemKind::Crisps, &coins(&[(Denomination::TenCents, 2)]));

        engine.load_stock(&Items::from([(ItemKind::MarsBar, 3)]));
        engine.load_change(&coins(&[(Denomination::TwentyFiveCents, 2)]));

        assert_eq!(engine.stock_count(ItemKind::MarsBar), 3);
        assert_eq!(engine.total_change_value(), Cents::new(70));
        assert_eq!(engine.pending().unwrap().paid(), Cents::new(20));
    }

    // apply()

    #[test]
    fn apply_dispatches_commands() {
        let mut engine = crisps_only();

        assert_eq!(
            engine.apply(Command::Price(ItemKind::Crisps)),
            Ok(Outcome::Price(Cents::new(50)))
        );
        assert_eq!(
            engine.apply(Command::LoadStock {
                items: Items::from([(ItemKind::CocaCola, 1)])
            }),
            Ok(Outcome::Loaded)
        );
        assert_eq!(
            engine.apply(Command::ListItems),
            Ok(Outcome::Items(BTreeSet::from([
                ItemKind::CocaCola,
                ItemKind::Crisps
            ])))
        );
        assert_eq!(
            engine.apply(Command::Buy {
                item: ItemKind::Crisps,
                coins: coins(&[(Denomination::TwentyFiveCents, 1)]),
            }),
            Err(VendError::InsufficientFunds {
                item: ItemKind::Crisps,
                deficit: Cents::new(25)
            })
        );
        assert_eq!(
            engine.apply(Command::Cancel),
            Ok(Outcome::Returned(coins(&[(Denomination::TwentyFiveCents, 1)])))
        );
        assert_eq!(
            engine.apply(Command::ChangeTotal),
            Ok(Outcome::Total(Cents::ZERO))
        );
    }

    //  Async run()

    #[tokio::test]
    async fn run_applies_all_commands_in_order() {
        let mut engine = crisps_only();
        let commands = vec![
            Command::Buy {
                item: ItemKind::Crisps,
                coins: coins(&[(Denomination::TenCents, 2)]),
            },
            Command::TopUp {
                coins: coins(&[(Denomination::TenCents, 4)]),
            },
            Command::ChangeTotal,
        ];

        let receipts = engine.run(tokio_stream::iter(commands)).await;

        assert_eq!(receipts.len(), 3);
        assert_eq!(receipts[0].seq, 1);
        assert_eq!(receipts[0].op, "buy");
        assert!(receipts[0].result.is_err());
        assert_eq!(
            receipts[1].result,
            Ok(Outcome::Change(coins(&[(Denomination::TenCents, 1)])))
        );
        assert_eq!(receipts[2].result, Ok(Outcome::Total(Cents::new(50))));
    }

    #[tokio::test]
    async fn run_continues_after_rejections() {
        let mut engine = crisps_only();
        let commands = vec![
            Command::TopUp {
                coins: coins(&[(Denomination::TenCents, 1)]),
            },
            Command::Buy {
                item: ItemKind::MarsBar,
                coins: Coins::new(),
            },
            Command::Buy {
                item: ItemKind::Crisps,
                coins: coins(&[(Denomination::FiftyCents, 1)]),
            },
        ];

        let receipts = engine.run(tokio_stream::iter(commands)).await;

        assert_eq!(receipts[0].result, Err(VendError::NoPendingPurchase));
        assert_eq!(
            receipts[1].result,
            Err(VendError::ItemUnavailable(ItemKind::MarsBar))
        );
        assert_eq!(receipts[2].result, Ok(Outcome::Change(Coins::new())));
        assert_eq!(engine.total_change_value(), Cents::new(50));
    }
}
