use std::collections::BTreeSet;

use tracing::warn;

use crate::Cents;
use crate::model::{Coins, Denomination, ItemKind, Items, merge_counts, value_of};

/// Stock count per item kind. A missing kind has zero stock.
#[derive(Debug, Default, Clone)]
pub struct InventoryLedger {
    stock: Items,
}

impl InventoryLedger {
    pub fn new(stock: Items) -> Self {
        Self { stock }
    }

    /// Item kinds with at least one unit in stock.
    pub fn available(&self) -> BTreeSet<ItemKind> {
        self.stock
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn stock_count(&self, kind: ItemKind) -> u32 {
        self.stock.get(&kind).copied().unwrap_or(0)
    }

    pub fn add_stock(&mut self, delta: &Items) {
        merge_counts(&mut self.stock, delta);
    }

    /// Release one unit. The caller checks availability first.
    pub fn dispense(&mut self, kind: ItemKind) {
        let count = self.stock.entry(kind).or_default();
        debug_assert!(*count > 0, "dispensing {kind} with no stock");
        *count = count.saturating_sub(1);
    }
}

/// Coin pool used both as the deposit sink and the change source.
#[derive(Debug, Default, Clone)]
pub struct ChangeVault {
    coins: Coins,
}

impl ChangeVault {
    pub fn new(coins: Coins) -> Self {
        Self { coins }
    }

    pub fn count(&self, denomination: Denomination) -> u32 {
        self.coins.get(&denomination).copied().unwrap_or(0)
    }

    pub fn total_value(&self) -> Cents {
        value_of(&self.coins)
    }

    pub fn deposit(&mut self, coins: &Coins) {
        merge_counts(&mut self.coins, coins);
    }

    /// Take out one coin. The caller checks the count first.
    pub fn withdraw(&mut self, denomination: Denomination) {
        let count = self.coins.entry(denomination).or_default();
        debug_assert!(*count > 0, "withdrawing {denomination} from an empty slot");
        *count = count.saturating_sub(1);
    }

    /// Take out coins that were previously deposited.
    pub fn withdraw_bulk(&mut self, coins: &Coins) {
        for (denomination, amount) in coins {
            let count = self.coins.entry(*denomination).or_default();
            if *count < *amount {
                warn!(
                    denomination = %denomination,
                    held = *count,
                    requested = *amount,
                    "withdrawing more coins than the vault holds"
                );
            }
            *count = count.saturating_sub(*amount);
        }
    }
}

/// The purchase in progress: the selected item and what has been paid so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPurchase {
    pub item: ItemKind,
    pub deposited: Coins,
}

impl PendingPurchase {
    pub fn new(item: ItemKind) -> Self {
        Self {
            item,
            deposited: Coins::new(),
        }
    }

    pub fn add_coins(&mut self, coins: &Coins) {
        merge_counts(&mut self.deposited, coins);
    }

    pub fn paid(&self) -> Cents {
        value_of(&self.deposited)
    }
}
