//! Initial stocking of the machine.

use std::env;

use tracing::warn;

use crate::model::{Coins, Denomination, ItemKind, Items};

/// Environment variable overriding the starting stock of every item kind.
pub const STOCK_VAR: &str = "VEND_INITIAL_STOCK";
/// Environment variable overriding the starting count of every coin.
pub const COINS_VAR: &str = "VEND_INITIAL_COINS";

/// How many items and coins the machine starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    pub stock_per_item: u32,
    pub coins_per_denomination: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stock_per_item: 10,
            coins_per_denomination: 10,
        }
    }
}

impl MachineConfig {
    /// Defaults, overridden by [`STOCK_VAR`] and [`COINS_VAR`] when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            stock_per_item: parse_count(STOCK_VAR, lookup(STOCK_VAR), defaults.stock_per_item),
            coins_per_denomination: parse_count(
                COINS_VAR,
                lookup(COINS_VAR),
                defaults.coins_per_denomination,
            ),
        }
    }

    pub fn initial_items(&self) -> Items {
        ItemKind::ALL
            .into_iter()
            .map(|kind| (kind, self.stock_per_item))
            .collect()
    }

    pub fn initial_coins(&self) -> Coins {
        Denomination::ALL
            .into_iter()
            .map(|denomination| (denomination, self.coins_per_denomination))
            .collect()
    }
}

fn parse_count(key: &str, raw: Option<String>, default: u32) -> u32 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(count) => count,
        Err(e) => {
            warn!(key, value = %raw, error = %e, "ignoring invalid count, using {default}");
            default
        }
    }
}
