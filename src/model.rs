//! Core domain types for the vending engine.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::Cents;

/// A concrete set of coins: how many of each denomination.
pub type Coins = BTreeMap<Denomination, u32>;

/// Stock delta per item kind.
pub type Items = BTreeMap<ItemKind, u32>;

/// Total value of a set of coins.
pub fn value_of(coins: &Coins) -> Cents {
    coins
        .iter()
        .map(|(denomination, count)| denomination.value() * *count)
        .sum()
}

/// Add every count of `more` into `into`, saturating at `u32::MAX`.
pub(crate) fn merge_counts<K: Ord + Copy>(into: &mut BTreeMap<K, u32>, more: &BTreeMap<K, u32>) {
    for (key, count) in more {
        let slot = into.entry(*key).or_default();
        *slot = slot.saturating_add(*count);
    }
}

/// Failure to parse an item or coin identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("unknown denomination '{0}'")]
    UnknownDenomination(String),
}

/// Items sold by the machine. The catalog is fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemKind {
    Crisps,
    CocaCola,
    MarsBar,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Crisps, ItemKind::CocaCola, ItemKind::MarsBar];

    /// Catalog price.
    pub const fn price(self) -> Cents {
        match self {
            ItemKind::Crisps => Cents::new(50),
            ItemKind::CocaCola => Cents::new(150),
            ItemKind::MarsBar => Cents::new(75),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ItemKind::Crisps => "CRISPS",
            ItemKind::CocaCola => "COCA_COLA",
            ItemKind::MarsBar => "MARS_BAR",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseError::UnknownItem(s.to_string()))
    }
}

/// Coin denominations accepted for payment and paid out as change.
///
/// Variants are declared in ascending face value, so the derived `Ord`
/// is the canonical value ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Denomination {
    OneCent,
    FiveCents,
    TenCents,
    TwentyFiveCents,
    FiftyCents,
    OneDollar,
}

impl Denomination {
    /// All denominations, ascending by face value.
    pub const ALL: [Denomination; 6] = [
        Denomination::OneCent,
        Denomination::FiveCents,
        Denomination::TenCents,
        Denomination::TwentyFiveCents,
        Denomination::FiftyCents,
        Denomination::OneDollar,
    ];

    /// Face value.
    pub const fn value(self) -> Cents {
        match self {
            Denomination::OneCent => Cents::new(1),
            Denomination::FiveCents => Cents::new(5),
            Denomination::TenCents => Cents::new(10),
            Denomination::TwentyFiveCents => Cents::new(25),
            Denomination::FiftyCents => Cents::new(50),
            Denomination::OneDollar => Cents::new(100),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Denomination::OneCent => "ONE_CENT",
            Denomination::FiveCents => "FIVE_CENTS",
            Denomination::TenCents => "TEN_CENTS",
            Denomination::TwentyFiveCents => "TWENTY_FIVE_CENTS",
            Denomination::FiftyCents => "FIFTY_CENTS",
            Denomination::OneDollar => "ONE_DOLLAR",
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Denomination {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Denomination::ALL
            .into_iter()
            .find(|denomination| denomination.as_str() == s)
            .ok_or_else(|| ParseError::UnknownDenomination(s.to_string()))
    }
}

/// A request to the engine, one per operation the machine exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List items currently in stock.
    ListItems,
    /// Look up the price of an item.
    Price(ItemKind),
    /// Select an item and pay for it.
    Buy { item: ItemKind, coins: Coins },
    /// Add coins to the pending purchase.
    TopUp { coins: Coins },
    /// Abandon the pending purchase and get the deposit back.
    Cancel,
    /// Refill the change vault.
    LoadChange { coins: Coins },
    /// Total value held by the change vault.
    ChangeTotal,
    /// Refill item stock.
    LoadStock { items: Items },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::ListItems => "items",
            Command::Price(_) => "price",
            Command::Buy { .. } => "buy",
            Command::TopUp { .. } => "topup",
            Command::Cancel => "cancel",
            Command::LoadChange { .. } => "load_change",
            Command::ChangeTotal => "change",
            Command::LoadStock { .. } => "load_stock",
        }
    }
}
