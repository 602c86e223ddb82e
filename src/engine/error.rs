//! Error types for vending operations.

use thiserror::Error;

use crate::Cents;
use crate::model::ItemKind;

/// Top-level error returned by the [`Engine`](super::Engine) operations.
///
/// Every variant is a recoverable business condition; the engine state stays
/// consistent and the customer can top up, cancel or try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VendError {
    #[error("{0} is not available")]
    ItemUnavailable(ItemKind),

    #[error("please insert {} more cents for {item} or cancel transaction", .deficit.get())]
    InsufficientFunds { item: ItemKind, deficit: Cents },

    #[error("{0}")]
    InsufficientChange(#[from] InsufficientChange),

    #[error("no pending purchase to add coins to")]
    NoPendingPurchase,
}

/// The vault cannot cover the change owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("not enough change available to pay back {} cents", .owed.get())]
pub struct InsufficientChange {
    pub owed: Cents,
}
