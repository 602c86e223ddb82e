//! Change making over the coin vault.

use tracing::debug;

use super::error::InsufficientChange;
use super::state::ChangeVault;
use crate::Cents;
use crate::model::{Coins, Denomination};

/// Pay out `owed` from `vault`, largest denomination first.
///
/// Either the full amount is covered and the returned coins have been taken
/// out of the vault, or the call fails and the vault is left untouched.
pub fn make_change(owed: Cents, vault: &mut ChangeVault) -> Result<Coins, InsufficientChange> {
    let mut breakdown = Coins::new();
    let mut remaining = owed;

    while remaining > Cents::ZERO {
        let Some(coin) = largest_fitting(remaining, vault) else {
            // put back everything taken so far
            vault.deposit(&breakdown);
            debug!(owed = %owed, short = %remaining, "cannot make change");
            return Err(InsufficientChange { owed });
        };

        vault.withdraw(coin);
        *breakdown.entry(coin).or_default() += 1;
        remaining -= coin.value();
    }

    debug!(owed = %owed, coins = breakdown.values().sum::<u32>(), "change made");
    Ok(breakdown)
}

/// Largest denomination not worth more than `remaining` that the vault still holds.
fn largest_fitting(remaining: Cents, vault: &ChangeVault) -> Option<Denomination> {
    Denomination::ALL
        .into_iter()
        .rev()
        .find(|coin| coin.value() <= remaining && vault.count(*coin) > 0)
}
