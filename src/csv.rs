use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::ParseError;
use crate::{Coins, Command, Denomination, ItemKind, Items, Outcome, Receipt};

/// Errors that can occur when reading a session or writing its receipts
#[derive(Debug, Error)]
pub enum CsvError {
    #[error("cannot open {}: {source}", .path.display())]
    Open { path: PathBuf, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized operation '{op}'")]
    UnrecognizedOp { line: usize, op: String },

    #[error("line {line}: {op} missing {field}")]
    MissingField {
        line: usize,
        op: String,
        field: &'static str,
    },

    #[error("line {line}: {source}")]
    Identifier { line: usize, source: ParseError },

    #[error("line {line}: malformed coins entry '{entry}', expected DENOMINATION=COUNT")]
    MalformedCoins { line: usize, entry: String },

    #[error("line {line}: too many {denomination} coins, at most {} allowed", u32::MAX)]
    CountOverflow {
        line: usize,
        denomination: Denomination,
    },

    #[error("failed to write receipt: {0}")]
    Write(#[from] csv::Error),

    #[error("failed to flush output: {0}")]
    Flush(#[from] io::Error),
}

#[derive(Debug, Deserialize)]
struct InputRow {
    op: String,
    item: Option<String>,
    quantity: Option<u32>,
    coins: Option<String>,
}

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    seq: usize,
    op: &'a str,
    status: &'a str,
    coins: String,
    detail: String,
}

/// Read session commands from a csv file
pub fn read_commands(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Command, CsvError>>, CsvError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| CsvError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| CsvError::Parse { line, source })?;
            parse_row(line, row)
        }))
}

/// Write one csv row per receipt
pub fn write_receipts<W: io::Write>(
    writer: W,
    receipts: impl IntoIterator<Item = Receipt>,
) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(writer);

    for receipt in receipts {
        let (status, coins, detail) = match &receipt.result {
            Ok(outcome) => {
                let (coins, detail) = describe(outcome);
                ("ok", coins, detail)
            }
            Err(e) => ("rejected", String::new(), e.to_string()),
        };
        writer.serialize(OutputRow {
            seq: receipt.seq,
            op: receipt.op,
            status,
            coins,
            detail,
        })?;
    }

    writer.flush()?;
    Ok(())
}

/// Format coins as `DENOMINATION=COUNT` pairs separated by `;`
pub fn format_coins(coins: &Coins) -> String {
    coins
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(denomination, count)| format!("{denomination}={count}"))
        .collect::<Vec<_>>()
        .join(";")
}

fn describe(outcome: &Outcome) -> (String, String) {
    match outcome {
        Outcome::Items(items) => {
            let names: Vec<_> = items.iter().map(|item| item.as_str()).collect();
            (String::new(), names.join(";"))
        }
        Outcome::Price(cents) | Outcome::Total(cents) => (String::new(), cents.get().to_string()),
        Outcome::Change(coins) | Outcome::Returned(coins) => (format_coins(coins), String::new()),
        Outcome::Loaded => (String::new(), String::new()),
    }
}

fn parse_row(line: usize, row: InputRow) -> Result<Command, CsvError> {
    let op = row.op.as_str();
    let item = || -> Result<ItemKind, CsvError> {
        row.item
            .as_deref()
            .ok_or_else(|| CsvError::MissingField {
                line,
                op: row.op.clone(),
                field: "item",
            })?
            .parse::<ItemKind>()
            .map_err(|source| CsvError::Identifier { line, source })
    };
    let coins = || parse_coins(line, row.coins.as_deref().unwrap_or_default());

    match op {
        "items" => Ok(Command::ListItems),
        "price" => Ok(Command::Price(item()?)),
        "buy" => Ok(Command::Buy {
            item: item()?,
            coins: coins()?,
        }),
        "topup" => Ok(Command::TopUp { coins: coins()? }),
        "cancel" => Ok(Command::Cancel),
        "load_change" => Ok(Command::LoadChange { coins: coins()? }),
        "change" => Ok(Command::ChangeTotal),
        "load_stock" => {
            let item = item()?;
            let quantity = row.quantity.ok_or_else(|| CsvError::MissingField {
                line,
                op: row.op.clone(),
                field: "quantity",
            })?;
            Ok(Command::LoadStock {
                items: Items::from([(item, quantity)]),
            })
        }
        other => Err(CsvError::UnrecognizedOp {
            line,
            op: other.to_string(),
        }),
    }
}

fn parse_coins(line: usize, raw: &str) -> Result<Coins, CsvError> {
    let mut coins = Coins::new();
    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let malformed = || CsvError::MalformedCoins {
            line,
            entry: entry.to_string(),
        };
        let (name, count) = entry.split_once('=').ok_or_else(malformed)?;
        let denomination = name
            .trim()
            .parse::<Denomination>()
            .map_err(|source| CsvError::Identifier { line, source })?;
        let count = count.trim().parse::<u32>().map_err(|_| malformed())?;
        let slot = coins.entry(denomination).or_default();
        *slot = slot
            .checked_add(count)
            .ok_or(CsvError::CountOverflow { line, denomination })?;
    }
    Ok(coins)
}
