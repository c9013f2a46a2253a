//! Transactions read from one CSV file, ready to be written as OFX.

use rust_decimal::Decimal;

use crate::conf::AccountType;
use crate::tz::ZonedDateTime;

pub mod reader;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    /// Zero-based index of the source row among the data rows.
    pub fitid: usize,
    pub posted: ZonedDateTime,
    pub description: String,
    /// Positive values increase assets, negative ones increase debt.
    pub amount: Decimal,
    pub memo: String,
}

#[derive(Clone, Debug)]
pub struct Journal {
    pub account_type: AccountType,
    pub cardnumber: String,
    pub cardname: String,
    /// When the conversion ran.
    pub generated: ZonedDateTime,
    /// Ordered by `fitid`.
    pub transactions: Vec<Transaction>,
}

impl Journal {
    /// Earliest and latest posting times, if there are any transactions.
    pub fn date_range(&self) -> Option<(&ZonedDateTime, &ZonedDateTime)> {
        let first = self.transactions.iter().map(|t| &t.posted).min()?;
        let last = self.transactions.iter().map(|t| &t.posted).max()?;
        Some((first, last))
    }

    pub fn total(&self) -> Decimal {
        self.transactions.iter().map(|t| t.amount).sum()
    }
}
