//! Amazon.co.jp order history, used to describe what a card charge paid for.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde_derive::Deserialize;
use unicode_width::UnicodeWidthChar;

use crate::text;

/// Description of card transactions that are looked up in the order history.
pub const AMAZON_DESCRIPTION: &str = "AMAZON.CO.JP";

/// Display columns an item name is shortened to.
const ITEM_NAME_WIDTH: usize = 40;

const CHARGE_ROW: &str = "（クレジットカードへの請求）";
const IGNORED_ROWS: &[&str] = &[
    "（注文全体）",
    "（割引）",
    "（配送料・手数料）",
    "（Amazonポイント）",
];

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "注文番号")]
    order_id: String,
    #[serde(rename = "注文日")]
    order_date: String,
    #[serde(rename = "商品名")]
    name: String,
    #[serde(rename = "商品小計")]
    subtotal: String,
    #[serde(rename = "クレカ請求日")]
    charge_date: String,
    #[serde(rename = "クレカ請求額")]
    charge_amount: String,
    #[serde(rename = "クレカ種類")]
    card_type: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
struct Charge {
    date: String,
    amount: String,
    card_type: String,
}

impl Charge {
    fn from_record(record: &Record) -> Self {
        Self {
            date: record.charge_date.clone(),
            amount: record.charge_amount.clone(),
            card_type: record.card_type.clone(),
        }
    }
}

/// Items bought together; the first is the main item, the rest add-ons.
type Batch = Vec<String>;

#[derive(Debug)]
struct Order {
    order_id: String,
    batches: Vec<Batch>,
    charges: Vec<Charge>,
}

impl Order {
    fn new(order_id: String) -> Self {
        Self {
            order_id,
            batches: Vec::new(),
            charges: Vec::new(),
        }
    }

    fn add_record(&mut self, mut record: Record) {
        if IGNORED_ROWS.contains(&record.name.as_str()) {
            return;
        }
        if record.name == CHARGE_ROW {
            // Charge records are sometimes duplicated.
            let charge = Charge::from_record(&record);
            self.charges.retain(|c| *c != charge);
            self.charges.push(charge);
            return;
        }
        if !record.charge_amount.is_empty() {
            // Digital items are charged on the order date.
            record.charge_date = record.order_date.clone();
            self.charges.push(Charge::from_record(&record));
            self.batches.push(vec![record.name]);
            return;
        }
        match self.batches.last_mut() {
            Some(batch) if record.subtotal.is_empty() => batch.push(record.name),
            _ => self.batches.push(vec![record.name]),
        }
    }

    fn summarize(batches: &[Batch]) -> String {
        batches
            .iter()
            .map(|batch| batch.iter().map(|name| omit(name, ITEM_NAME_WIDTH)).join(","))
            .join(";")
    }

    /// Summary of what `charge_idx` paid for.
    fn charge_summary(&self, charge_idx: usize) -> String {
        if self.charges.len() > 1 {
            if let Some(batch) = self.batches.get(charge_idx) {
                return Self::summarize(std::slice::from_ref(batch));
            }
        }
        Self::summarize(&self.batches)
    }
}

/// Orders keyed by order number, in file order.
#[derive(Debug, Default)]
pub struct AmazonJournal {
    orders: Vec<Order>,
}

impl AmazonJournal {
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("opening {:?} for reading", path))?;
        let text = crate::encoding::decode(&bytes, Some(encoding_rs::UTF_8))
            .with_context(|| format!("decoding {:?}", path))?;
        Self::from_reader(text.as_bytes()).with_context(|| format!("reading {:?}", path))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut journal = AmazonJournal::default();
        let mut index = HashMap::<String, usize>::new();
        for result in csv_rdr.deserialize() {
            let record: Record = result?;
            let idx = *index.entry(record.order_id.clone()).or_insert_with(|| {
                journal.orders.push(Order::new(record.order_id.clone()));
                journal.orders.len() - 1
            });
            journal.orders[idx].add_record(record);
        }
        Ok(journal)
    }

    /// Finds charges of exactly `amount` made from the day before `date` to
    /// two days after it. Returns `(order id, items summary)` pairs.
    pub fn search(&self, date: NaiveDate, amount: Decimal) -> Vec<(String, String)> {
        let first = date - Duration::days(1);
        let last = date + Duration::days(2);

        let mut result = Vec::new();
        for order in &self.orders {
            for (i, charge) in order.charges.iter().enumerate() {
                let charge_date = match text::parse_date(&charge.date) {
                    Some(d) => d,
                    None => continue,
                };
                let charge_amount = match text::parse_amount(&charge.amount) {
                    Ok(a) => a,
                    Err(_) => continue,
                };
                if first <= charge_date && charge_date <= last && charge_amount == amount {
                    result.push((order.order_id.clone(), order.charge_summary(i)));
                }
            }
        }
        result
    }
}

fn char_width(c: char) -> usize {
    c.width_cjk().unwrap_or(1).max(1)
}

/// Shortens `s` to `width` display columns by replacing its middle with
/// dots. Wide and ambiguous-width characters count as two columns.
pub fn omit(s: &str, width: usize) -> String {
    let chars: Vec<char> = text::normalize(s)
        .chars()
        .map(|c| if c == '\u{3000}' { ' ' } else { c })
        .collect();
    let widths: Vec<usize> = chars.iter().copied().map(char_width).collect();
    if widths.iter().sum::<usize>() <= width {
        return s.to_string();
    }

    let sum_tail = |n: usize| -> usize { widths[widths.len() - n..].iter().sum() };
    let sum_head = |n: usize| -> usize { widths[..n].iter().sum() };

    let tail_max = width.saturating_sub(2) / 2;
    let mut tail = 1;
    while tail < chars.len() && sum_tail(tail + 1) <= tail_max {
        tail += 1;
    }

    let head_max = width.saturating_sub(sum_tail(tail) + 2);
    let mut head = 1;
    while head + tail < chars.len() && sum_head(head + 1) <= head_max {
        head += 1;
    }

    let dots = width.saturating_sub(sum_head(head) + sum_tail(tail));
    let mut out: String = chars[..head].iter().collect();
    out.extend(std::iter::repeat('.').take(dots));
    out.extend(chars[chars.len() - tail..].iter());
    out
}
