use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

/// Number of decimal places for every amount and price written to the IIF file.
pub const MONEY_DIGITS: u32 = 2;

/// One CSV record, keyed by column name. Columns we don't know about are kept
/// but never looked at; columns missing from a short record simply aren't there,
/// and `get` hands back an empty string for them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Row(HashMap<String, String>);

impl Row {
    pub fn get(&self, column: &str) -> &str {
        self.0.get(column).map(String::as_str).unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Row {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// What makes two rows land in the same purchase order. All three parts are
/// compared as plain strings, and the date is already normalized to `MM/DD/YYYY`
/// so `2024-01-02` and `1/2/2024` end up in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct GroupKey {
    pub vendor: String,
    pub ref_number: String,
    pub date: String,
}

/// A purchased item. `unit_cost` is already rounded to cents and `amount` is
/// computed from that rounded cost, see `LineItem::from_row`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct LineItem {
    pub item: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub amount: Decimal,
}

impl LineItem {
    /// The SPL memo: the description, or the item code when there's none.
    pub fn memo(&self) -> &str {
        if self.description.is_empty() {
            &self.item
        } else {
            &self.description
        }
    }
}

/// A purchase order being built up. Lines only get in through `push`, which
/// keeps `total` equal to the exact sum of the line amounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PurchaseOrder {
    pub key: GroupKey,
    lines: Vec<LineItem>,
    total: Decimal,
}

impl PurchaseOrder {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            lines: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Fails, leaving the order untouched, when the total no longer fits a `Decimal`.
    pub fn push(&mut self, line: LineItem) -> Result<(), Error> {
        self.total = self
            .total
            .checked_add(line.amount)
            .ok_or_else(|| Error::TotalOverflow {
                ref_number: self.key.ref_number.clone(),
            })?;
        self.lines.push(line);
        Ok(())
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn total(&self) -> Decimal {
        self.total
    }
}

/// Failures that abort a conversion. Unreadable values inside a row never show
/// up here, they are defaulted away while grouping; amounts too large to be
/// represented exactly do.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("line amount out of range ({quantity} x {unit_cost})")]
    LineOverflow { quantity: Decimal, unit_cost: Decimal },
    #[error("total of purchase order {ref_number} out of range")]
    TotalOverflow { ref_number: String },
}
