use crate::{
    data::{Error, GroupKey, LineItem, PurchaseOrder, Row, MONEY_DIGITS},
    date::DateNormalizer,
    read::{date_field, text_field, RowUser},
};
use rust_decimal::{Decimal, RoundingStrategy};
use std::{collections::HashMap, str::FromStr};
use tracing::debug;

/// This is where purchase orders are stored; they are created on the fly while
/// reading rows, and `orders` keeps them in the order their key first showed up.
/// `index` only maps a key to its slot in `orders`.
#[derive(Debug, Default)]
pub(crate) struct PurchaseOrders {
    orders: Vec<PurchaseOrder>,
    index: HashMap<GroupKey, usize>,
    dates: DateNormalizer,
    dropped: usize,
}

impl PurchaseOrders {
    pub fn new(dates: DateNormalizer) -> Self {
        Self {
            dates,
            ..Self::default()
        }
    }

    pub fn orders(&self) -> &[PurchaseOrder] {
        &self.orders
    }

    /// How many rows were skipped for lack of a vendor or reference number.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// Rows without a vendor or a reference number can't belong to any order, so
/// they're skipped quietly; everything else in a row is defaulted rather than
/// rejected. Only amounts too large for a `Decimal` abort the conversion.
impl RowUser for PurchaseOrders {
    fn use_row(&mut self, row: Row) -> Result<(), Error> {
        let vendor = text_field(&row, "Vendor");
        let ref_number = text_field(&row, "RefNumber");
        if vendor.is_empty() || ref_number.is_empty() {
            debug!(?row, "skipping row without vendor or reference number");
            self.dropped += 1;
            return Ok(());
        }
        let key = GroupKey {
            vendor,
            ref_number,
            date: self.dates.normalize(date_field(&row)),
        };
        let line = LineItem::from_row(&row)?;

        let orders = &mut self.orders;
        let slot = *self.index.entry(key).or_insert_with_key(|key| {
            orders.push(PurchaseOrder::new(key.clone()));
            orders.len() - 1
        });
        self.orders[slot].push(line)
    }
}

impl LineItem {
    /// The unit cost is rounded to cents *before* being multiplied, and the
    /// product is rounded again; amounts must match previously produced IIF
    /// files to the penny.
    pub fn from_row(row: &Row) -> Result<Self, Error> {
        let quantity = decimal_or_zero(row.get("Qty"));
        let unit_cost = round_money(decimal_or_zero(row.get("Cost")));
        let amount = quantity
            .checked_mul(unit_cost)
            .map(round_money)
            .ok_or(Error::LineOverflow {
                quantity,
                unit_cost,
            })?;
        Ok(Self {
            item: text_field(row, "Item"),
            description: text_field(row, "Description"),
            quantity,
            unit_cost,
            amount,
        })
    }
}

/// Lenient number parsing: blank or unreadable input is zero, never an error.
pub(crate) fn decimal_or_zero(raw: &str) -> Decimal {
    let raw = raw.trim();
    if raw.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .unwrap_or_else(|_| {
            debug!(raw, "unreadable number, using zero");
            Decimal::ZERO
        })
}

/// Half-up (away from zero) rounding to cents.
pub(crate) fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_DIGITS, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use crate::{
        compute::{decimal_or_zero, round_money, PurchaseOrders},
        data::{Error, LineItem, Row},
        date::DateNormalizer,
        read::RowUser,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn orders_from(rows: Vec<Row>) -> PurchaseOrders {
        let today = NaiveDate::from_ymd_opt(2020, 7, 4).unwrap();
        let mut orders = PurchaseOrders::new(DateNormalizer::with_today(today));
        for row in rows {
            orders.use_row(row).unwrap();
        }
        orders
    }

    fn po_row(vendor: &str, ref_number: &str, date: &str, qty: &str, cost: &str) -> Row {
        Row::from_iter([
            ("Vendor", vendor),
            ("RefNumber", ref_number),
            ("Date", date),
            ("Item", "W-1"),
            ("Qty", qty),
            ("Cost", cost),
        ])
    }

    #[test]
    fn test_line_rounds_cost_before_multiplying() {
        let row = Row::from_iter([("Qty", "3"), ("Cost", "2.005")]);
        let line = LineItem::from_row(&row).unwrap();
        assert_eq!(line.unit_cost, dec!(2.01));
        assert_eq!(line.amount, dec!(6.03));
        assert_eq!(line.quantity.to_string(), "3");
    }

    #[test]
    fn test_line_fractional_quantity() {
        let row = Row::from_iter([("Qty", "2.50"), ("Cost", "1.333")]);
        let line = LineItem::from_row(&row).unwrap();
        assert_eq!(line.unit_cost, dec!(1.33));
        assert_eq!(line.amount, dec!(3.33));
        assert_eq!(line.quantity.to_string(), "2.50");
    }

    #[test]
    fn test_line_defaults() {
        let row = Row::from_iter([("Qty", " "), ("Cost", "n/a")]);
        let line = LineItem::from_row(&row).unwrap();
        assert_eq!(line.quantity, dec!(0));
        assert_eq!(line.unit_cost, dec!(0));
        assert_eq!(line.amount, dec!(0));
        assert_eq!(line.item, "");
        assert_eq!(line.description, "");
    }

    #[test]
    fn test_line_memo() {
        let row = Row::from_iter([("Item", "W-1"), ("Description", " Widget ")]);
        assert_eq!(LineItem::from_row(&row).unwrap().memo(), "Widget");
        let row = Row::from_iter([("Item", "W-1"), ("Description", "")]);
        assert_eq!(LineItem::from_row(&row).unwrap().memo(), "W-1");
    }

    #[test]
    fn test_decimal_or_zero() {
        assert_eq!(decimal_or_zero("12.5"), dec!(12.5));
        assert_eq!(decimal_or_zero(" -4 "), dec!(-4));
        assert_eq!(decimal_or_zero("1e2"), dec!(100));
        assert_eq!(decimal_or_zero(""), dec!(0));
        assert_eq!(decimal_or_zero("1,200.00"), dec!(0));
        assert_eq!(decimal_or_zero("$5"), dec!(0));
    }

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(2.005)), dec!(2.01));
        assert_eq!(round_money(dec!(2.004)), dec!(2.00));
        assert_eq!(round_money(dec!(-2.005)), dec!(-2.01));
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
    }

    #[test]
    fn test_grouping() {
        let orders = orders_from(vec![
            po_row("Acme", "PO-100", "01/02/2024", "1", "5"),
            po_row("Acme", "PO-100", "01/02/2024", "2", "1.25"),
            po_row("Acme", "PO-101", "01/02/2024", "1", "9.99"),
        ]);
        let orders = orders.orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].key.ref_number, "PO-100");
        assert_eq!(orders[0].lines().len(), 2);
        assert_eq!(orders[0].total(), dec!(7.50));
        assert_eq!(orders[1].key.ref_number, "PO-101");
        assert_eq!(orders[1].lines().len(), 1);
        assert_eq!(orders[1].total(), dec!(9.99));
    }

    #[test]
    fn test_grouping_by_normalized_date() {
        let orders = orders_from(vec![
            po_row("Acme", "PO-1", "2024-01-02", "1", "1"),
            po_row("Acme", "PO-1", "1/2/2024", "1", "1"),
            po_row("Acme", "PO-1", "01/03/2024", "1", "1"),
        ]);
        let orders = orders.orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].key.date, "01/02/2024");
        assert_eq!(orders[0].lines().len(), 2);
        assert_eq!(orders[1].key.date, "01/03/2024");
    }

    #[test]
    fn test_first_seen_order() {
        let orders = orders_from(vec![
            po_row("Zeta", "9", "01/02/2024", "1", "1"),
            po_row("Acme", "1", "01/02/2024", "1", "1"),
            po_row("Zeta", "9", "01/02/2024", "1", "1"),
            po_row("Midway", "5", "01/02/2024", "1", "1"),
        ]);
        let vendors: Vec<_> = orders
            .orders()
            .iter()
            .map(|order| order.key.vendor.as_str())
            .collect();
        assert_eq!(vendors, ["Zeta", "Acme", "Midway"]);
    }

    #[test]
    fn test_rows_without_vendor_or_reference_are_dropped() {
        let orders = orders_from(vec![
            po_row("", "PO-1", "01/02/2024", "1", "1"),
            po_row("Acme", "  ", "01/02/2024", "1", "1"),
            po_row("\t", "PO-2", "01/02/2024", "1", "1"),
            Row::from_iter([("Vendor", "Acme")]),
            po_row("Acme", "PO-3", "01/02/2024", "1", "1"),
        ]);
        assert_eq!(orders.dropped(), 4);
        assert_eq!(orders.orders().len(), 1);
        assert_eq!(orders.orders()[0].key.ref_number, "PO-3");
    }

    #[test]
    fn test_line_amount_overflow() {
        let row = Row::from_iter([("Qty", "1e16"), ("Cost", "1e13")]);
        assert!(matches!(
            LineItem::from_row(&row),
            Err(Error::LineOverflow { .. })
        ));
    }

    #[test]
    fn test_order_total_overflow() {
        let today = NaiveDate::from_ymd_opt(2020, 7, 4).unwrap();
        let mut orders = PurchaseOrders::new(DateNormalizer::with_today(today));
        let huge = "50000000000000000000000000000";
        orders.use_row(po_row("A", "1", "01/02/2024", huge, "1")).unwrap();
        assert!(matches!(
            orders.use_row(po_row("A", "1", "01/02/2024", huge, "1")),
            Err(Error::TotalOverflow { .. })
        ));
        assert_eq!(orders.orders()[0].lines().len(), 1);
        // a different order starts from zero again
        orders.use_row(po_row("A", "2", "01/02/2024", huge, "1")).unwrap();
    }

    #[test]
    fn test_missing_date_uses_today() {
        let orders = orders_from(vec![po_row("Acme", "PO-1", "", "1", "1")]);
        assert_eq!(orders.orders()[0].key.date, "07/04/2020");
        // a blank first date column hides the later ones
        let row = Row::from_iter([
            ("Vendor", "Acme"),
            ("RefNumber", "PO-2"),
            ("Date", "  "),
            ("PO Date", "01/02/2024"),
        ]);
        let orders = orders_from(vec![row]);
        assert_eq!(orders.orders()[0].key.date, "07/04/2020");
    }

    #[test]
    fn test_key_fields_are_sanitized() {
        let orders = orders_from(vec![
            po_row("Acme\tCorp", "PO\n1", "01/02/2024", "1", "1"),
            po_row(" Acme Corp ", "PO 1", "01/02/2024", "1", "1"),
        ]);
        assert_eq!(orders.orders().len(), 1);
        assert_eq!(orders.orders()[0].key.vendor, "Acme Corp");
        assert_eq!(orders.orders()[0].key.ref_number, "PO 1");
    }

    #[test]
    fn test_total_is_exact_sum_of_lines() {
        let orders = orders_from(vec![
            po_row("Acme", "PO-1", "01/02/2024", "3", "0.333"),
            po_row("Acme", "PO-1", "01/02/2024", "7", "0.105"),
            po_row("Acme", "PO-1", "01/02/2024", "0.5", "0.01"),
        ]);
        let order = &orders.orders()[0];
        let sum: rust_decimal::Decimal = order.lines().iter().map(|line| line.amount).sum();
        assert_eq!(order.total(), sum);
        // 3 * 0.33 + 7 * 0.11 + 0.5 * 0.01 -> 0.99 + 0.77 + 0.01
        assert_eq!(order.total(), dec!(1.77));
    }
}
