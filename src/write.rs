use crate::data::{Error, PurchaseOrder};
use tracing::info;

const TRNS_HEADER: [&str; 14] = [
    "!TRNS",
    "TRNSID",
    "TRNSTYPE",
    "DATE",
    "ACCNT",
    "NAME",
    "CLASS",
    "AMOUNT",
    "DOCNUM",
    "MEMO",
    "CLEAR",
    "TOPRINT",
    "NAMEISTAXABLE",
    "ADDR1",
];
const SPL_HEADER: [&str; 14] = [
    "!SPL", "SPLID", "TRNSTYPE", "DATE", "ACCNT", "NAME", "CLASS", "AMOUNT", "DOCNUM", "MEMO",
    "CLEAR", "QNTY", "PRICE", "INVITEM",
];
const ENDTRNS_HEADER: [&str; 14] = ["!ENDTRNS", "", "", "", "", "", "", "", "", "", "", "", "", ""];
const ENDTRNS: [&str; 14] = ["ENDTRNS", "", "", "", "", "", "", "", "", "", "", "", "", ""];

const PURCHASE_ORDER: &str = "PURCHORD";
const ORDER_ACCOUNT: &str = "Purchase Orders";
const ITEM_ACCOUNT: &str = "Inventory Asset";

/// IIF exporter for purchase orders: the fixed `!TRNS`/`!SPL`/`!ENDTRNS` header
/// block, then a TRNS, its SPLs and an ENDTRNS per order.
///
/// This is tab-separated rather than real CSV: fields are never quoted, which
/// is fine since every text field went through `read::sanitize` already.
pub(crate) fn write_iif<W: std::io::Write>(
    writer: W,
    orders: &[PurchaseOrder],
) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(TRNS_HEADER)?;
    wtr.write_record(SPL_HEADER)?;
    wtr.write_record(ENDTRNS_HEADER)?;

    let mut lines = 0;
    for order in orders {
        write_order(&mut wtr, order)?;
        lines += order.lines().len();
    }
    wtr.flush()?;
    info!(orders = orders.len(), lines, "wrote IIF output");
    Ok(())
}

fn write_order<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    order: &PurchaseOrder,
) -> Result<(), Error> {
    let key = &order.key;
    let amount = format!("-{:.2}", order.total());
    wtr.write_record([
        "TRNS",
        "",
        PURCHASE_ORDER,
        key.date.as_str(),
        ORDER_ACCOUNT,
        key.vendor.as_str(),
        "",
        amount.as_str(),
        key.ref_number.as_str(),
        "",
        "N",
        "Y",
        "N",
        "",
    ])?;

    for line in order.lines() {
        let amount = format!("{:.2}", line.amount);
        let quantity = line.quantity.to_string();
        let price = format!("{:.2}", line.unit_cost);
        wtr.write_record([
            "SPL",
            "",
            PURCHASE_ORDER,
            key.date.as_str(),
            ITEM_ACCOUNT,
            "",
            "",
            amount.as_str(),
            "",
            line.memo(),
            "N",
            quantity.as_str(),
            price.as_str(),
            line.item.as_str(),
        ])?;
    }

    wtr.write_record(ENDTRNS)?;
    Ok(())
}
