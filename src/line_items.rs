//! Wire codec for an order's cart snapshot.
//!
//! The external shape is a JSON mapping from an opaque line-item code to a
//! positional 6-tuple `[quantity, product_name, unit_price, color, size,
//! image_url]`. The code embeds a recoverable product id (`id<N>_...`),
//! which the trending computation depends on. Internally every entry is a
//! typed [`LineItem`]; the tuple shape only exists at the serde boundary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound on the serialized snapshot stored per order.
pub const ITEMS_JSON_MAX_LEN: usize = 5000;

/// Rendered in place of the item list when the stored snapshot is unreadable.
pub const INVALID_ITEMS_PLACEHOLDER: &str = "Invalid items format";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireItem", into = "WireItem")]
pub struct LineItem {
    pub quantity: i64,
    pub name: String,
    /// Price snapshot as submitted, e.g. "20.00".
    pub unit_price: String,
    pub color: String,
    pub size: String,
    pub image_url: String,
}

/// The positional tuple as it appears on the wire. Wrong arity fails
/// deserialization, which is how malformed entries are detected.
#[derive(Serialize, Deserialize)]
struct WireItem(i64, String, String, String, String, String);

impl From<WireItem> for LineItem {
    fn from(w: WireItem) -> Self {
        LineItem {
            quantity: w.0,
            name: w.1,
            unit_price: w.2,
            color: w.3,
            size: w.4,
            image_url: w.5,
        }
    }
}

impl From<LineItem> for WireItem {
    fn from(item: LineItem) -> Self {
        WireItem(
            item.quantity,
            item.name,
            item.unit_price,
            item.color,
            item.size,
            item.image_url,
        )
    }
}

/// BTreeMap so iteration order is deterministic.
pub type ItemsMap = BTreeMap<String, LineItem>;

#[derive(Debug, Error)]
pub enum ItemsError {
    #[error("items payload exceeds {ITEMS_JSON_MAX_LEN} characters")]
    TooLong,

    #[error("items payload is not a valid line-item mapping: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("items payload is empty")]
    Empty,
}

pub fn parse_items(items_json: &str) -> Result<ItemsMap, ItemsError> {
    if items_json.chars().count() > ITEMS_JSON_MAX_LEN {
        return Err(ItemsError::TooLong);
    }
    let items: ItemsMap = serde_json::from_str(items_json)?;
    if items.is_empty() {
        return Err(ItemsError::Empty);
    }
    Ok(items)
}

/// Canonical serialization for storage, bounded like the column it lands in.
pub fn to_items_json(items: &ItemsMap) -> Result<String, ItemsError> {
    if items.is_empty() {
        return Err(ItemsError::Empty);
    }
    let json = serde_json::to_string(items)?;
    if json.chars().count() > ITEMS_JSON_MAX_LEN {
        return Err(ItemsError::TooLong);
    }
    Ok(json)
}

/// Recover the product id embedded in a line-item code (`id<N>` up to the
/// first underscore). Codes that do not follow the contract yield `None`
/// and are skipped by callers.
pub fn product_id_from_code(code: &str) -> Option<i64> {
    let head = code.split('_').next().unwrap_or(code);
    let digits = head.strip_prefix("id")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok()
}

/// Parse a decimal money string ("20", "20.5", "20.00") into minor units.
/// No floats: splits on the decimal point and scales by hand.
pub fn parse_cents(s: &str) -> Option<i64> {
    let s = s.trim();
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let whole: i64 = whole.parse().ok()?;
    let frac: i64 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<2}").parse().ok()?
    };
    whole.checked_mul(100)?.checked_add(frac)
}

pub fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

/// Total of all entries in minor units. `None` when any quantity is
/// non-positive or any unit price fails to parse, so callers can reject
/// the whole snapshot rather than charge a partial total.
pub fn items_total_cents(items: &ItemsMap) -> Option<i64> {
    let mut total: i64 = 0;
    for item in items.values() {
        if item.quantity <= 0 {
            return None;
        }
        let unit = parse_cents(&item.unit_price)?;
        total = total.checked_add(unit.checked_mul(item.quantity)?)?;
    }
    Some(total)
}

/// HTML fragment describing each line item, used by the notification
/// emails and the admin detail view. A snapshot that fails to parse
/// renders the placeholder instead of propagating an error.
pub fn render_items_html(items_json: &str) -> String {
    let items = match parse_items(items_json) {
        Ok(items) => items,
        Err(_) => return INVALID_ITEMS_PLACEHOLDER.to_string(),
    };

    let mut out = String::new();
    for item in items.values() {
        let name = escape_html(&item.name);
        out.push_str(&format!(
            "<div>\
             <strong>Product Name:</strong> {name}<br>\
             <strong>Quantity:</strong> {qty}<br>\
             <strong>Price:</strong> ${price}<br>\
             <strong>Color:</strong> {color}<br>\
             <strong>Size:</strong> {size}<br>\
             <img src=\"{url}\" alt=\"{name}\" style=\"width: 50px; height: 50px;\"/><br><br>\
             </div>",
            name = name,
            qty = item.quantity,
            price = escape_html(&item.unit_price),
            color = escape_html(&item.color),
            size = escape_html(&item.size),
            url = escape_html(&item.image_url),
        ));
    }
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
