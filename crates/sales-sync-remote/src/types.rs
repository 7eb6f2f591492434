use serde::{Deserialize, Deserializer};

/// The remote hands back some numeric cursors as JSON integers and others
/// as numeric strings, depending on magnitude. Accept either and coerce to
/// `i64` so callers never have to care which one showed up.
pub(crate) fn flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flexible {
        Int(i64),
        Str(String),
    }

    match Flexible::deserialize(deserializer)? {
        Flexible::Int(n) => Ok(n),
        Flexible::Str(s) => s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("not an integer: {s}"))),
    }
}

/// Raw response from the partner API's changed-dates endpoint: every date
/// for which sales data has been added or revised since the credential's
/// highwatermark, plus the cursor to store once they've all been ingested.
#[derive(Debug, Deserialize)]
pub struct ChangedDatesResponse {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default, deserialize_with = "flexible_i64")]
    pub result_highwatermark: i64,
}

/// One page of the detailed-sales endpoint for a single date. Reference
/// entities observed on this page ride along as separate arrays rather
/// than being repeated on every line item.
#[derive(Debug, Deserialize)]
pub struct DetailedSalesResponse {
    #[serde(default)]
    pub results: Vec<RawSalesLine>,
    /// Cursor for the next page, sent back as a numeric string. Pagination
    /// stops when `max_id` has not advanced past the cursor used for this
    /// request, or `results` is empty — either alone is not sufficient.
    #[serde(default, deserialize_with = "flexible_i64")]
    pub max_id: i64,
    #[serde(default)]
    pub app_info: Vec<RawLookup>,
    #[serde(default)]
    pub package_info: Vec<RawLookup>,
    #[serde(default)]
    pub bundle_info: Vec<RawLookup>,
    #[serde(default)]
    pub partner_info: Vec<RawLookup>,
    #[serde(default)]
    pub country_info: Vec<RawLookup>,
    #[serde(default)]
    pub game_item_info: Vec<RawLookup>,
    #[serde(default)]
    pub combined_discount_info: Vec<RawDiscount>,
}

/// Generic `{id, name}` reference entity shape shared by apps, packages,
/// bundles, partners, countries, and game items. Countries use their ISO
/// code as `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawLookup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDiscount {
    pub id: String,
    pub description: String,
    pub percentage: Option<i16>,
}

/// A single line item as the partner API shapes it: prices and revenue as
/// decimal strings, never floats, with absent values distinguished from
/// `"0.00"`.
#[derive(Debug, Deserialize)]
pub struct RawSalesLine {
    pub line_item_type: String,
    pub app_id: i64,
    pub package_id: Option<i64>,
    pub bundle_id: Option<i64>,
    pub partner_id: Option<i64>,
    pub game_item_id: Option<i64>,
    pub country_code: String,
    pub platform: String,
    pub currency: String,
    pub discount_id: Option<i64>,
    pub discount_percentage: Option<i16>,
    pub base_price: Option<String>,
    pub sale_price: Option<String>,
    pub avg_sale_price_usd: Option<String>,
    pub gross_units_sold: Option<i64>,
    pub gross_units_returned: Option<i64>,
    pub gross_units_activated: Option<i64>,
    pub net_units_sold: Option<i64>,
    pub gross_sales_usd: Option<String>,
    pub gross_returns_usd: Option<String>,
    pub net_sales_usd: Option<String>,
    pub net_tax_usd: Option<String>,
}
