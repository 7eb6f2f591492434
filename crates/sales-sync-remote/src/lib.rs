pub mod client;
pub mod error;
pub mod types;

pub use client::{parse_price_cents, parse_revenue_cents, RemoteClient};
pub use error::RemoteError;
pub use types::{
    ChangedDatesResponse, DetailedSalesResponse, RawDiscount, RawLookup, RawSalesLine,
};
