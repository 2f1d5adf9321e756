//! Response list model - native result container and its ownership rules
//!
//! Architecture:
//! - `ident.rs` - bounded station/channel/network/location identifiers
//! - `record.rs` - `ComplexValue`, `ResponseRecord`, `ResponseList`
//! - `raw.rs` - C-compatible linked layout with exactly-once release

mod ident;
mod raw;
mod record;

pub use ident::{
    truncate_ident, ChannelId, CHANNEL_LEN, LOCATION_LEN, NETWORK_LEN, STATION_LEN,
};
pub use raw::{free_raw, is_live, RawComplex, RawResponse};
pub use record::{ComplexValue, ResponseList, ResponseRecord, ShapeError};

#[cfg(test)]
mod tests;
