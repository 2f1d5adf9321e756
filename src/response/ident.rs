//! Bounded channel identifiers
//!
//! Identifier buffers have a fixed capacity (including the terminating NUL
//! of the C layout). Longer source strings are truncated, never rejected.

use serde::Serialize;
use std::fmt;

pub const STATION_LEN: usize = 64;
pub const CHANNEL_LEN: usize = 64;
pub const NETWORK_LEN: usize = 64;
pub const LOCATION_LEN: usize = 64;

/// Truncate text to fit a buffer of `capacity` bytes including the NUL,
/// cutting on a character boundary.
pub fn truncate_ident(text: &str, capacity: usize) -> String {
    let max = capacity.saturating_sub(1);
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Station/channel/network/location selection of one response
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelId {
    station: String,
    channel: String,
    network: String,
    location: String,
}

impl ChannelId {
    pub fn new(station: &str, channel: &str, network: &str, location: &str) -> Self {
        Self {
            station: truncate_ident(station, STATION_LEN),
            channel: truncate_ident(channel, CHANNEL_LEN),
            network: truncate_ident(network, NETWORK_LEN),
            location: truncate_ident(location, LOCATION_LEN),
        }
    }

    pub fn station(&self) -> &str {
        &self.station
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sta={}, cha={}, net={}, loc={}",
            self.station, self.channel, self.network, self.location
        )
    }
}
