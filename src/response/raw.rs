//! C-compatible linked layout of a response list
//!
//! Matches the `struct response` / `struct complex` layout of `evresp.h`.
//! A list handed to C has exactly one owner; the head is registered on
//! creation and unregistered on free, so a second free of the same head is
//! refused instead of releasing memory twice.

use super::ident::{ChannelId, CHANNEL_LEN, LOCATION_LEN, NETWORK_LEN, STATION_LEN};
use super::record::{ComplexValue, ResponseList, ResponseRecord};
use crate::error::BridgeError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::os::raw::{c_char, c_int};
use std::ptr;
use tracing::{trace, warn};

/// Heads of lists currently owned by C callers
static LIVE_HEADS: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawComplex {
    pub real: f64,
    pub imag: f64,
}

#[repr(C)]
#[derive(Debug)]
pub struct RawResponse {
    pub station: [c_char; STATION_LEN],
    pub network: [c_char; NETWORK_LEN],
    pub locid: [c_char; LOCATION_LEN],
    pub channel: [c_char; CHANNEL_LEN],
    pub rvec: *mut RawComplex,
    pub nfreqs: c_int,
    pub freqs: *mut f64,
    pub next: *mut RawResponse,
}

fn write_ident<const N: usize>(text: &str) -> [c_char; N] {
    let mut buf = [0 as c_char; N];
    for (dst, &byte) in buf.iter_mut().zip(text.as_bytes().iter().take(N - 1)) {
        *dst = byte as c_char;
    }
    buf
}

fn read_ident(buf: &[c_char]) -> String {
    let bytes: Vec<u8> = buf.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

impl RawResponse {
    fn from_record(record: ResponseRecord, next: *mut RawResponse) -> Self {
        let nfreqs = record.nfreqs() as c_int;
        let rvec: Box<[RawComplex]> = record
            .spectrum()
            .iter()
            .map(|v| RawComplex { real: v.real(), imag: v.imag() })
            .collect();
        let freqs: Box<[f64]> = record.frequencies().into();

        Self {
            station: write_ident(record.station()),
            network: write_ident(record.network()),
            locid: write_ident(record.location()),
            channel: write_ident(record.channel()),
            rvec: Box::into_raw(rvec) as *mut RawComplex,
            nfreqs,
            freqs: Box::into_raw(freqs) as *mut f64,
            next,
        }
    }
}

impl ResponseList {
    /// Transfer the list to a C caller as a linked chain
    ///
    /// Returns null for an empty list. The chain must be released with
    /// [`free_raw`] exactly once.
    pub fn into_raw(self) -> Result<*mut RawResponse, BridgeError> {
        if self.iter().any(|r| r.nfreqs() > c_int::MAX as usize) {
            return Err(BridgeError::allocation("response object"));
        }

        let records: Vec<ResponseRecord> = self.into_vec();
        let count = records.len();
        let mut head: *mut RawResponse = ptr::null_mut();
        for record in records.into_iter().rev() {
            head = Box::into_raw(Box::new(RawResponse::from_record(record, head)));
        }

        if !head.is_null() {
            LIVE_HEADS.lock().insert(head as usize);
            trace!(target: "response", head = ?head, records = count, "list handed to caller");
        }
        Ok(head)
    }

    /// Copy a C linked chain into an owned list without taking ownership
    ///
    /// # Safety
    /// `head` must be null or point to a valid chain whose `rvec`/`freqs`
    /// arrays hold at least `nfreqs` elements.
    pub unsafe fn from_raw(head: *const RawResponse) -> Result<Self, BridgeError> {
        if head.is_null() {
            return Err(BridgeError::parameter("Empty list of responses send to 'print_resp'"));
        }

        let mut list = ResponseList::new();
        let mut seen = HashSet::new();
        let mut node = head;
        while !node.is_null() {
            if !seen.insert(node as usize) {
                return Err(BridgeError::parameter("Response list is cyclic"));
            }
            let raw = &*node;
            if raw.rvec.is_null() || raw.freqs.is_null() || raw.nfreqs <= 0 {
                return Err(BridgeError::parameter("Null array pointer in response"));
            }

            let n = raw.nfreqs as usize;
            let spectrum = std::slice::from_raw_parts(raw.rvec, n)
                .iter()
                .map(|c| ComplexValue::new(c.real, c.imag))
                .collect();
            let frequencies = std::slice::from_raw_parts(raw.freqs, n).to_vec();
            let id = ChannelId::new(
                &read_ident(&raw.station),
                &read_ident(&raw.channel),
                &read_ident(&raw.network),
                &read_ident(&raw.locid),
            );
            let record = ResponseRecord::new(id, frequencies, spectrum)
                .map_err(|e| BridgeError::parameter(e.to_string()))?;
            list.push(record);
            node = raw.next;
        }
        Ok(list)
    }
}

/// Release a chain created by [`ResponseList::into_raw`]
///
/// Returns the number of records released. Null, unknown, or already
/// released heads release nothing.
///
/// # Safety
/// The chain must not be used after this call.
pub unsafe fn free_raw(head: *mut RawResponse) -> usize {
    if head.is_null() {
        return 0;
    }
    if !LIVE_HEADS.lock().remove(&(head as usize)) {
        warn!(target: "response", head = ?head, "refusing to free unknown or already freed list");
        return 0;
    }

    let mut released = 0;
    let mut node = head;
    while !node.is_null() {
        let boxed = Box::from_raw(node);
        let n = boxed.nfreqs as usize;
        if !boxed.rvec.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(boxed.rvec, n)));
        }
        if !boxed.freqs.is_null() {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(boxed.freqs, n)));
        }
        node = boxed.next;
        released += 1;
    }
    trace!(target: "response", head = ?head, released, "list released");
    released
}

/// Whether a head is currently owned by a caller
pub fn is_live(head: *const RawResponse) -> bool {
    !head.is_null() && LIVE_HEADS.lock().contains(&(head as usize))
}
