//! FORTRAN-callable `evresp_`
//!
//! Text arguments arrive as blank-padded buffers with their lengths passed
//! after the other arguments; numbers arrive by reference. A single match
//! is returned as interleaved real/imaginary `f32` values.

use super::with_bridge;
use crate::error::BridgeError;
use crate::interop::FindRequest;
use crate::response::ResponseList;
use std::os::raw::{c_char, c_float, c_int};

/// Exactly one response matched
pub const UNIQUE_MATCH: c_int = 0;
/// Nothing matched (or the lookup failed)
pub const NO_MATCH: c_int = 1;
/// More than one response matched
pub const AMBIGUOUS_MATCH: c_int = -1;

/// Read a blank-padded buffer; trailing blanks and anything after a NUL
/// are dropped
///
/// # Safety
/// `ptr` must be null or valid for `len` bytes.
pub unsafe fn fortran_text(ptr: *const c_char, len: c_int) -> String {
    if ptr.is_null() || len <= 0 {
        return String::new();
    }
    let bytes = std::slice::from_raw_parts(ptr as *const u8, len as usize);
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end_matches(' ').to_string()
}

/// Flatten the only record of `list` into `out` as real/imag pairs
///
/// Writes at most `out.len() / 2` pairs.
pub fn flatten_single(list: &ResponseList, out: &mut [c_float]) -> c_int {
    match list.len() {
        0 => NO_MATCH,
        1 => {
            if let Some(record) = list.first() {
                for (pair, value) in out.chunks_exact_mut(2).zip(record.spectrum()) {
                    pair[0] = value.real() as c_float;
                    pair[1] = value.imag() as c_float;
                }
            }
            UNIQUE_MATCH
        }
        _ => AMBIGUOUS_MATCH,
    }
}

/// Find a single response for FORTRAN callers
///
/// `resp` receives `2 * nfreqs` values on a unique match.
///
/// # Safety
/// Each text pointer must be valid for its length; `freqs` for `nfreqs`
/// values and `resp` for `2 * nfreqs`; the integer pointers must be valid.
#[no_mangle]
pub unsafe extern "C" fn evresp_(
    sta: *const c_char,
    cha: *const c_char,
    net: *const c_char,
    locid: *const c_char,
    datime: *const c_char,
    units: *const c_char,
    file: *const c_char,
    freqs: *const c_float,
    nfreqs_in: *const c_int,
    resp: *mut c_float,
    _rtype: *const c_char,
    verbose: *const c_char,
    start_stage: *const c_int,
    stop_stage: *const c_int,
    stdio_flag: *const c_int,
    lsta: *const c_int,
    lcha: *const c_int,
    lnet: *const c_int,
    llocid: *const c_int,
    ldatime: *const c_int,
    lunits: *const c_int,
    lfile: *const c_int,
    _lrtype: *const c_int,
    lverbose: *const c_int,
) -> c_int {
    let int = |p: *const c_int| if p.is_null() { 0 } else { *p };

    let nfreqs = int(nfreqs_in);
    if freqs.is_null() || resp.is_null() || nfreqs <= 0 {
        let err = BridgeError::parameter("Error in 'evresp' parameters");
        with_bridge(|bridge| bridge.record_failure(&err));
        return NO_MATCH;
    }
    let nfreqs = nfreqs as usize;
    let frequencies = std::slice::from_raw_parts(freqs, nfreqs)
        .iter()
        .map(|&f| f as f64)
        .collect();

    let request = FindRequest::new(frequencies)
        .stations(fortran_text(sta, int(lsta)))
        .channels(fortran_text(cha, int(lcha)))
        .networks(fortran_text(net, int(lnet)))
        .locations(fortran_text(locid, int(llocid)))
        .date(fortran_text(datime, int(ldatime)))
        .units(fortran_text(units, int(lunits)))
        .file(fortran_text(file, int(lfile)))
        .verbose(fortran_text(verbose, int(lverbose)) == "-v")
        .stages(int(start_stage), int(stop_stage))
        .use_stdio(int(stdio_flag) != 0);

    match with_bridge(|bridge| bridge.find_responses(&request)) {
        Ok(list) => {
            let out = std::slice::from_raw_parts_mut(resp, 2 * nfreqs);
            flatten_single(&list, out)
        }
        Err(_) => NO_MATCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ChannelId, ComplexValue, ResponseRecord};

    fn record(sta: &str, values: &[(f64, f64)]) -> ResponseRecord {
        let freqs = (1..=values.len()).map(|f| f as f64).collect();
        let spectrum = values.iter().map(|&(r, i)| ComplexValue::new(r, i)).collect();
        ResponseRecord::new(ChannelId::new(sta, "BHZ", "IU", ""), freqs, spectrum).unwrap()
    }

    #[test]
    fn test_fortran_text_strips_padding() {
        let buf = b"ANMO    ";
        let text = unsafe { fortran_text(buf.as_ptr() as *const c_char, buf.len() as c_int) };
        assert_eq!(text, "ANMO");

        let buf = b"BHZ\0junk";
        let text = unsafe { fortran_text(buf.as_ptr() as *const c_char, buf.len() as c_int) };
        assert_eq!(text, "BHZ");

        assert_eq!(unsafe { fortran_text(std::ptr::null(), 8) }, "");
    }

    #[test]
    fn test_flatten_unique_interleaves() {
        let mut list = ResponseList::new();
        list.push(record("ANMO", &[(1.0, -1.0), (2.0, -2.0)]));
        let mut out = [0.0f32; 4];
        assert_eq!(flatten_single(&list, &mut out), UNIQUE_MATCH);
        assert_eq!(out, [1.0, -1.0, 2.0, -2.0]);
    }

    #[test]
    fn test_flatten_outcomes() {
        let mut out = [0.0f32; 2];
        assert_eq!(flatten_single(&ResponseList::new(), &mut out), NO_MATCH);

        let mut list = ResponseList::new();
        list.push(record("ANMO", &[(1.0, 0.0)]));
        list.push(record("COLA", &[(1.0, 0.0)]));
        assert_eq!(flatten_single(&list, &mut out), AMBIGUOUS_MATCH);
        assert_eq!(out, [0.0, 0.0]);
    }
}
