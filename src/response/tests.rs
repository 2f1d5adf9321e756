//! Tests for the response list model

use super::*;
use proptest::prelude::*;

fn record(station: &str, n: usize) -> ResponseRecord {
    let freqs: Vec<f64> = (1..=n).map(|i| i as f64).collect();
    let spectrum = freqs.iter().map(|&f| ComplexValue::new(f, -f)).collect();
    ResponseRecord::new(ChannelId::new(station, "BHZ", "IU", "00"), freqs, spectrum).unwrap()
}

#[test]
fn test_truncate_ident() {
    assert_eq!(truncate_ident("ANMO", STATION_LEN), "ANMO");
    let long = "X".repeat(100);
    assert_eq!(truncate_ident(&long, STATION_LEN).len(), STATION_LEN - 1);
    // multi-byte characters are never split
    let wide = "é".repeat(40);
    let cut = truncate_ident(&wide, 64);
    assert!(cut.len() <= 63);
    assert!(cut.chars().all(|c| c == 'é'));
}

#[test]
fn test_record_rejects_mismatch() {
    let id = ChannelId::new("A", "B", "C", "D");
    let err = ResponseRecord::new(id.clone(), vec![1.0, 2.0], vec![ComplexValue::new(0.0, 0.0)]);
    assert_eq!(err.unwrap_err(), ShapeError::LengthMismatch { spectrum: 1, frequencies: 2 });

    let err = ResponseRecord::new(id, vec![], vec![]);
    assert_eq!(err.unwrap_err(), ShapeError::Empty);
}

#[test]
fn test_list_preserves_order() {
    let list: ResponseList = ["A", "B", "C"].iter().map(|s| record(s, 2)).collect();
    let stations: Vec<&str> = list.iter().map(|r| r.station()).collect();
    assert_eq!(stations, vec!["A", "B", "C"]);
    assert_eq!(list.first().map(|r| r.station()), Some("A"));
}

#[test]
fn test_complex_amplitude_phase() {
    let v = ComplexValue::new(0.0, 2.0);
    assert!((v.amplitude() - 2.0).abs() < 1e-12);
    assert!((v.phase_degrees() - 90.0).abs() < 1e-12);
}

#[test]
fn test_raw_chain_releases_each_record_once() {
    let list: ResponseList = ["A", "B", "C"].iter().map(|s| record(s, 10)).collect();
    let head = list.into_raw().unwrap();
    assert!(is_live(head));

    unsafe {
        assert_eq!((*head).nfreqs, 10);
        assert!(!(*head).next.is_null());

        assert_eq!(free_raw(head), 3);
        assert!(!is_live(head));
        // second free is refused
        assert_eq!(free_raw(head), 0);
    }
}

#[test]
fn test_raw_chain_copies_back() {
    let list: ResponseList = ["ANMO", "COLA"].iter().map(|s| record(s, 4)).collect();
    let head = list.clone().into_raw().unwrap();

    let copied = unsafe { ResponseList::from_raw(head) }.unwrap();
    assert_eq!(copied, list);

    unsafe {
        assert_eq!(free_raw(head), 2);
    }
}

#[test]
fn test_empty_list_is_null() {
    let head = ResponseList::new().into_raw().unwrap();
    assert!(head.is_null());
    assert!(unsafe { ResponseList::from_raw(head) }.is_err());
    assert_eq!(unsafe { free_raw(head) }, 0);
}

#[test]
fn test_from_raw_rejects_null_arrays() {
    let list: ResponseList = vec![record("A", 3)].into();
    let head = list.into_raw().unwrap();
    unsafe {
        let saved = (*head).rvec;
        (*head).rvec = std::ptr::null_mut();
        let err = ResponseList::from_raw(head).unwrap_err();
        assert_eq!(err.code(), 1);
        (*head).rvec = saved;
        assert_eq!(free_raw(head), 1);
    }
}

proptest! {
    #[test]
    fn prop_record_lengths_match(n in 1usize..64) {
        let r = record("STA", n);
        prop_assert_eq!(r.nfreqs(), n);
        prop_assert_eq!(r.spectrum().len(), r.frequencies().len());
    }

    #[test]
    fn prop_ident_fits_buffer(s in "\\PC{0,120}") {
        let cut = truncate_ident(&s, CHANNEL_LEN);
        prop_assert!(cut.len() < CHANNEL_LEN);
        prop_assert!(s.starts_with(&cut));
    }
}
