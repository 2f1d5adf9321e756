use jevresp::interop::memory::{
    FindBehavior, MemoryLauncher, MemoryScript, RecordData, ScriptedElement,
};
use jevresp::{Bridge, BridgeConfig, BridgeError, ChannelId, FindRequest, RuntimeState};
use proptest::prelude::*;

fn bridge(script: &MemoryScript) -> Bridge<MemoryLauncher> {
    Bridge::new(MemoryLauncher::new(script.clone()), BridgeConfig::default())
}

fn freqs(n: usize) -> Vec<f64> {
    (1..=n).map(|f| f as f64).collect()
}

#[test]
fn test_wildcard_lookup_over_ten_frequencies() {
    let ids = vec![
        ChannelId::new("ANMO", "BHZ", "IU", "00"),
        ChannelId::new("ANMO", "BH1", "IU", "00"),
        ChannelId::new("COLA", "BHZ", "IU", "10"),
    ];
    let script = MemoryScript::new().with_find(FindBehavior::Synthetic(ids.clone()));
    let mut bridge = bridge(&script);

    let list = bridge.find_responses(&FindRequest::new(freqs(10))).unwrap();

    assert_eq!(list.len(), 3);
    for (record, id) in list.iter().zip(&ids) {
        assert_eq!(record.id(), id);
        assert_eq!(record.nfreqs(), 10);
        assert_eq!(record.frequencies(), freqs(10).as_slice());
        assert_eq!(record.spectrum().len(), 10);
    }
    assert_eq!(bridge.exit_code(), 0);
    assert_eq!(script.log().leaked_refs, 0);
}

#[test]
fn test_request_reaches_runner_unchanged() {
    let script = MemoryScript::new()
        .with_find(FindBehavior::Synthetic(vec![ChannelId::new("ANMO", "BHZ", "IU", "")]));
    let mut bridge = bridge(&script);
    let request = FindRequest::new(vec![0.5, 1.5])
        .stations("ANMO,COLA")
        .channels("BH?")
        .networks("IU")
        .locations("")
        .date("2001,100,00:00:00")
        .units("vel")
        .file("/data/RESP")
        .verbose(true)
        .stages(1, 3);

    bridge.find_responses(&request).unwrap();

    let log = script.log();
    assert_eq!(log.finds, vec![request]);
    assert_eq!(log.runners_constructed, 1);
}

#[test]
fn test_no_match_returns_runner_status() {
    let script = MemoryScript::new().with_find(FindBehavior::NoMatch { exit_status: 14 });
    let mut bridge = bridge(&script);

    let err = bridge.find_responses(&FindRequest::new(freqs(3))).unwrap_err();
    assert_eq!(err, BridgeError::NoResponses(14));
    assert_eq!(bridge.exit_code(), 14);
    assert_eq!(script.log().exit_status_reads, 1);
}

#[test]
fn test_missing_record_field_fails_with_symbol_code() {
    let script = MemoryScript::new()
        .with_find(FindBehavior::Synthetic(vec![ChannelId::new("ANMO", "BHZ", "IU", "")]));
    script.hide("com/isti/jevalresp/RespInfoBlk.siteName");
    let mut bridge = bridge(&script);

    let err = bridge.find_responses(&FindRequest::new(freqs(2))).unwrap_err();
    assert_eq!(err.code(), 3);
    assert!(bridge.status().message().contains("siteName"));
    assert!(script.log().finds.is_empty());
}

#[test]
fn test_null_field_is_field_error() {
    let mut data = RecordData::synthetic(&ChannelId::new("ANMO", "BHZ", "IU", ""), &freqs(4), 2.0);
    data.channel = None;
    let script = MemoryScript::new().with_find(FindBehavior::Respond(vec![ScriptedElement::Record(data)]));
    let mut bridge = bridge(&script);

    let err = bridge.find_responses(&FindRequest::new(freqs(4))).unwrap_err();
    assert_eq!(err.code(), 8);
}

#[test]
fn test_remote_fault_then_recovery() {
    let script = MemoryScript::new().with_find(FindBehavior::Fault("java.io.IOException".into()));
    let mut bridge = bridge(&script);

    let err = bridge.find_responses(&FindRequest::new(freqs(2))).unwrap_err();
    assert_eq!(err.code(), 9);

    script.set_find(FindBehavior::Synthetic(vec![ChannelId::new("ANMO", "BHZ", "IU", "")]));
    let list = bridge.find_responses(&FindRequest::new(freqs(2))).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(script.log().faults_cleared, 1);
    assert_eq!(script.log().launches, 1);
}

#[test]
fn test_restart_between_lookups() {
    let script = MemoryScript::new()
        .with_find(FindBehavior::Synthetic(vec![ChannelId::new("ANMO", "BHZ", "IU", "")]));
    let mut bridge = bridge(&script);

    bridge.find_responses(&FindRequest::new(freqs(2))).unwrap();
    bridge.stop();
    assert_eq!(bridge.state(), RuntimeState::Stopped);

    let list = bridge.find_responses(&FindRequest::new(freqs(5))).unwrap();
    assert_eq!(list.first().map(|r| r.nfreqs()), Some(5));
    let log = script.log();
    assert_eq!(log.launches, 2);
    assert_eq!(log.shutdowns, 1);
}

proptest! {
    #[test]
    fn prop_every_record_matches_request_length(n in 1usize..64, channels in 1usize..6) {
        let ids = (0..channels)
            .map(|i| ChannelId::new(&format!("S{}", i), "BHZ", "IU", ""))
            .collect();
        let script = MemoryScript::new().with_find(FindBehavior::Synthetic(ids));
        let mut bridge = bridge(&script);

        let list = bridge.find_responses(&FindRequest::new(freqs(n))).unwrap();
        prop_assert_eq!(list.len(), channels);
        for record in list.iter() {
            prop_assert_eq!(record.frequencies().len(), n);
            prop_assert_eq!(record.spectrum().len(), n);
        }
    }
}
