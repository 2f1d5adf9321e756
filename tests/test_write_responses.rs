use jevresp::interop::memory::{FindBehavior, MemoryLauncher, MemoryScript, WriteBehavior};
use jevresp::{
    Bridge, BridgeConfig, BridgeError, ChannelId, ComplexValue, FindRequest, OutputFormat,
    ResponseList, ResponseRecord,
};
use std::fs;

fn bridge(script: &MemoryScript) -> Bridge<MemoryLauncher> {
    Bridge::new(MemoryLauncher::new(script.clone()), BridgeConfig::default())
}

fn record(sta: &str, cha: &str, nfreqs: usize) -> ResponseRecord {
    let freqs: Vec<f64> = (1..=nfreqs).map(|f| f as f64).collect();
    let spectrum = freqs.iter().map(|&f| ComplexValue::new(1.0 / f, -f)).collect();
    ResponseRecord::new(ChannelId::new(sta, cha, "IU", "00"), freqs, spectrum).unwrap()
}

#[test]
fn test_write_renders_amplitude_and_phase_files() {
    let dir = tempfile::tempdir().unwrap();
    let script = MemoryScript::new().with_write(WriteBehavior::Render(dir.path().to_path_buf()));
    let mut bridge = bridge(&script);
    let list: ResponseList = vec![record("ANMO", "BHZ", 4), record("COLA", "BHZ", 4)].into();

    bridge.write_responses(&list, OutputFormat::AmpPhase, false).unwrap();

    for name in ["AMP.IU.ANMO.00.BHZ", "PHASE.IU.ANMO.00.BHZ", "AMP.IU.COLA.00.BHZ"] {
        let body = fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(body.lines().count(), 4, "{}", name);
    }
    assert!(!dir.path().join("SPECTRA.IU.ANMO.00.BHZ").exists());
    assert_eq!(bridge.exit_code(), 0);
}

#[test]
fn test_write_renders_complex_spectra() {
    let dir = tempfile::tempdir().unwrap();
    let script = MemoryScript::new().with_write(WriteBehavior::Render(dir.path().to_path_buf()));
    let mut bridge = bridge(&script);
    let list: ResponseList = vec![record("ANMO", "BHZ", 3)].into();

    bridge.write_responses(&list, OutputFormat::ComplexSpectra, false).unwrap();

    let body = fs::read_to_string(dir.path().join("SPECTRA.IU.ANMO.00.BHZ")).unwrap();
    assert_eq!(body.lines().count(), 3);
    assert_eq!(script.log().writes[0].format, "cs");
}

#[test]
fn test_records_reach_runner_in_order() {
    let script = MemoryScript::new();
    let mut bridge = bridge(&script);
    let list: ResponseList =
        vec![record("ANMO", "BHZ", 2), record("ANMO", "BH1", 2), record("COLA", "BHZ", 2)].into();

    bridge.write_responses(&list, OutputFormat::AmpPhase, true).unwrap();

    let log = script.log();
    assert_eq!(log.writes.len(), 1);
    let call = &log.writes[0];
    assert!(call.to_stdout);
    let channels: Vec<_> = call.records.iter().map(|r| r.channel.clone().unwrap_or_default()).collect();
    assert_eq!(channels, vec!["BHZ", "BH1", "BHZ"]);
    assert_eq!(call.records[1].spectrum.as_ref().map(Vec::len), Some(2));
}

#[test]
fn test_empty_list_is_parameter_error() {
    let script = MemoryScript::new();
    let mut bridge = bridge(&script);

    let err = bridge.write_responses(&ResponseList::new(), OutputFormat::AmpPhase, false).unwrap_err();
    assert_eq!(err.code(), 1);
    assert_eq!(bridge.status().message(), "Empty list of responses send to 'print_resp'");
    assert_eq!(script.log().launches, 0);
}

#[test]
fn test_runner_status_is_latched() {
    let script = MemoryScript::new().with_write(WriteBehavior::Reject { exit_status: 12 });
    let mut bridge = bridge(&script);
    let list: ResponseList = vec![record("ANMO", "BHZ", 2)].into();

    let err = bridge.write_responses(&list, OutputFormat::AmpPhase, false).unwrap_err();
    assert_eq!(err, BridgeError::RemoteStatus(12));
    assert_eq!(bridge.exit_code(), 12);

    script.set_write(WriteBehavior::Fault { message: "boom".into(), exit_status: 7 });
    let err = bridge.write_responses(&list, OutputFormat::AmpPhase, false).unwrap_err();
    assert_eq!(err, BridgeError::RemoteStatus(7));
    assert_eq!(bridge.exit_code(), 7);
}

#[test]
fn test_fault_with_zero_status_is_success() {
    let script = MemoryScript::new().with_write(WriteBehavior::Fault {
        message: "java.io.IOException".into(),
        exit_status: 0,
    });
    let mut bridge = bridge(&script);
    let list: ResponseList = vec![record("ANMO", "BHZ", 2)].into();

    bridge.record_failure(&BridgeError::parameter("earlier failure"));
    bridge.write_responses(&list, OutputFormat::AmpPhase, false).unwrap();

    assert_eq!(bridge.exit_code(), 0);
    let log = script.log();
    assert_eq!(log.faults_cleared, 1);
    assert_eq!(log.exit_status_reads, 1);
}

#[test]
fn test_written_records_come_back_unchanged() {
    let script = MemoryScript::new().with_find(FindBehavior::EchoWritten);
    let mut bridge = bridge(&script);
    let list: ResponseList = vec![record("ANMO", "BHZ", 5), record("COLA", "LHZ", 5)].into();

    bridge.write_responses(&list, OutputFormat::AmpPhase, false).unwrap();
    let echoed = bridge.find_responses(&FindRequest::new(vec![1.0])).unwrap();

    assert_eq!(echoed, list);
    assert_eq!(script.log().leaked_refs, 0);
}
