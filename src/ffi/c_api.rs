//! C API - drop-in replacements for the evalresp `evresp`/`print_resp` family
//!
//! Returned lists are owned by the caller and released with
//! `free_response`. Failures return null (or nothing) and leave their code
//! in the status channel, readable through `getexitcode`.

use super::{text_arg, with_bridge};
use crate::bridge::Bridge;
use crate::config::RuntimeConfig;
use crate::error::BridgeError;
use crate::interop::{FindRequest, OutputFormat};
use crate::response::{free_raw, RawResponse, ResponseList};
use crate::runtime::{LaunchOptions, RuntimeLauncher};
use std::os::raw::{c_char, c_double, c_int};
use std::ptr;
use tracing::debug;

/// Pointer arguments of a lookup as received from C
#[derive(Debug, Clone, Copy)]
pub struct RawFindArgs {
    pub stations: *const c_char,
    pub channels: *const c_char,
    pub networks: *const c_char,
    pub locations: *const c_char,
    pub date: *const c_char,
    pub units: *const c_char,
    pub file: *const c_char,
    pub freqs: *const c_double,
    pub nfreqs: c_int,
    pub verbose: bool,
    pub start_stage: c_int,
    pub stop_stage: c_int,
    pub use_stdio: bool,
}

impl Default for RawFindArgs {
    fn default() -> Self {
        Self {
            stations: ptr::null(),
            channels: ptr::null(),
            networks: ptr::null(),
            locations: ptr::null(),
            date: ptr::null(),
            units: ptr::null(),
            file: ptr::null(),
            freqs: ptr::null(),
            nfreqs: 0,
            verbose: false,
            start_stage: 0,
            stop_stage: 0,
            use_stdio: false,
        }
    }
}

impl RawFindArgs {
    /// Copy the arguments into an owned request
    ///
    /// # Safety
    /// Text pointers must be null or NUL-terminated; `freqs` must hold
    /// `nfreqs` values when non-null.
    pub unsafe fn to_request(&self) -> Result<FindRequest, BridgeError> {
        if self.freqs.is_null() || self.nfreqs <= 0 {
            return Err(BridgeError::parameter("Error in 'evresp' parameters"));
        }
        let frequencies = std::slice::from_raw_parts(self.freqs, self.nfreqs as usize).to_vec();

        Ok(FindRequest::new(frequencies)
            .stations(text_arg(self.stations))
            .channels(text_arg(self.channels))
            .networks(text_arg(self.networks))
            .locations(text_arg(self.locations))
            .date(text_arg(self.date))
            .units(text_arg(self.units))
            .file(text_arg(self.file))
            .verbose(self.verbose)
            .stages(self.start_stage, self.stop_stage)
            .use_stdio(self.use_stdio))
    }
}

/// Run a lookup on `bridge` and hand the result over as a C list
///
/// # Safety
/// See [`RawFindArgs::to_request`].
pub unsafe fn find_raw<L: RuntimeLauncher>(
    bridge: &mut Bridge<L>,
    args: &RawFindArgs,
) -> *mut RawResponse {
    let result = args
        .to_request()
        .and_then(|request| bridge.find_responses(&request))
        .and_then(ResponseList::into_raw);
    match result {
        Ok(head) => head,
        Err(e) => {
            // find_responses latched already; latching again is harmless
            bridge.record_failure(&e);
            ptr::null_mut()
        }
    }
}

/// Copy a C list and send it to the remote writer
///
/// A null or empty `rtype` selects amplitude/phase output.
///
/// # Safety
/// `head` must be null or a valid chain; `rtype` null or NUL-terminated.
pub unsafe fn print_raw<L: RuntimeLauncher>(
    bridge: &mut Bridge<L>,
    head: *const RawResponse,
    rtype: *const c_char,
    use_stdio: bool,
) {
    let result = ResponseList::from_raw(head).and_then(|list| {
        let code = text_arg(rtype);
        let format = if code.is_empty() {
            OutputFormat::default()
        } else {
            code.parse::<OutputFormat>()?
        };
        bridge.write_responses(&list, format, use_stdio)
    });
    if let Err(e) = result {
        bridge.record_failure(&e);
    }
}

/// Find responses; verbose output when `verbose` is `"-v"`
///
/// # Safety
/// Text arguments null or NUL-terminated; `freqs` holds `nfreqs` values.
#[no_mangle]
pub unsafe extern "C" fn evresp(
    stalst: *const c_char,
    chalst: *const c_char,
    netlst: *const c_char,
    locidlst: *const c_char,
    datestr: *const c_char,
    unitsconvstr: *const c_char,
    filename: *const c_char,
    freqarr: *const c_double,
    numfreqs: c_int,
    _resptypestr: *const c_char,
    verbosestr: *const c_char,
    startstage: c_int,
    stopstage: c_int,
    stdioflag: c_int,
) -> *mut RawResponse {
    let verbose = text_arg(verbosestr) == "-v";
    evresp2(
        stalst, chalst, netlst, locidlst, datestr, unitsconvstr, filename, freqarr, numfreqs,
        verbose as c_int, startstage, stopstage, stdioflag,
    )
}

/// Find responses and return them as a linked list, or null on failure
///
/// # Safety
/// Text arguments null or NUL-terminated; `freqs` holds `nfreqs` values.
#[no_mangle]
pub unsafe extern "C" fn evresp2(
    stalst: *const c_char,
    chalst: *const c_char,
    netlst: *const c_char,
    locidlst: *const c_char,
    datestr: *const c_char,
    unitsconvstr: *const c_char,
    filename: *const c_char,
    freqarr: *const c_double,
    numfreqs: c_int,
    verboseflag: c_int,
    startstage: c_int,
    stopstage: c_int,
    stdioflag: c_int,
) -> *mut RawResponse {
    let args = RawFindArgs {
        stations: stalst,
        channels: chalst,
        networks: netlst,
        locations: locidlst,
        date: datestr,
        units: unitsconvstr,
        file: filename,
        freqs: freqarr,
        nfreqs: numfreqs,
        verbose: verboseflag != 0,
        start_stage: startstage,
        stop_stage: stopstage,
        use_stdio: stdioflag != 0,
    };
    with_bridge(|bridge| find_raw(bridge, &args))
}

/// `evresp` with list-interpolation arguments, which are ignored
///
/// # Safety
/// As for [`evresp`].
#[no_mangle]
pub unsafe extern "C" fn evresp_itp(
    stalst: *const c_char,
    chalst: *const c_char,
    net_code: *const c_char,
    locidlst: *const c_char,
    date_time: *const c_char,
    units: *const c_char,
    file: *const c_char,
    freqs: *const c_double,
    nfreqs: c_int,
    rtype: *const c_char,
    verbose: *const c_char,
    start_stage: c_int,
    stop_stage: c_int,
    stdio_flag: c_int,
    listinterp_out_flag: c_int,
    listinterp_in_flag: c_int,
    _listinterp_tension: c_double,
) -> *mut RawResponse {
    if listinterp_out_flag != 0 || listinterp_in_flag != 0 {
        debug!("list interpolation requested but not supported");
    }
    evresp(
        stalst, chalst, net_code, locidlst, date_time, units, file, freqs, nfreqs, rtype, verbose,
        start_stage, stop_stage, stdio_flag,
    )
}

/// Write responses; the frequency arguments are ignored
///
/// # Safety
/// `resplist` null or a valid chain; `resptypestr` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn print_resp(
    _freqarr: *const c_double,
    _numfreqs: c_int,
    resplist: *const RawResponse,
    resptypestr: *const c_char,
    stdioflag: c_int,
) {
    printresp2(resplist, resptypestr, stdioflag);
}

/// Write responses as `"ap"` (amplitude/phase) or `"cs"` (complex spectra)
///
/// # Safety
/// `resplist` null or a valid chain; `resptypestr` null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn printresp2(
    resplist: *const RawResponse,
    resptypestr: *const c_char,
    stdioflag: c_int,
) {
    with_bridge(|bridge| print_raw(bridge, resplist, resptypestr, stdioflag != 0));
}

/// `print_resp` with list-interpolation arguments, which are ignored
///
/// # Safety
/// As for [`print_resp`].
#[no_mangle]
pub unsafe extern "C" fn print_resp_itp(
    freqs: *const c_double,
    nfreqs: c_int,
    first: *const RawResponse,
    rtype: *const c_char,
    stdio_flag: c_int,
    _listinterp_out_flag: c_int,
    _listinterp_tension: c_double,
) {
    print_resp(freqs, nfreqs, first, rtype, stdio_flag);
}

/// Exit status of the last failing operation (0 after a clean write)
#[no_mangle]
pub extern "C" fn getexitcode() -> c_int {
    with_bridge(|bridge| bridge.exit_code())
}

/// Release a list returned by `evresp`/`evresp2`; returns records freed
///
/// # Safety
/// `resplist` must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn free_response(resplist: *mut RawResponse) -> c_int {
    free_raw(resplist) as c_int
}

/// Options for an explicit start: `altclspath` names the variable holding
/// the extra class path, `namestr` the passthrough variable
///
/// # Safety
/// Both pointers null or NUL-terminated.
pub(crate) unsafe fn start_options(
    config: &RuntimeConfig,
    altclspath: *const c_char,
    namestr: *const c_char,
) -> LaunchOptions {
    let mut config = config.clone();
    if !altclspath.is_null() {
        config.classpath_var = text_arg(altclspath);
    }
    if !namestr.is_null() {
        config.passthrough_var = text_arg(namestr);
    }
    LaunchOptions::from_env(&config)
}

/// Start the runtime; returns 1 on success, 0 on failure
///
/// Null arguments keep the configured variable names. The JVM build starts
/// at most once per process: a call while the runtime is running, or after
/// it was stopped, fails with code 2 and leaves the running JVM in place.
///
/// # Safety
/// Both pointers null or NUL-terminated.
#[no_mangle]
pub unsafe extern "C" fn jevresp_start_runtime(
    altclspath: *const c_char,
    namestr: *const c_char,
) -> c_int {
    with_bridge(|bridge| {
        let options = start_options(&bridge.config().runtime, altclspath, namestr);
        bridge.start_with(options).is_ok() as c_int
    })
}

/// Stop the runtime; a no-op unless running
#[no_mangle]
pub extern "C" fn jevresp_stop_runtime() {
    with_bridge(|bridge| bridge.stop());
}

/// 1 while the runtime is running, 0 otherwise
#[no_mangle]
pub extern "C" fn jevresp_runtime_running() -> c_int {
    with_bridge(|bridge| bridge.is_running() as c_int)
}
