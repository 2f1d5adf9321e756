//! jevtest - exercise the bridge end to end
//!
//! Looks up responses over a frequency list, prints one line per record,
//! writes them out, stops the runtime and exits with the latched code.

use jevresp::interop::memory::{FindBehavior, MemoryLauncher, MemoryScript, WriteBehavior};
use jevresp::logging::{self, LogConfig};
use jevresp::{Bridge, BridgeConfig, ChannelId, FindRequest, OutputFormat, RuntimeLauncher};
use std::path::PathBuf;

#[derive(Debug, Clone)]
struct TestConfig {
    request: FindRequest,
    format: OutputFormat,
    to_stdout: bool,
    json: bool,
    dry_run: bool,
    config_file: Option<PathBuf>,
}

impl Default for TestConfig {
    fn default() -> Self {
        let frequencies = (1..=10).map(f64::from).collect();
        Self {
            request: FindRequest::new(frequencies).file(".").verbose(true),
            format: OutputFormat::AmpPhase,
            to_stdout: false,
            json: false,
            dry_run: false,
            config_file: None,
        }
    }
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [OPTIONS]\n\nOptions:\n  \
         --sta LIST       Station patterns (default: *)\n  \
         --cha LIST       Channel patterns (default: *)\n  \
         --net LIST       Network patterns (default: *)\n  \
         --loc LIST       Location patterns (default: *)\n  \
         --date DATE      Date of interest\n  \
         --units CODE     Output units: def, dis, vel or acc\n  \
         --file PATH      Response file or directory (default: .)\n  \
         --freqs LIST     Comma-separated frequencies (default: 1..10)\n  \
         --quiet          Turn off verbose remote output\n  \
         --stdio          Read responses from stdin, write to stdout\n  \
         --format FMT     Output format: ap or cs (default: ap)\n  \
         --json           Print a JSON summary instead of text\n  \
         --config FILE    Bridge configuration file\n  \
         --dry-run        Use the in-process runtime with synthetic responses",
        program
    )
}

fn parse_freqs(list: &str) -> Result<Vec<f64>, String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().map_err(|_| format!("Invalid frequency: {}", s)))
        .collect()
}

fn parse_args() -> Result<TestConfig, String> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("jevtest");
    let mut config = TestConfig::default();
    let mut i = 1;

    while i < args.len() {
        let flag = args[i].as_str();
        let mut value = || -> Result<String, String> {
            i += 1;
            args.get(i).cloned().ok_or_else(|| format!("{} requires an argument", flag))
        };
        match flag {
            "--sta" => config.request.stations = value()?,
            "--cha" => config.request.channels = value()?,
            "--net" => config.request.networks = value()?,
            "--loc" => config.request.locations = value()?,
            "--date" => config.request.date = value()?,
            "--units" => config.request.units = value()?,
            "--file" => config.request.file = value()?,
            "--freqs" => config.request.frequencies = parse_freqs(&value()?)?,
            "--format" => config.format = value()?.parse().map_err(|e| format!("{}", e))?,
            "--config" => config.config_file = Some(PathBuf::from(value()?)),
            "--quiet" => config.request.verbose = false,
            "--stdio" => {
                config.request.use_stdio = true;
                config.to_stdout = true;
            }
            "--json" => config.json = true,
            "--dry-run" => config.dry_run = true,
            "-h" | "--help" => return Err(usage(program)),
            other => return Err(format!("Unknown option: {}\n\n{}", other, usage(program))),
        }
        i += 1;
    }

    Ok(config)
}

fn run<L: RuntimeLauncher>(bridge: &mut Bridge<L>, config: &TestConfig) -> i32 {
    let list = bridge.find_responses(&config.request).unwrap_or_default();

    if config.json {
        let summary = serde_json::json!({
            "request": &config.request,
            "responses": &list,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => eprintln!("Unable to encode summary: {}", e),
        }
    } else {
        println!();
        for (i, record) in list.iter().enumerate() {
            println!(
                "{:3}: sta={}, cha={}, net={}, loc={}, nfreqs={}",
                i + 1,
                record.station(),
                record.channel(),
                record.network(),
                record.location(),
                record.nfreqs()
            );
        }
        let count = list.len();
        println!("\n{} response{} returned", count, if count != 1 { "s" } else { "" });
    }

    if let Err(e) = bridge.write_responses(&list, config.format, config.to_stdout) {
        eprintln!("{}", e);
    }
    bridge.stop();

    let code = bridge.exit_code();
    if !config.json {
        println!("Return code = {}", code);
    }
    code
}

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(1);
        }
    };

    let bridge_config = match &config.config_file {
        Some(path) => BridgeConfig::from_file(path),
        None => BridgeConfig::load(),
    };
    let bridge_config = match bridge_config {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    let mut log_config = bridge_config.log_config();
    if config.request.verbose && std::env::var("JEVRESP_LOG_LEVEL").is_err() {
        log_config = LogConfig { level: LogConfig::verbose().level, ..log_config };
    }
    logging::init_with_config(log_config);

    let code = if config.dry_run {
        let channels = vec![
            ChannelId::new("ANMO", "BHZ", "IU", "00"),
            ChannelId::new("ANMO", "BH1", "IU", "00"),
            ChannelId::new("COLA", "BHZ", "IU", "10"),
        ];
        let script = MemoryScript::new()
            .with_find(FindBehavior::Synthetic(channels))
            .with_write(WriteBehavior::Render(PathBuf::from(&config.request.file)));
        let mut bridge = Bridge::new(MemoryLauncher::new(script), bridge_config);
        run(&mut bridge, &config)
    } else {
        let mut bridge = jevresp::default_bridge(bridge_config);
        run(&mut bridge, &config)
    };
    std::process::exit(code);
}
