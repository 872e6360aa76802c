//! ttcplan command line.
//!
//! Usage:
//!   ttcplan login                      - read a password from stdin, open the session
//!   ttcplan logout                     - close the session
//!   ttcplan lookup [options]           - look up a scenario and print the results
//!   ttcplan manifest                   - load all feeds and print their digests
//!
//! Lookup options:
//!   --speed <mph> --road-type <type> --state <code> --duration <d> --control <c>
//!   --work-area <ft>   Work area length (default 500)
//!   --sop              Also print the setup/breakdown procedure
//!   --json             Output as JSON

use anyhow::{Context, Result};
use serde_json::json;
use std::io::{self, BufRead};
use std::process;

use ttcplan::data::StaticFetcher;
use ttcplan::error::AppError;
use ttcplan::form::RawForm;
use ttcplan::gate::{AccessGate, SessionFlag};
use ttcplan::logging;
use ttcplan::session::Session;
use ttcplan::state::Config;

const EXIT_OK: i32 = 0;
const EXIT_USAGE: i32 = 1;
const EXIT_DENIED: i32 = 2;
const EXIT_LOAD: i32 = 3;
const EXIT_LOOKUP: i32 = 4;

fn print_usage() {
    eprintln!("Usage: ttcplan <login|logout|lookup|manifest> [options]");
    eprintln!();
    eprintln!("  ttcplan lookup --speed 45 --road-type 2-lane-2-way --state FL \\");
    eprintln!("                 --duration long-term --control flagger \\");
    eprintln!("                 [--work-area 500] [--sop] [--json]");
    eprintln!();
    eprintln!("Road types: 2-lane-2-way, multi-lane-undivided, multi-lane-divided");
    eprintln!("States:     FL, TN, NC, SC, GA");
    eprintln!("Durations:  short-term, intermediate, long-term");
    eprintln!("Control:    none, flagger, AFAD");
}

#[derive(Debug, Default)]
struct LookupArgs {
    form: RawForm,
    sop: bool,
    json: bool,
}

/// Accepts both `--flag value` and `--flag=value`.
fn parse_lookup_args(args: &[String]) -> Result<LookupArgs, String> {
    let mut out = LookupArgs::default();
    let mut seen = [false; 5];
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--sop" => {
                out.sop = true;
                continue;
            }
            "--json" => {
                out.json = true;
                continue;
            }
            _ => {}
        }
        let (name, inline) = match arg.split_once('=') {
            Some((n, v)) => (n, Some(v.to_string())),
            None => (arg.as_str(), None),
        };
        let value = match inline {
            Some(v) => v,
            None => iter
                .next()
                .cloned()
                .ok_or_else(|| format!("missing value for {}", name))?,
        };
        match name {
            "--speed" => {
                out.form.speed = value;
                seen[0] = true;
            }
            "--road-type" => {
                out.form.road_type = value;
                seen[1] = true;
            }
            "--state" => {
                out.form.state = value;
                seen[2] = true;
            }
            "--duration" => {
                out.form.duration = value;
                seen[3] = true;
            }
            "--control" => {
                out.form.control = value;
                seen[4] = true;
            }
            "--work-area" => out.form.work_area = Some(value),
            other => return Err(format!("unknown option {}", other)),
        }
    }
    let names = ["--speed", "--road-type", "--state", "--duration", "--control"];
    if let Some(idx) = seen.iter().position(|s| !s) {
        return Err(format!("missing required option {}", names[idx]));
    }
    Ok(out)
}

fn exit_code_for(err: &AppError) -> i32 {
    match err {
        AppError::NotReady(_) | AppError::LoadFailed { .. } => EXIT_LOAD,
        AppError::Validation(_) | AppError::NoMatch(_) | AppError::DataIntegrity(_) => EXIT_LOOKUP,
    }
}

/// Follow-up line for an error. Unrecoverable ones point at the data, with the cause.
fn error_hint(err: &AppError) -> String {
    if err.is_recoverable() {
        return "Adjust the inputs and run the lookup again.".to_string();
    }
    match err {
        AppError::LoadFailed { message, .. } => {
            format!("Cause: {}. Fix the data source, then run `ttcplan manifest`.", message)
        }
        _ => "Fix the scenario table, then run `ttcplan manifest`.".to_string(),
    }
}

fn report(err: &AppError) -> i32 {
    eprintln!("{}", err);
    eprintln!("{}", error_hint(err));
    exit_code_for(err)
}

/// The session flag, or a `TTC_PASSWORD` that verifies, opens the gate.
fn gate_open(cfg: &Config) -> bool {
    if SessionFlag::new(&cfg.session_dir).is_set() {
        return true;
    }
    match &cfg.password {
        Some(pw) => AccessGate::new(&cfg.password_hash).verify(pw).is_ok(),
        None => false,
    }
}

fn cmd_login(cfg: &Config) -> Result<i32> {
    eprint!("Password: ");
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("reading password")?;
    let password = line.trim_end_matches(['\r', '\n']);
    match AccessGate::new(&cfg.password_hash).verify(password) {
        Ok(()) => {
            SessionFlag::new(&cfg.session_dir)
                .set()
                .with_context(|| {
                    format!("writing session flag in {}", cfg.session_dir.display())
                })?;
            println!("Access granted.");
            Ok(EXIT_OK)
        }
        Err(err) => {
            eprintln!("{}", err);
            Ok(EXIT_DENIED)
        }
    }
}

fn cmd_logout(cfg: &Config) -> Result<i32> {
    SessionFlag::new(&cfg.session_dir)
        .clear()
        .context("clearing session flag")?;
    println!("Logged out.");
    Ok(EXIT_OK)
}

async fn cmd_lookup(cfg: &Config, args: LookupArgs) -> Result<i32> {
    if !gate_open(cfg) {
        eprintln!("Access denied. Run `ttcplan login` first.");
        return Ok(EXIT_DENIED);
    }
    let fetcher = StaticFetcher::new();
    let session = Session::load(cfg, &fetcher).await;

    let calc = match session.submit(&args.form) {
        Ok(c) => c,
        Err(err) => return Ok(report(&err)),
    };
    let view = calc.view();

    let sop = if args.sop {
        let today = chrono::Local::now().date_naive();
        match session.generate_sop(&calc, today) {
            Ok(doc) => Some(doc),
            Err(err) => return Ok(report(&err)),
        }
    } else {
        None
    };

    if args.json {
        let out = json!({
            "input": calc.form,
            "scenario": calc.record,
            "cones": calc.cones,
            "results": view,
            "sop": sop,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", view);
        if let Some(doc) = &sop {
            println!("{}", doc);
        }
    }
    Ok(EXIT_OK)
}

async fn cmd_manifest(cfg: &Config) -> Result<i32> {
    let fetcher = StaticFetcher::new();
    let session = Session::load(cfg, &fetcher).await;
    for check in [session.table().map(|_| ()), session.templates().map(|_| ())] {
        if let Err(err) = check {
            return Ok(report(&err));
        }
    }
    let out = json!({
        "generated": logging::ts_now(),
        "feeds": session.manifests(),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(EXIT_OK)
}

async fn run(args: &[String]) -> Result<i32> {
    let Some(cmd) = args.get(1) else {
        print_usage();
        return Ok(EXIT_USAGE);
    };
    let cfg = Config::from_env();
    logging::log_command(cmd);
    match cmd.as_str() {
        "login" => cmd_login(&cfg),
        "logout" => cmd_logout(&cfg),
        "lookup" => match parse_lookup_args(&args[2..]) {
            Ok(lookup) => cmd_lookup(&cfg, lookup).await,
            Err(msg) => {
                eprintln!("Error: {}", msg);
                print_usage();
                Ok(EXIT_USAGE)
            }
        },
        "manifest" => cmd_manifest(&cfg).await,
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(EXIT_OK)
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            Ok(EXIT_USAGE)
        }
    }
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let code = match run(&args).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            EXIT_USAGE
        }
    };
    logging::flush();
    process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_lookup_args_both_forms() {
        let args = strings(&[
            "--speed",
            "45",
            "--road-type=2-lane-2-way",
            "--state",
            "FL",
            "--duration",
            "long-term",
            "--control=flagger",
            "--sop",
        ]);
        let parsed = parse_lookup_args(&args).unwrap();
        assert_eq!(parsed.form.speed, "45");
        assert_eq!(parsed.form.road_type, "2-lane-2-way");
        assert_eq!(parsed.form.control, "flagger");
        assert!(parsed.sop);
        assert!(!parsed.json);
        assert_eq!(parsed.form.work_area, None);
    }

    #[test]
    fn test_lookup_args_missing_field() {
        let args = strings(&["--speed", "45", "--state", "FL"]);
        let err = parse_lookup_args(&args).unwrap_err();
        assert!(err.contains("--road-type"));
    }

    #[test]
    fn test_error_hint_by_recoverability() {
        let failed = AppError::LoadFailed {
            feed: ttcplan::error::Feed::Scenarios,
            message: "read data/t.json: not found".to_string(),
        };
        assert!(error_hint(&failed).contains("read data/t.json: not found"));
        assert_eq!(exit_code_for(&failed), EXIT_LOAD);

        let integrity = AppError::DataIntegrity("cone spacing is zero".to_string());
        assert!(error_hint(&integrity).starts_with("Fix the scenario table"));
        assert_eq!(exit_code_for(&integrity), EXIT_LOOKUP);

        let invalid = AppError::Validation(ttcplan::error::ValidationError::UnknownState(
            "ZZ".to_string(),
        ));
        assert!(error_hint(&invalid).starts_with("Adjust the inputs"));
    }

    #[test]
    fn test_lookup_args_dangling_value() {
        assert!(parse_lookup_args(&strings(&["--speed"])).is_err());
        assert!(parse_lookup_args(&strings(&["--colour", "red"])).is_err());
    }
}
