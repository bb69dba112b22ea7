//! The `a0` command-line front-end.
//!
//! Thin by design: argument handling, file I/O, policy-file resolution,
//! trace wiring, and the exit-status mapping. All language behavior lives
//! in the `a0` library crate.
//!
//! ```text
//! a0 run <file> [--policy <file>] [--trace <file>] [--run-id <id>]
//!               [--unsafe-allow-all] [--json-errors]
//! a0 check <file> [--json-errors]
//! ```

use std::{
    env, fs,
    io::BufWriter,
    path::{Path, PathBuf},
    process::ExitCode,
};

use a0::{
    CancelToken, Diagnostic, ExecOptions, Runner, StdlibRegistry, ToolRegistry,
    capability::{CapabilitySet, Policy},
    tracer::WriterSink,
};

/// Project-local policy file, consulted before the user-level one.
const PROJECT_POLICY_FILE: &str = "a0.policy.json";

const USAGE: &str = "usage: a0 <run|check> <file> [--policy <file>] [--trace <file>] \
[--run-id <id>] [--unsafe-allow-all] [--json-errors]";

struct CliArgs {
    command: String,
    file: String,
    policy: Option<PathBuf>,
    trace: Option<PathBuf>,
    run_id: Option<String>,
    unsafe_allow_all: bool,
    json_errors: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let command = args.next().ok_or(USAGE)?;
    if !matches!(command.as_str(), "run" | "check") {
        return Err(format!("unknown command `{command}`\n{USAGE}"));
    }
    let file = args.next().ok_or(USAGE)?;
    let mut parsed = CliArgs {
        command,
        file,
        policy: None,
        trace: None,
        run_id: None,
        unsafe_allow_all: false,
        json_errors: false,
    };
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--policy" => {
                parsed.policy = Some(PathBuf::from(args.next().ok_or("--policy requires a path")?));
            }
            "--trace" => {
                parsed.trace = Some(PathBuf::from(args.next().ok_or("--trace requires a path")?));
            }
            "--run-id" => {
                parsed.run_id = Some(args.next().ok_or("--run-id requires a value")?);
            }
            "--unsafe-allow-all" => parsed.unsafe_allow_all = true,
            "--json-errors" => parsed.json_errors = true,
            other => return Err(format!("unknown flag `{other}`\n{USAGE}")),
        }
    }
    Ok(parsed)
}

fn main() -> ExitCode {
    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };

    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read `{}`: {err}", args.file);
            return ExitCode::FAILURE;
        }
    };

    // The CLI installs no tools by default; embedding hosts register their
    // own. Validation still runs tool-independent checks.
    let tools = ToolRegistry::new();

    let runner = match Runner::new(&source, &args.file, &tools) {
        Ok(runner) => runner,
        Err(diags) => {
            report_diagnostics(&diags, args.json_errors);
            return ExitCode::from(2);
        }
    };

    if args.command == "check" {
        println!("ok: {}", args.file);
        return ExitCode::SUCCESS;
    }

    let (caps, budget_ceiling) = match resolve_policy(&args) {
        Ok(resolved) => resolved,
        Err(message) => {
            eprintln!("error: {message}");
            return ExitCode::FAILURE;
        }
    };

    let stdlib = StdlibRegistry::with_defaults();
    let mut opts = ExecOptions::new(&tools, &stdlib).with_caps(caps);
    if let Some(ceiling) = budget_ceiling {
        opts = opts.with_budget_ceiling(ceiling);
    }
    if let Some(run_id) = &args.run_id {
        opts = opts.with_run_id(run_id.clone());
    }

    let mut trace_sink = match &args.trace {
        Some(path) => match fs::File::create(path) {
            Ok(file) => Some(WriterSink::new(BufWriter::new(file))),
            Err(err) => {
                eprintln!("error: cannot create trace file `{}`: {err}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };
    if let Some(sink) = trace_sink.as_mut() {
        opts = opts.with_trace(sink);
    }

    match runner.execute(opts, &CancelToken::new()) {
        Ok(outcome) => {
            match serde_json::to_string_pretty(&outcome) {
                Ok(rendered) => println!("{rendered}"),
                Err(err) => {
                    eprintln!("error: cannot render result: {err}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::from(outcome.exit_status())
        }
        Err(error) => {
            if args.json_errors {
                match serde_json::to_string(&error) {
                    Ok(line) => eprintln!("{line}"),
                    Err(_) => eprintln!("{error}"),
                }
            } else {
                eprintln!("{error}");
            }
            ExitCode::from(error.code.exit_status())
        }
    }
}

/// Resolution order: `--unsafe-allow-all`, then an explicit `--policy`
/// file, then the project-local file, then the user-level file, then
/// deny-all.
fn resolve_policy(args: &CliArgs) -> Result<(CapabilitySet, Option<a0::Budget>), String> {
    if args.unsafe_allow_all {
        return Ok((CapabilitySet::unrestricted(), None));
    }
    if let Some(path) = &args.policy {
        let policy = load_policy(path)?;
        return Ok((policy.resolve(), policy.limits));
    }
    for candidate in [PathBuf::from(PROJECT_POLICY_FILE), user_policy_path()] {
        if candidate.as_os_str().is_empty() || !candidate.exists() {
            continue;
        }
        let policy = load_policy(&candidate)?;
        return Ok((policy.resolve(), policy.limits));
    }
    Ok((CapabilitySet::none(), None))
}

fn user_policy_path() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".a0").join("policy.json"),
        None => PathBuf::new(),
    }
}

fn load_policy(path: &Path) -> Result<Policy, String> {
    let text = fs::read_to_string(path).map_err(|err| format!("cannot read policy `{}`: {err}", path.display()))?;
    Policy::from_json(&text).map_err(|err| format!("invalid policy `{}`: {err}", path.display()))
}

fn report_diagnostics(diags: &[Diagnostic], json: bool) {
    for diag in diags {
        if json {
            match serde_json::to_string(diag) {
                Ok(line) => eprintln!("{line}"),
                Err(_) => eprintln!("{diag}"),
            }
        } else {
            eprintln!("{}", diag.pretty());
        }
    }
}
