use std::process;

use afo_core::command::{Command, Response};
use afo_core::socket;

mod cli;

#[cfg(target_os = "linux")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    let args = cli::parse();

    let cmd: Command = args.command.into();
    let resp = match socket::process_cmd(&args.socket_path, &cmd).await {
        Ok(resp) => resp,
        Err(err) => {
            eprintln!("Error processing command: {err}");
            process::exit(exitcode::UNAVAILABLE);
        }
    };

    if args.json {
        json_print(&resp)
    } else {
        pretty_print(&resp)
    }

    process::exit(determine_exitcode(&resp));
}

fn json_print(resp: &Response) {
    match serde_json::to_string_pretty(resp) {
        Ok(s) => println!("{s}"),
        Err(err) => eprintln!("Error serializing response to JSON: {err}"),
    }
}

fn pretty_print(resp: &Response) {
    match resp {
        Response::NetworkContext(ctx) => {
            println!("Host: {}", ctx.hostname);
            for iface in &ctx.interfaces {
                println!(
                    "  {} [{:?}] mtu={} ipv4={:?} ipv6={:?}",
                    iface.name, iface.state, iface.mtu, iface.ipv4_addresses, iface.ipv6_addresses
                );
            }
        }
        Response::ValidationResult(result) => {
            println!("valid: {}", result.valid);
            for err in &result.errors {
                eprintln!("error: {err}");
            }
            for warn in &result.warnings {
                println!("warning: {warn}");
            }
        }
        Response::ConflictReport(report) => {
            if !report.has_conflicts {
                println!("No conflicts detected.");
            }
            for conflict in &report.conflicts {
                println!(
                    "{:?}: {} (existing: {})",
                    conflict.kind, conflict.explanation, conflict.existing_rule
                );
            }
            for rec in &report.recommendations {
                println!("recommendation: {rec}");
            }
        }
        Response::DeploymentResult(result) => {
            println!("{:?} rule={} success={}", result.status, result.rule_id, result.success);
            if let Some(err) = &result.error {
                eprintln!("error: {err}");
            }
            if let Some(path) = &result.backup_path {
                println!("backup: {path}");
            }
        }
        Response::Confirmation { success, rule_id } => {
            println!("confirmed rule={rule_id} success={success}");
        }
        Response::Error(message) => {
            eprintln!("error: {message}");
        }
    }
}

fn determine_exitcode(resp: &Response) -> exitcode::ExitCode {
    match resp {
        Response::Error(_) => exitcode::SOFTWARE,
        Response::ValidationResult(result) if !result.valid => exitcode::DATAERR,
        Response::DeploymentResult(result) if !result.success => exitcode::SOFTWARE,
        Response::Confirmation { success: false, .. } => exitcode::SOFTWARE,
        _ => exitcode::OK,
    }
}
