use std::process;

use anyhow::Result;
use clap::{ArgMatches, Command};

// (label, cargo arguments) for every suite `test all` runs, in order
const SUITES: [(&str, &[&str]); 4] = [
    ("forkify-core", &["test", "--package", "forkify-core"]),
    ("forkify-bin", &["test", "--package", "forkify-bin"]),
    ("documentation", &["test", "--doc", "--package", "forkify-core"]),
    ("workspace", &["test", "--workspace"]),
];

fn main() -> Result<()> {
    let args = clap::command!()
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("install").about("Install forkify binary locally"))
        .subcommand(
            Command::new("run")
                .about("Build and run forkify with arguments")
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .arg(clap::Arg::new("args")
                    .help("Arguments to pass to forkify")
                    .action(clap::ArgAction::Append)
                    .num_args(0..))
        )
        .subcommand(
            Command::new("test")
                .about("Test Operations")
                .subcommand(Command::new("all").about("Run every test suite"))
                .subcommand(Command::new("core").about("Run tests for forkify-core"))
                .subcommand(Command::new("bin").about("Run tests for forkify-bin"))
                .subcommand(Command::new("integration").about("Smoke-test the built binary"))
        )
        .get_matches();

    match args.subcommand() {
        Some(("install", args)) => handle_install_command(args),
        Some(("run", args)) => handle_run_command(args),
        Some(("test", args)) => handle_test_commands(args),
        Some((command, _)) => anyhow::bail!("Unexpected command: {command}"),
        None => anyhow::bail!("Expected subcommand"),
    }
}

fn cargo(args: &[&str]) -> Result<()> {
    let status = process::Command::new("cargo").args(args).status()?;

    if !status.success() {
        anyhow::bail!("cargo {} failed", args.join(" "));
    }
    Ok(())
}

fn handle_install_command(_args: &ArgMatches) -> Result<()> {
    println!("Installing forkify...");
    cargo(&["install", "--path", "crates/forkify-bin"])?;
    println!("✓ forkify installed successfully");
    Ok(())
}

fn handle_run_command(args: &ArgMatches) -> Result<()> {
    let run_args: Vec<&str> = args
        .get_many::<String>("args")
        .map_or(Vec::new(), |vals| vals.map(String::as_str).collect());

    let mut command = vec!["run", "--bin", "forkify", "--"];
    command.extend(run_args);
    cargo(&command)
}

fn handle_test_commands(args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("all", _args)) => test_all(),
        Some(("core", _args)) => cargo(SUITES[0].1),
        Some(("bin", _args)) => cargo(SUITES[1].1),
        Some(("integration", _args)) => test_integration(),
        _ => {
            println!("Available test commands:");
            println!("  all          - Run every test suite");
            println!("  core         - Run tests for forkify-core");
            println!("  bin          - Run tests for forkify-bin");
            println!("  integration  - Smoke-test the built binary");
            Ok(())
        }
    }
}

fn test_all() -> Result<()> {
    let mut failed = Vec::new();

    for (label, args) in SUITES {
        println!("🧪 Running {label} tests...");
        match cargo(args) {
            Ok(()) => println!("✅ {label} tests passed\n"),
            Err(err) => {
                println!("❌ {label} tests failed: {err}\n");
                failed.push(label);
            }
        }
    }

    println!("🔗 Running integration smoke tests...");
    if let Err(err) = test_integration() {
        println!("❌ Integration tests failed: {err}\n");
        failed.push("integration");
    }

    if failed.is_empty() {
        println!("🎉 All tests passed successfully!");
        Ok(())
    } else {
        anyhow::bail!("Test suites failed: {}", failed.join(", "))
    }
}

fn test_integration() -> Result<()> {
    cargo(&["build", "--bin", "forkify"])?;
    cargo(&["run", "--bin", "forkify", "--", "--help"])?;
    cargo(&["run", "--bin", "forkify", "--", "copy-rename", "--help"])?;
    cargo(&["run", "--bin", "forkify", "--", "rules"])?;
    cargo(&["run", "--bin", "forkify", "--", "--version"])
}
