use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the local environment provisioner workspace",
    long_about = "A unified CLI for starting a local DynamoDB, provisioning it,\n\
                  and running CI checks in the provisioner workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start DynamoDB Local in a detached container
    LocalStore {
        /// Host port mapped to the container's port 8000
        #[arg(long, default_value_t = 8000)]
        port: u16,
        /// Container image
        #[arg(long, default_value = "amazon/dynamodb-local")]
        image: String,
        /// Container name
        #[arg(long, default_value = LOCAL_STORE_CONTAINER)]
        name: String,
    },
    /// Stop the DynamoDB Local container
    StopLocalStore {
        /// Container name
        #[arg(long, default_value = LOCAL_STORE_CONTAINER)]
        name: String,
    },
    /// Run the provisioner; remaining arguments are passed through
    Provision {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Ignored tests that need a running DynamoDB Local
    Integration,
    /// Run check + integration
    All,
}

const LOCAL_STORE_CONTAINER: &str = "provision-dynamodb-local";

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn docker(args: &[&str]) -> ExitStatus {
    eprintln!("+ docker {}", args.join(" "));
    Command::new("docker")
        .args(args)
        .status()
        .expect("failed to execute docker")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn run_docker(args: &[&str]) {
    let status = docker(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn start_local_store(port: u16, image: &str, name: &str) {
    step("Start DynamoDB Local");
    let port_mapping = format!("{port}:8000");
    run_docker(&[
        "run",
        "--detach",
        "--rm",
        "--name",
        name,
        "--publish",
        &port_mapping,
        image,
    ]);
    eprintln!("\nDynamoDB Local listening on http://localhost:{port}");
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test provision_core");
    run_cargo(&["test", "-p", "provision_core"]);

    step("Test provision_dynamodb");
    run_cargo(&["test", "-p", "provision_dynamodb"]);
}

fn ci_integration() {
    step("Test provision_dynamodb against DynamoDB Local");
    run_cargo(&[
        "test",
        "-p",
        "provision_dynamodb",
        "--test",
        "dynamodb_local_tests",
        "--",
        "--ignored",
    ]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::LocalStore { port, image, name } => {
            start_local_store(port, &image, &name);
        }
        Commands::StopLocalStore { name } => {
            step("Stop DynamoDB Local");
            run_docker(&["stop", &name]);
        }
        Commands::Provision { args } => {
            let mut cargo_args = vec![
                "run",
                "-p",
                "provision_dynamodb",
                "--bin",
                "provision_local_env",
                "--",
            ];
            cargo_args.extend(args.iter().map(String::as_str));
            run_cargo(&cargo_args);
        }
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Integration => ci_integration(),
                CiJob::All => {
                    ci_check();
                    ci_integration();
                }
            }
            eprintln!("\nCI job passed.");
        }
    }
}
