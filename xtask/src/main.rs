use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for voxblast")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates, warnings denied
    Clippy,
    /// Run all tests
    Test,
    /// Run the explosion benchmarks
    Bench,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Run the CLI determinism replay for a range of seeds
    Replay {
        #[arg(long, default_value = "8")]
        seeds: u64,
    },
}

/// Run `cargo` with `args`, failing with `what` if it exits non-zero.
fn cargo(what: &str, args: &[&str]) -> Result<()> {
    println!("==> {what}: cargo {}", args.join(" "));
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{what} failed ({status})");
    }
    Ok(())
}

fn fmt() -> Result<()> {
    cargo("format check", &["fmt", "--all", "--", "--check"])
}

fn clippy() -> Result<()> {
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    )
}

fn test() -> Result<()> {
    cargo("tests", &["test", "--workspace"])
}

fn doc() -> Result<()> {
    cargo("rustdoc", &["doc", "--workspace", "--no-deps"])
}

fn replay(seeds: u64) -> Result<()> {
    for seed in 0..seeds {
        println!("==> replay: seed {seed}");
        let seed = seed.to_string();
        let output = Command::new("cargo")
            .args(["run", "-q", "-p", "voxblast-cli", "--", "replay", "--seed", &seed])
            .output()?;
        if !output.status.success() {
            anyhow::bail!("voxblast-cli replay failed for seed {seed}");
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.contains("Match: OK") {
            anyhow::bail!("seed {seed} diverged:\n{stdout}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Commands::Check => {
            fmt()?;
            clippy()?;
            test()?;
            doc()?;
        }
        Commands::Fmt => fmt()?,
        Commands::Clippy => clippy()?,
        Commands::Test => test()?,
        Commands::Bench => cargo(
            "benchmarks",
            &["bench", "-p", "voxblast-explosion", "--bench", "bench_ray_trace"],
        )?,
        Commands::Doc => doc()?,
        Commands::Build => cargo("build", &["build", "--workspace"])?,
        Commands::Replay { seeds } => replay(seeds)?,
    }
    Ok(())
}
