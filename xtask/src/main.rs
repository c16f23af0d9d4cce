//! xtask for pollwatch - build automation and tooling
//!
//! This binary provides development tasks like man page, shell completion
//! and default config generation.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "xtask", about = "Build automation for pollwatch")]
enum Task {
    /// Generate man pages from clap definitions
    GenerateManPages {
        /// Output directory for man pages (default: ./man)
        #[arg(short, long, default_value = "man")]
        output: PathBuf,
    },
    /// Generate shell completion scripts for every supported shell
    GenerateCompletions {
        /// Output directory for completion scripts (default: ./completions)
        #[arg(short, long, default_value = "completions")]
        output: PathBuf,
    },
    /// Write a config file holding every default value
    GenerateConfig {
        /// Output file (default: ./config.toml)
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let task = Task::parse();

    match task {
        Task::GenerateManPages { output } => generate_man_pages(&output)?,
        Task::GenerateCompletions { output } => generate_completions(&output)?,
        Task::GenerateConfig { output } => generate_config(&output)?,
    }

    Ok(())
}

fn generate_man_pages(output_dir: &Path) -> Result<()> {
    println!("Generating man pages...");

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let cmd = pollwatch::cli::Cli::command();

    let man_path = output_dir.join("pollwatch.1");
    let man_file = fs::File::create(&man_path)
        .with_context(|| format!("Failed to create man page: {}", man_path.display()))?;

    clap_mangen::Man::new(cmd).render(&mut std::io::BufWriter::new(man_file))?;

    println!("✓ Generated: {}", man_path.display());
    println!("\nTo view the man page:");
    println!("  man {}/pollwatch.1", output_dir.display());

    Ok(())
}

fn generate_completions(output_dir: &Path) -> Result<()> {
    println!("Generating shell completions...");

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create directory: {}", output_dir.display()))?;

    let mut cmd = pollwatch::cli::Cli::command();
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
        let path = clap_complete::generate_to(shell, &mut cmd, "pollwatch", output_dir)
            .with_context(|| format!("Failed to generate {shell} completions"))?;
        println!("✓ Generated: {}", path.display());
    }

    Ok(())
}

fn generate_config(path: &Path) -> Result<()> {
    pollwatch::config::Config::default()
        .save(path)
        .with_context(|| format!("Failed to write config: {}", path.display()))?;

    println!("✓ Generated: {}", path.display());
    if let Some(default) = pollwatch::config::Config::default_path() {
        println!("\nCopy it to {} to use it by default.", default.display());
    }

    Ok(())
}
