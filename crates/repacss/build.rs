use std::error::Error;
use std::fs;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::Shell;

// cli.rs only depends on clap + clap_complete, both build-dependencies.
#[path = "src/cli.rs"]
mod cli;

fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo::rerun-if-changed=src/cli.rs");

    let out_dir = std::env::var_os("OUT_DIR").ok_or("OUT_DIR not set by Cargo")?;
    let out_dir = Path::new(&out_dir);

    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir)?;
    write_manpages(&cli::Cli::command(), &man_dir)?;

    let completion_dir = out_dir.join("completions");
    fs::create_dir_all(&completion_dir)?;
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        clap_complete::generate_to(shell, &mut cli::Cli::command(), "repacss", &completion_dir)?;
    }
    Ok(())
}

/// One page per visible command, named `repacss-<sub>-<subsub>.1`.
fn write_manpages(cmd: &clap::Command, dir: &Path) -> Result<(), Box<dyn Error>> {
    let name = cmd.get_name().to_owned();
    let mut page = Vec::new();
    clap_mangen::Man::new(cmd.clone()).render(&mut page)?;
    fs::write(dir.join(format!("{name}.1")), page)?;

    for sub in cmd.get_subcommands().filter(|s| !s.is_hide_set()) {
        let sub = sub.clone().name(format!("{name}-{}", sub.get_name()));
        write_manpages(&sub, dir)?;
    }
    Ok(())
}
