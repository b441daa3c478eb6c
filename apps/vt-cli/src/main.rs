//! vt-cli: demo/debug harness over a built-in variable tree.
//!
//! Assembles a demo tree (PRBS transmitter/receiver over a simulated core,
//! plus data writer and run-control devices) and exposes the generic tree
//! operations against it: dump, bulk read, get/set by dotted path, config
//! save/load.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use vt_devices::{PrbsCore, SimPrbsCore, SimWriterCore, data_writer, prbs_rx, prbs_tx, run_control};
use vt_tree::{Device, Mode, Node, OpFailure, Root};

#[derive(Parser)]
#[command(name = "vt-cli")]
#[command(about = "Variable tree demo harness", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the visible tree with modes, values and units
    Dump,
    /// Force-read the whole tree, then print it
    ReadAll,
    /// Print one variable by dotted path (e.g. prbsTx.txSize)
    Get {
        /// Dotted variable path
        path: String,
    },
    /// Set one variable by dotted path from its display form, then print it
    Set {
        /// Dotted variable path
        path: String,
        /// Display-form value (label for enums, text for the rest)
        value: String,
    },
    /// Save the read-write variables to a config file (.yml or .json)
    SaveConfig {
        /// Output config file path
        file: PathBuf,
    },
    /// Load a config file into the tree, reporting per-variable failures
    LoadConfig {
        /// Input config file path
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let root = demo_root()?;

    match cli.command {
        Commands::Dump => cmd_dump(&root),
        Commands::ReadAll => cmd_read_all(&root),
        Commands::Get { path } => cmd_get(&root, &path)?,
        Commands::Set { path, value } => cmd_set(&root, &path, &value)?,
        Commands::SaveConfig { file } => {
            root.write_config(&file)?;
            println!("✓ Saved config: {}", file.display());
        }
        Commands::LoadConfig { file } => {
            let failures = root.read_config(&file)?;
            report_failures(&failures);
            println!("✓ Loaded config: {}", file.display());
            cmd_dump(&root);
        }
    }
    Ok(())
}

/// Demo tree: one simulated PRBS core shared by a transmitter and a
/// receiver, plus data writer and run-control devices. A little traffic is
/// pre-generated so a bulk read has something to show.
fn demo_root() -> Result<Root, Box<dyn Error>> {
    let core = Arc::new(SimPrbsCore::new());
    core.gen_frame(1000);
    core.gen_frame(1000);
    core.gen_frame(1000);
    core.inject_rx_error();

    let top = Device::new("demo");
    top.add_device(prbs_tx("prbsTx", core.clone())?)?;
    top.add_device(prbs_rx("prbsRx", core)?)?;
    top.add_device(data_writer("dataWriter", Arc::new(SimWriterCore::new()))?)?;
    top.add_device(run_control("runControl")?)?;
    Ok(Root::new(top)?)
}

fn cmd_dump(root: &Root) {
    println!(
        "{:<28} {:<4} {:<7} {:<16} {}",
        "Variable", "Mode", "Type", "Value", "Units"
    );
    dump_device(root.device(), "");
}

fn dump_device(device: &Device, prefix: &str) {
    for node in device.visible_children() {
        match node {
            Node::Variable(variable) => {
                if variable.mode() == Mode::Command {
                    continue;
                }
                let path = join(prefix, variable.name());
                let value = variable
                    .get_disp(false)
                    .unwrap_or_else(|error| format!("<{error}>"));
                println!(
                    "{:<28} {:<4} {:<7} {:<16} {}",
                    path,
                    variable.mode().as_str(),
                    variable.kind().to_string(),
                    value,
                    variable.units().unwrap_or("")
                );
            }
            Node::Device(child) => {
                dump_device(&child, &join(prefix, child.name()));
            }
        }
    }
}

fn cmd_read_all(root: &Root) {
    let failures = root.read_all();
    report_failures(&failures);
    cmd_dump(root);
}

fn cmd_get(root: &Root, path: &str) -> Result<(), Box<dyn Error>> {
    let variable = root.variable(path)?;
    println!("{} = {} (raw: {})", path, variable.get_disp(false)?, variable.get());
    Ok(())
}

fn cmd_set(root: &Root, path: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let variable = root.variable(path)?;
    variable.set_disp(value)?;
    println!("✓ {} = {}", path, variable.get_disp(false)?);
    Ok(())
}

fn report_failures(failures: &[OpFailure]) {
    for failure in failures {
        eprintln!("  ! {}: {}", failure.path, failure.error);
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
