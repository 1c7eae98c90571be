// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! MBEE JMI CLI
//!
//! Converts model record collections between JMI shapes and flattens element
//! hierarchies into package-first export order.
//!
//! # Usage
//! ```text
//! mbee-jmi convert --from 1 --to 3 elements.json
//! mbee-jmi flatten --sort-by name --outline < elements.json
//! mbee-jmi config show
//! ```
//!
//! Results are written to stdout as JSON, logs go to stderr. Exit codes: `0`
//! success, `1` invalid data, `2` unsupported conversion, `3` I/O or config
//! failure.

// The CLI is expected to print to stdout/stderr.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mbee_app_core::config::{ConfigService, ConfigStore};
use mbee_app_core::prefs::{JmiPrefs, JMI_PREFS_KEY};
use mbee_config_fs::FsConfigStore;
use mbee_jmi::{
    convert_jmi, records_from_value, ElementTree, FieldPath, Jmi, JmiError, NonPackagePolicy,
    RootPolicy,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Log debug output to stderr
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Directory holding saved preferences (defaults to the platform config dir)
    #[clap(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Command to execute
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert JMI data between types (1→2, 1→3, 2→1, 3→1)
    Convert(ConvertArgs),
    /// Flatten a JMI type 1 element list into package-first order
    Flatten(FlattenArgs),
    /// Show or reset saved preferences
    Config {
        #[clap(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct FieldArgs {
    /// Field holding each record's unique key
    #[clap(long)]
    key_field: Option<FieldPath>,

    /// Field holding the parent's key
    #[clap(long)]
    parent_field: Option<FieldPath>,

    /// What to do when several records have no parent
    #[clap(long, value_enum)]
    roots: Option<RootArg>,
}

#[derive(clap::Args, Debug)]
struct ConvertArgs {
    /// Source JMI type
    #[clap(long)]
    from: u8,

    /// Target JMI type
    #[clap(long)]
    to: u8,

    #[clap(flatten)]
    fields: FieldArgs,

    /// Write compact JSON instead of indented
    #[clap(long)]
    compact: bool,

    /// Input JSON file (stdin when omitted)
    input: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct FlattenArgs {
    #[clap(flatten)]
    fields: FieldArgs,

    /// Field holding the element type
    #[clap(long)]
    type_field: Option<FieldPath>,

    /// Sort siblings by this field instead of input order
    #[clap(long)]
    sort_by: Option<FieldPath>,

    /// Drop elements contained by non-packages instead of failing
    #[clap(long)]
    allow_non_package_parents: bool,

    /// Print an indented outline of keys instead of JSON
    #[clap(long)]
    outline: bool,

    /// Input JSON file (stdin when omitted)
    input: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective preferences
    Show,
    /// Delete saved preferences
    Reset,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RootArg {
    Reject,
    First,
    Last,
}

impl From<RootArg> for RootPolicy {
    fn from(arg: RootArg) -> Self {
        match arg {
            RootArg::Reject => Self::Reject,
            RootArg::First => Self::FirstWins,
            RootArg::Last => Self::LastWins,
        }
    }
}

/// Parsing and dropping deeply nested JSON recurses once per level.
const WORKER_STACK: usize = 512 * 1024 * 1024;

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {err}");
    }

    let Args { config_dir, cmd, .. } = args;
    let result = thread::Builder::new()
        .name("mbee-jmi".into())
        .stack_size(WORKER_STACK)
        .spawn(move || {
            open_service(config_dir.as_deref())
                .and_then(|service| run(cmd, &service, &mut io::stdout().lock()))
        })
        .context("spawning worker thread")
        .and_then(|worker| {
            worker
                .join()
                .unwrap_or_else(|_| Err(anyhow!("worker thread panicked")))
        });
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn open_service(dir: Option<&Path>) -> Result<ConfigService<FsConfigStore>> {
    let store = match dir {
        Some(dir) => FsConfigStore::at(dir),
        None => FsConfigStore::new(),
    }
    .context("opening preferences store")?;
    debug!(base = %store.base().display(), "preferences store ready");
    Ok(ConfigService::new(store))
}

fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<JmiError>() {
        return if e.status() == 501 { 2 } else { 1 };
    }
    match err.downcast_ref::<serde_json::Error>() {
        Some(e) if !e.is_io() => 1,
        _ => 3,
    }
}

fn run<S: ConfigStore>(
    cmd: Command,
    service: &ConfigService<S>,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        Command::Convert(args) => {
            let prefs = apply_fields(service.load_jmi_prefs()?, &args.fields);
            let data = read_input(args.input.as_deref())?;
            let converted = convert_jmi(args.from, args.to, data, &prefs.tree_options())?;
            write_jmi(out, &converted, args.compact)
        }
        Command::Flatten(args) => flatten(args, service, out),
        Command::Config { action } => match action {
            ConfigAction::Show => write_json(out, &service.load_jmi_prefs()?),
            ConfigAction::Reset => {
                service.reset(JMI_PREFS_KEY)?;
                info!("saved preferences removed");
                Ok(())
            }
        },
    }
}

fn flatten<S: ConfigStore>(
    args: FlattenArgs,
    service: &ConfigService<S>,
    out: &mut impl Write,
) -> Result<()> {
    let mut prefs = apply_fields(service.load_jmi_prefs()?, &args.fields);
    if let Some(type_field) = args.type_field {
        prefs.elements.type_field = type_field;
    }
    if args.allow_non_package_parents {
        prefs = prefs.with_non_package(NonPackagePolicy::Drop);
    }
    let options = prefs.element_options();

    let records = records_from_value(read_input(args.input.as_deref())?)?;
    let mut tree = ElementTree::build(records, &options)?;
    if let Some(field) = args.sort_by.or(prefs.sort_by) {
        tree.sort_children_by(&field);
    }

    if args.outline {
        for (depth, key) in tree.keys() {
            writeln!(out, "{}{key}", "  ".repeat(depth))?;
        }
        Ok(())
    } else {
        write_json(out, &tree.flatten())
    }
}

fn apply_fields(mut prefs: JmiPrefs, fields: &FieldArgs) -> JmiPrefs {
    if let Some(key_field) = &fields.key_field {
        prefs.elements.tree.key_field = key_field.clone();
    }
    if let Some(parent_field) = &fields.parent_field {
        prefs.elements.tree.parent_field = parent_field.clone();
    }
    if let Some(roots) = fields.roots {
        prefs = prefs.with_roots(roots.into());
    }
    prefs
}

fn read_input(path: Option<&Path>) -> Result<Value> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
            parse_json(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
        }
        None => parse_json(io::stdin().lock()).context("parsing stdin"),
    }
}

/// One JSON document, without serde_json's nesting limit so deep JMI type 3
/// trees load.
fn parse_json(reader: impl io::Read) -> serde_json::Result<Value> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    de.disable_recursion_limit();
    let value = Value::deserialize(&mut de)?;
    de.end()?;
    Ok(value)
}

fn write_jmi(out: &mut impl Write, jmi: &Jmi, compact: bool) -> Result<()> {
    if compact {
        jmi.to_writer(&mut *out)?;
    } else {
        jmi.to_writer_pretty(&mut *out)?;
    }
    writeln!(out)?;
    Ok(())
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
