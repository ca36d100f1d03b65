use std::cell::{Cell, RefCell};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use holon_identity_api::{CreateIdentityRequest, HolonIdentityApi, ShowIdentityRequest};
use holon_identity_core::{
    default_cache_dir, list_holons, Clade, HolonEntry, Identity, ListOptions, ReproductionMode,
    ScanProgress, HOLON_DIR_NAME,
};
use serde_json::Value;

mod prompt;

use prompt::Prompter;

const CLI_CONTRACT_VERSION: &str = "cli.v1";
const PROGRESS_EVERY: usize = 500;
const DEFAULT_LANG: &str = "rust";

#[derive(Debug, Parser)]
#[command(name = "who")]
#[command(about = "Holon identity tool: mint, show, and list HOLON.md records")]
struct Cli {
    /// Directory relative paths and lookups are resolved against.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Emit machine-readable JSON instead of text.
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a new holon identity, prompting for anything not given as a flag.
    New(NewArgs),
    /// Print the HOLON.md matching a uuid or uuid prefix.
    Show(ShowArgs),
    /// List local and cached holons.
    List(ListArgs),
}

#[derive(Debug, Args)]
struct NewArgs {
    #[arg(long)]
    given_name: Option<String>,
    #[arg(long)]
    family_name: Option<String>,
    #[arg(long)]
    motto: Option<String>,
    #[arg(long)]
    composer: Option<String>,
    #[arg(long, value_parser = parse_clade)]
    clade: Option<Clade>,
    #[arg(long, value_parser = parse_reproduction)]
    reproduction: Option<ReproductionMode>,
    #[arg(long)]
    lang: Option<String>,
    /// Repeatable.
    #[arg(long = "alias")]
    aliases: Vec<String>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Take defaults for optional values instead of prompting.
    #[arg(long, default_value_t = false)]
    no_prompt: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    uuid: String,
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Directory to list; relative to --root.
    dir: Option<PathBuf>,
    /// Skip the global holon cache.
    #[arg(long, default_value_t = false)]
    no_cache: bool,
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

fn parse_clade(value: &str) -> std::result::Result<Clade, String> {
    Clade::parse(value).ok_or_else(|| {
        let known = Clade::ALL.map(Clade::as_str).join(", ");
        format!("unknown clade `{value}` (expected one of: {known})")
    })
}

fn parse_reproduction(value: &str) -> std::result::Result<ReproductionMode, String> {
    ReproductionMode::parse(value).ok_or_else(|| {
        let known = ReproductionMode::ALL.map(ReproductionMode::as_str).join(", ");
        format!("unknown reproduction mode `{value}` (expected one of: {known})")
    })
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => serde_json::json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let api = HolonIdentityApi::new(cli.root.clone());
    match cli.command {
        Command::New(args) => run_new(&api, args, cli.json),
        Command::Show(args) => run_show(&api, &args, cli.json),
        Command::List(args) => run_list(&cli.root, &args, cli.json),
    }
}

fn run_new(api: &HolonIdentityApi, args: NewArgs, json: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stderr());
    let request = gather_new_request(&mut prompter, args)?;

    let created = api.create_identity(request).context("failed to create holon identity")?;
    if json {
        return emit_json(serde_json::to_value(&created)?);
    }

    println!();
    println!("Born: {}", created.identity.display_name());
    println!("  UUID: {}", created.identity.uuid);
    println!("  File: {}", created.file_path.display());
    Ok(())
}

fn gather_new_request<R, W>(
    prompter: &mut Prompter<R, W>,
    args: NewArgs,
) -> Result<CreateIdentityRequest>
where
    R: io::BufRead,
    W: Write,
{
    let interactive = [&args.family_name, &args.given_name, &args.composer, &args.motto]
        .iter()
        .any(|value| value.is_none());
    if interactive {
        prompter.note("--- New Holon Identity ---")?;
    }

    let family_name = match args.family_name {
        Some(value) => value,
        None => prompter.ask("Family name (the function, e.g. Transcriber, Scout)")?,
    };
    let given_name = match args.given_name {
        Some(value) => value,
        None => prompter.ask("Given name (the character, e.g. Swift, Deep)")?,
    };
    let composer = match args.composer {
        Some(value) => value,
        None => prompter.ask("Composer (who is making this decision?)")?,
    };
    let motto = match args.motto {
        Some(value) => value,
        None => prompter.ask("Motto (the dessein in one sentence)")?,
    };

    let clade = match args.clade {
        Some(clade) => clade,
        None if args.no_prompt => Clade::default(),
        None => prompter.ask_choice(
            "Clade (computational nature)",
            "Choose clade",
            &Clade::ALL,
            Clade::as_str,
        )?,
    };
    let reproduction = match args.reproduction {
        Some(mode) => mode,
        None if args.no_prompt => ReproductionMode::default(),
        None => prompter.ask_choice(
            "Reproduction mode",
            "Choose reproduction mode",
            &ReproductionMode::ALL,
            ReproductionMode::as_str,
        )?,
    };
    let lang = match args.lang {
        Some(lang) => lang,
        None if args.no_prompt => DEFAULT_LANG.to_string(),
        None => prompter.ask_default("Implementation language", DEFAULT_LANG)?,
    };
    let aliases = if !args.aliases.is_empty() || args.no_prompt {
        args.aliases
    } else {
        split_aliases(&prompter.ask_default("Aliases (comma-separated, or empty)", "")?)
    };

    let output_dir = match args.output_dir {
        Some(dir) => Some(dir),
        None if args.no_prompt => None,
        None => {
            let naming = Identity {
                given_name: given_name.clone(),
                family_name: family_name.clone(),
                ..Identity::default()
            };
            let default_dir = Path::new(HOLON_DIR_NAME).join(naming.slug());
            let answer = prompter
                .ask_default("Output directory", &default_dir.display().to_string())?;
            Some(PathBuf::from(answer))
        }
    };

    Ok(CreateIdentityRequest {
        given_name,
        family_name,
        motto,
        composer,
        clade: Some(clade),
        reproduction: Some(reproduction),
        lang: Some(lang),
        aliases,
        output_dir,
    })
}

fn split_aliases(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|alias| !alias.is_empty())
        .map(str::to_string)
        .collect()
}

fn run_show(api: &HolonIdentityApi, args: &ShowArgs, json: bool) -> Result<()> {
    let shown = api.show_identity(&ShowIdentityRequest { uuid: args.uuid.clone() })?;
    if json {
        return emit_json(serde_json::to_value(&shown)?);
    }
    println!("{}", shown.raw_content);
    Ok(())
}

fn run_list(root: &Path, args: &ListArgs, json: bool) -> Result<()> {
    let list_root = match &args.dir {
        Some(dir) if dir.is_absolute() => dir.clone(),
        Some(dir) => root.join(dir),
        None => root.to_path_buf(),
    };
    let cache_dir = if args.no_cache {
        None
    } else {
        args.cache_dir.clone().or_else(default_cache_dir)
    };
    let options = ListOptions { cache_dir, progress_every: PROGRESS_EVERY };
    let progress = ProgressLine::new(io::stderr().is_terminal());

    if json {
        let mut entries = Vec::new();
        list_holons(
            &list_root,
            &options,
            |entry| entries.push(entry),
            |label, scanned| progress.report(label, scanned),
        );
        progress.clear();
        return emit_json(serde_json::json!({ "entries": entries }));
    }

    let table = Table::default();
    let printed = list_holons(
        &list_root,
        &options,
        |entry| {
            progress.clear();
            table.print(&entry);
        },
        |label, scanned| progress.report(label, scanned),
    );
    progress.clear();

    if printed == 0 {
        println!("No holons found.");
    }
    Ok(())
}

/// Scan progress on stderr: redrawn in place on a terminal, one line per
/// report otherwise.
struct ProgressLine {
    inline: bool,
    visible: Cell<bool>,
    last: RefCell<Option<(String, usize)>>,
}

impl ProgressLine {
    fn new(inline: bool) -> Self {
        Self { inline, visible: Cell::new(false), last: RefCell::new(None) }
    }

    fn report(&self, label: &str, progress: ScanProgress) {
        let scanned = progress.scanned_files;
        if scanned == 0 {
            return;
        }
        {
            let mut last = self.last.borrow_mut();
            if last.as_ref().is_some_and(|(seen, count)| seen == label && *count == scanned) {
                return;
            }
            *last = Some((label.to_string(), scanned));
        }

        if self.inline {
            eprint!("\r\x1b[2K[scan] {label}: {scanned} files scanned");
            self.visible.set(true);
        } else {
            eprintln!("[scan] {label}: {scanned} files scanned");
        }
    }

    fn clear(&self) {
        if self.inline && self.visible.replace(false) {
            eprint!("\r\x1b[2K");
        }
    }
}

#[derive(Default)]
struct Table {
    header_printed: Cell<bool>,
}

impl Table {
    fn print(&self, entry: &HolonEntry) {
        if !self.header_printed.replace(true) {
            println!(
                "{:<38} {:<33} {:<8} {:<25} {:<8} PATH",
                "UUID", "NAME", "ORIGIN", "CLADE", "STATUS"
            );
            println!("{}", "─".repeat(150));
        }
        let identity = &entry.identity;
        println!(
            "{:<38} {:<33} {:<8} {:<25} {:<8} {}",
            identity.uuid,
            identity.display_name(),
            entry.origin.as_str(),
            identity.clade,
            identity.status,
            entry.relative_path
        );
    }
}
