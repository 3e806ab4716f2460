use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use doc_model::{AnnotationId, LayerFilter, MissingPagePolicy, Role, ViewerAction};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use storage::{Preferences, Storage};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use viewer_core::{effective_top, ExportFormat, ReadingOrderOptions, Session};

const LOG_ENV: &str = "LAYERVIEW_LOG";

#[derive(Debug, Parser)]
#[command(name = "layerview")]
#[command(about = "Layer-aware review of PDF annotations")]
pub struct Cli {
    /// Directory holding preferences.json (defaults to the platform data directory).
    #[arg(long, global = true, env = "LAYERVIEW_CONFIG_DIR", value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print annotations of a snapshot in reading order.
    Order {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,
        /// Take page sizes and rotations from this PDF instead of the snapshot.
        #[arg(long, value_name = "FILE")]
        pdf: Option<PathBuf>,
        /// Fail on annotations whose page is not in the document.
        #[arg(long)]
        strict_pages: bool,
    },
    /// Export the annotations that survive review, in reading order.
    Consolidate {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,
        /// Layer to export, a role name or `all`.
        #[arg(long, value_name = "ROLE")]
        layer: Option<LayerFilter>,
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Print a plain-text notes report.
    Notes {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,
        #[arg(long, value_name = "ROLE")]
        layer: Option<LayerFilter>,
        #[arg(long, value_name = "FILE")]
        pdf: Option<PathBuf>,
    },
    /// Print machine-readable PDF page metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Show or change stored preferences.
    Prefs {
        #[command(subcommand)]
        action: PrefsCommand,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Subcommand)]
enum PrefsCommand {
    Show,
    Set {
        /// Role new annotations are attributed to.
        #[arg(long)]
        role: Option<String>,
        #[arg(long, value_name = "ROLE")]
        layer: Option<LayerFilter>,
        #[arg(long, value_enum)]
        missing_page: Option<MissingPageArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for ExportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Json => ExportFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MissingPageArg {
    ZeroSized,
    Reject,
}

impl From<MissingPageArg> for MissingPagePolicy {
    fn from(value: MissingPageArg) -> Self {
        match value {
            MissingPageArg::ZeroSized => MissingPagePolicy::ZeroSized,
            MissingPageArg::Reject => MissingPagePolicy::Reject,
        }
    }
}

#[derive(Debug, Serialize)]
struct OrderEntry {
    id: AnnotationId,
    page: u32,
    effective_top: f64,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    pages: Vec<PageOutput>,
}

#[derive(Debug, Serialize)]
struct PageOutput {
    page: u32,
    width: f64,
    height: f64,
    rotation: i32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging();

    let config_dir = cli.config_dir.as_deref();
    match cli.command {
        Commands::Order { snapshot, pdf, strict_pages } => {
            run_order(&storage(config_dir)?, &snapshot, pdf.as_deref(), strict_pages)
        }
        Commands::Consolidate { snapshot, layer, format, output } => run_consolidate(
            &storage(config_dir)?,
            &snapshot,
            layer,
            format.into(),
            output.as_deref(),
        ),
        Commands::Notes { snapshot, layer, pdf } => {
            run_notes(&storage(config_dir)?, &snapshot, layer, pdf.as_deref())
        }
        Commands::Info { file } => run_info(&file),
        Commands::Prefs { action } => run_prefs(&storage(config_dir)?, action),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn storage(config_dir: Option<&Path>) -> Result<Storage> {
    match config_dir {
        Some(dir) => Ok(Storage::with_root(dir)),
        None => Storage::from_default_project().context("failed to locate preferences"),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

/// Build a session from stored preferences and a snapshot file.
fn open_session(
    storage: &Storage,
    snapshot: &Path,
    layer: Option<LayerFilter>,
    pdf: Option<&Path>,
    strict_pages: bool,
) -> Result<Session> {
    ensure_file_exists(snapshot)?;
    let preferences = load_preferences(storage)?;

    let mut options = ReadingOrderOptions { missing_page: preferences.missing_page };
    if strict_pages {
        options = ReadingOrderOptions::strict();
    }

    let mut session = Session::new(preferences.viewer_state()).with_options(options);
    session.manager_mut().set_display_authors(preferences.display_authors);
    if let Some(filter) = layer {
        session.dispatch(ViewerAction::SetLayerFilter { filter });
    }

    let document = storage::load_snapshot(snapshot)
        .with_context(|| format!("failed to read snapshot {}", snapshot.display()))?;
    session.open_snapshot(document);

    if let Some(pdf) = pdf {
        ensure_file_exists(pdf)?;
        let pages = pdf_engine::read_page_table(pdf).context("failed to open PDF")?;
        debug!(pages = pages.pages().len(), "using page metadata from PDF");
        session.set_pages(pages);
    }

    Ok(session)
}

fn load_preferences(storage: &Storage) -> Result<Preferences> {
    storage.load_preferences().with_context(|| {
        format!("failed to load preferences from {}", storage.preferences_path().display())
    })
}

fn run_order(storage: &Storage, snapshot: &Path, pdf: Option<&Path>, strict: bool) -> Result<()> {
    let session = open_session(storage, snapshot, None, pdf, strict)?;
    let ordered = session.in_reading_order().context("failed to order annotations")?;

    let mut entries = Vec::with_capacity(ordered.len());
    for annotation in ordered {
        let top = effective_top(annotation, session.pages(), session.options())?;
        entries.push(OrderEntry {
            id: annotation.id,
            page: annotation.page,
            effective_top: round(top),
        });
    }

    let json = serde_json::to_string_pretty(&entries)?;
    println!("{json}");
    Ok(())
}

fn run_consolidate(
    storage: &Storage,
    snapshot: &Path,
    layer: Option<LayerFilter>,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let session = open_session(storage, snapshot, layer, None, false)?;
    let selected = session.consolidated().context("failed to order annotations")?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            viewer_core::export_annotations(BufWriter::new(file), &selected, format)?;
            println!("{}", path.display());
        }
        None => {
            let stdout = io::stdout();
            viewer_core::export_annotations(stdout.lock(), &selected, format)?;
        }
    }

    Ok(())
}

fn run_notes(
    storage: &Storage,
    snapshot: &Path,
    layer: Option<LayerFilter>,
    pdf: Option<&Path>,
) -> Result<()> {
    let session = open_session(storage, snapshot, layer, pdf, false)?;
    let notes = session.notes().context("failed to order annotations")?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(viewer_core::render_notes(&notes).as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn run_info(file: &Path) -> Result<()> {
    ensure_file_exists(file)?;

    let table = pdf_engine::read_page_table(file).context("failed to open PDF")?;
    let pages = table
        .pages()
        .iter()
        .zip(1..)
        .map(|(record, page)| PageOutput {
            page,
            width: record.width,
            height: record.height,
            rotation: record.rotation,
        })
        .collect::<Vec<_>>();

    let payload =
        InfoOutput { path: file.display().to_string(), page_count: pages.len() as u32, pages };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");
    Ok(())
}

fn run_prefs(storage: &Storage, action: PrefsCommand) -> Result<()> {
    let mut preferences = load_preferences(storage)?;

    if let PrefsCommand::Set { role, layer, missing_page } = action {
        if let Some(role) = role {
            let role = Role::new(role).context("invalid --role")?;
            if !preferences.roles.contains(&role) {
                anyhow::bail!(
                    "unknown role {role}; expected one of: {}",
                    join_roles(&preferences.roles)
                );
            }
            preferences.current_role = Some(role);
        }
        if let Some(layer) = layer {
            if let LayerFilter::Only(role) = &layer {
                if !preferences.roles.contains(role) {
                    anyhow::bail!(
                        "unknown layer {role}; expected all or one of: {}",
                        join_roles(&preferences.roles)
                    );
                }
            }
            preferences.layer_filter = layer;
        }
        if let Some(policy) = missing_page {
            preferences.missing_page = policy.into();
        }

        storage.save_preferences(&preferences).with_context(|| {
            format!("failed to save preferences to {}", storage.preferences_path().display())
        })?;
    }

    let json = serde_json::to_string_pretty(&preferences)?;
    println!("{json}");
    Ok(())
}

fn join_roles(roles: &[Role]) -> String {
    roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
}

fn ensure_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

// Three decimals, with negative zero folded into zero.
fn round(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0 + 0.0
}
