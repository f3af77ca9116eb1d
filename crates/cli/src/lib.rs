use annotator_core::{DocumentInfo, DocumentSession};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use doc_model::{AnnotationDraft, Preferences};
use pdf_engine::{LopdfEngine, RasterConfig};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use storage::Storage;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "pdf-annotator")]
#[command(about = "Annotate PDFs with text labels and lines")]
pub struct Cli {
    /// Config file to use instead of the per-user config.json.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render one page to a PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = doc_model::DEFAULT_SCALE)]
        scale: f64,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Add annotations from a JSON file and export the annotated PDF.
    Annotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// JSON array of text and line annotations.
        #[arg(long, value_name = "JSON")]
        annotations: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the effective configuration.
    Config {
        /// Also write it to the config file.
        #[arg(long)]
        write_default: bool,
    },
    /// Print CLI version.
    Version,
}

// Fields are alphabetical so the JSON reads the same with or without
// order-preserving maps.
#[derive(Debug, Serialize)]
struct InfoOutput {
    page_count: u32,
    pages: Vec<PageSizeOutput>,
    path: String,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    height: f32,
    width: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Info { file } => run_info(&file, config),
        Commands::Render { file, page, scale, output } => {
            run_render(&file, page, scale, output.as_deref(), config)
        }
        Commands::Annotate { file, annotations, output } => {
            run_annotate(&file, &annotations, output.as_deref(), config)
        }
        Commands::Config { write_default } => run_config(write_default, config),
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_preferences(config: Option<&Path>) -> Result<Preferences> {
    let preferences = match config {
        Some(path) => storage::load_from_path(path),
        None => Storage::from_default_project()?.load_preferences(),
    };
    preferences.context("failed to load config")
}

/// Build the rasterizer and session from the loaded configuration.
fn open_session(
    file: &Path,
    config: Option<&Path>,
) -> Result<(DocumentSession<LopdfEngine>, DocumentInfo)> {
    ensure_pdf_exists(file)?;

    let preferences = load_preferences(config)?;
    let engine =
        LopdfEngine::with_config(RasterConfig { max_pixels: preferences.max_raster_pixels });
    let mut session = DocumentSession::new(engine, preferences);

    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let document = session.load(&bytes).context("failed to open PDF")?;
    Ok((session, document))
}

fn run_info(file: &Path, config: Option<&Path>) -> Result<()> {
    let (_, document) = open_session(file, config)?;

    let payload = InfoOutput {
        page_count: document.total_pages,
        pages: document
            .page_sizes
            .iter()
            .map(|size| PageSizeOutput { height: size.height_pt, width: size.width_pt })
            .collect(),
        path: file.display().to_string(),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    Ok(())
}

fn run_render(
    file: &Path,
    page: u32,
    scale: f64,
    output: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let (mut session, _) = open_session(file, config)?;
    session.set_page(page).context("invalid --page")?;
    session.set_scale(scale).context("invalid --scale")?;

    let rendered = session
        .render_page(session.current_page(), session.scale())
        .context("failed to render page")?
        .context("render was superseded")?;

    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| default_render_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    rendered
        .image
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    Ok(())
}

fn run_annotate(
    file: &Path,
    annotations: &Path,
    output: Option<&Path>,
    config: Option<&Path>,
) -> Result<()> {
    let (mut session, _) = open_session(file, config)?;

    let json = fs::read(annotations)
        .with_context(|| format!("failed to read {}", annotations.display()))?;
    let drafts: Vec<AnnotationDraft> =
        serde_json::from_slice(&json).context("failed to parse annotations")?;

    for (index, draft) in drafts.into_iter().enumerate() {
        session.add_draft(draft).with_context(|| format!("invalid annotation #{}", index + 1))?;
    }

    let exported = session.export_document().context("failed to export annotated PDF")?;
    let output =
        output.map(ToOwned::to_owned).unwrap_or_else(|| file.with_file_name(&exported.file_name));
    ensure_distinct_output(file, &output)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(&output, &exported.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!(
        annotations = session.annotations().len(),
        output = %output.display(),
        "wrote annotated PDF"
    );

    println!("{}", output.display());

    Ok(())
}

fn run_config(write_default: bool, config: Option<&Path>) -> Result<()> {
    let preferences = load_preferences(config)?;

    if write_default {
        let path = match config {
            Some(path) => path.to_path_buf(),
            None => Storage::from_default_project()?.config_path(),
        };
        storage::save_to_path(&path, &preferences)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("wrote {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&preferences)?);

    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

/// Refuse to write the annotated copy over its own source.
fn ensure_distinct_output(input: &Path, output: &Path) -> Result<()> {
    let same = match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(input), Ok(output)) => input == output,
        _ => input == output,
    };

    if same {
        anyhow::bail!(
            "output {} would overwrite the input; pass a different --output",
            output.display()
        );
    }
    Ok(())
}

fn default_render_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}

