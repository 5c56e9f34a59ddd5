//! nbdeploy: CLI tool to publish Jupyter notebooks as static site pages

mod config;
mod logger;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use config::{CONFIG_FILE_NAME, Config};
use nbdeploy_core::formula::DEFAULT_DPI;
use nbdeploy_core::{
    AssetRelocation, AssetUrl, DEFAULT_BASE_URL, DeployOptions, DeployReport, Deployer,
    FormulaOptions, NotebookPaths, ToolCommand,
};

#[derive(Parser, Debug)]
#[command(name = "nbdeploy")]
#[command(about = "Publish a Jupyter notebook as a static site markdown page")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
#[command(subcommand_negates_reqs = true)]
#[command(after_help = "Examples:
  nbdeploy post.ipynb ../site/_posts images/posts       # Publish post.ipynb
  nbdeploy post.ipynb _posts images --no-formulas        # Skip .tex regeneration
  nbdeploy init                                          # Write _nbdeploy.toml")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    deploy: DeployArgs,
}

#[derive(Args, Debug)]
struct DeployArgs {
    /// Notebook to convert
    #[arg(required = true)]
    notebook: Option<PathBuf>,

    /// Site directory receiving the markdown page (must exist)
    #[arg(required = true)]
    markdown_dir: Option<PathBuf>,

    /// Site directory receiving images and supporting files
    #[arg(required = true)]
    image_dir: Option<PathBuf>,

    /// Configuration file (defaults to _nbdeploy.toml next to the notebook)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Base URL template prepended to asset links [default: "{{ site.baseurl }}"]
    #[arg(long)]
    base_url: Option<String>,

    /// Public path of the image directory (defaults to IMAGE_DIR)
    #[arg(long)]
    image_url_path: Option<String>,

    /// Skip regenerating formula images from .tex files
    #[arg(long)]
    no_formulas: bool,

    /// Rasterization density for formula images [default: 300]
    #[arg(long)]
    dpi: Option<u32>,

    /// Converter command, split on whitespace, e.g. "python -m jupyter" [default: jupyter]
    ///
    /// A program path containing spaces cannot be given here; set it in the
    /// configuration file instead, e.g. `converter = ["/opt/my tools/jupyter"]`
    /// under `[tools]`.
    #[arg(long)]
    converter: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a sample configuration file
    Init {
        /// Output file
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,

        /// Print the configuration JSON schema instead
        #[arg(long)]
        schema: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Init { output, schema }) => run_init(&output, schema),
        None => run_deploy(cli.deploy),
    }
}

/// Write a sample `_nbdeploy.toml`, or print the schema
fn run_init(output: &Path, schema: bool) -> Result<()> {
    if schema {
        println!("{}", Config::json_schema_string()?);
        return Ok(());
    }

    if output.exists() {
        anyhow::bail!("Config file already exists: {}", output.display());
    }

    let content = Config::sample().to_toml_with_schema()?;
    fs::write(output, content)
        .with_context(|| format!("Failed to write: {}", output.display()))?;

    eprintln!("Created {}", output.display());
    Ok(())
}

/// Deploy one notebook
fn run_deploy(args: DeployArgs) -> Result<()> {
    logger::init(args.verbose, args.quiet);

    let (Some(notebook), Some(markdown_dir), Some(image_dir)) =
        (&args.notebook, &args.markdown_dir, &args.image_dir)
    else {
        anyhow::bail!("NOTEBOOK, MARKDOWN_DIR and IMAGE_DIR are required");
    };

    let config = load_config(args.config.as_deref(), notebook)?;
    let options = build_options(&args, &config, markdown_dir, image_dir)?;
    if let Some(warning) = image_url_warning(&args, &config, image_dir) {
        log!("warn"; "{warning}");
    }

    debug!("convert"; "converter: {}", options.tools.converter);
    debug!("assets"; "asset URL: {}", options.asset_url.prefix());
    log!("convert"; "{}", notebook.display());

    let report = Deployer::new(options)
        .deploy(notebook)
        .with_context(|| format!("Failed to deploy {}", notebook.display()))?;

    log_report(&report);

    if !logger::is_quiet() {
        println!("{}", report.published.display());
    }

    Ok(())
}

/// Explicit `--config`, else `_nbdeploy.toml` next to the notebook, else defaults
fn load_config(explicit: Option<&Path>, notebook: &Path) -> Result<Config> {
    if let Some(path) = explicit {
        debug!("config"; "loading {}", path.display());
        return Config::load(path);
    }

    let dir = NotebookPaths::new(notebook)?.dir;
    match Config::load_from_dir(&dir)? {
        Some(config) => {
            debug!("config"; "loaded {}", dir.join(CONFIG_FILE_NAME).display());
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Merge CLI flags over the configuration file over built-in defaults
fn build_options(
    args: &DeployArgs,
    config: &Config,
    markdown_dir: &Path,
    image_dir: &Path,
) -> Result<DeployOptions> {
    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.site.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let image_url_path = args
        .image_url_path
        .clone()
        .or_else(|| config.site.image_url_path.clone())
        .unwrap_or_else(|| image_dir.to_string_lossy().into_owned());

    let mut tools = config.tools.to_commands()?;
    if let Some(converter) = &args.converter {
        let parts: Vec<&str> = converter.split_whitespace().collect();
        tools.converter =
            ToolCommand::from_slice(&parts).context("--converter must name a program")?;
    }

    let formulas = FormulaOptions {
        enabled: !args.no_formulas && config.formulas.enabled.unwrap_or(true),
        dpi: args.dpi.or(config.formulas.dpi).unwrap_or(DEFAULT_DPI),
    };

    Ok(DeployOptions {
        asset_url: AssetUrl::new(base_url, image_url_path),
        tools,
        formulas,
        ..DeployOptions::new(markdown_dir, image_dir)
    })
}

/// Warn when the public image path falls back to an absolute IMAGE_DIR
fn image_url_warning(args: &DeployArgs, config: &Config, image_dir: &Path) -> Option<String> {
    let derived = args.image_url_path.is_none() && config.site.image_url_path.is_none();
    (derived && image_dir.has_root()).then(|| {
        format!(
            "IMAGE_DIR {} is absolute and is used as the public image path; \
             set --image-url-path or site.image_url_path",
            image_dir.display()
        )
    })
}

/// Report tolerated failures and, in verbose mode, each step
fn log_report(report: &DeployReport) {
    for formula in &report.formulas {
        match formula.failure() {
            None => debug!("formula"; "{} -> {}", formula.source.display(), formula.image.display()),
            Some((step, outcome)) => {
                log!("warn"; "{} ({step}): {outcome}", formula.source.display())
            }
        }
    }

    for image in &report.copied_images {
        debug!("assets"; "copied {}", image.display());
    }

    match &report.supporting_files {
        Some(AssetRelocation::Moved { from, to, replaced }) => {
            if *replaced {
                debug!("assets"; "replaced {}", to.display());
            }
            debug!("assets"; "moved {} -> {}", from.display(), to.display());
        }
        Some(AssetRelocation::AlreadyInPlace(path)) => {
            debug!("assets"; "{} already in place", path.display());
        }
        Some(AssetRelocation::NotFound { removed_stale }) => {
            if *removed_stale {
                debug!("assets"; "removed stale {}", report.paths.supporting_files);
            }
            debug!("assets"; "no {} directory", report.paths.supporting_files);
        }
        None => {}
    }

    for warning in &report.warnings {
        log!("warn"; "{warning}");
    }

    debug!("deploy"; "{} -> {}", report.markdown_file.display(), report.published.display());
}
