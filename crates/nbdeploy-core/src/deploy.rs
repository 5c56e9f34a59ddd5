//! Notebook deployment
//!
//! [`Deployer::deploy`] runs the whole publication sequence for one notebook:
//!
//! 1. Convert the notebook to markdown with the external converter
//! 2. Regenerate formula images from `.tex` sources (best effort)
//! 3. Rewrite asset links in the generated markdown
//! 4. Move images and the supporting-files directory into the image directory
//! 5. Write the markdown next to the notebook, then copy it to the site
//!
//! The copy into the site's markdown directory is always the last write, so a
//! site generator watching that directory only ever sees the finished page.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::assets::{AssetRelocation, copy_loose_images, replace_supporting_files};
use crate::formula::{FormulaOptions, FormulaOutcome, regenerate_formulas};
use crate::rewrite::{AssetUrl, rewrite_markdown};
use crate::tool::{ToolCommands, ToolOutcome};

/// Errors that abort a deployment
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("Invalid notebook path: {0}")]
    InvalidNotebook(PathBuf),

    #[error("Notebook not found: {0}")]
    NotebookNotFound(PathBuf),

    #[error("Converter `{program}` not found")]
    ConverterMissing { program: String },

    #[error("Converting {notebook} failed: {outcome}")]
    ConverterFailed {
        notebook: PathBuf,
        outcome: ToolOutcome,
    },

    #[error("Converter did not produce {0}")]
    MarkdownNotProduced(PathBuf),

    #[error("Markdown directory does not exist: {0}")]
    MarkdownDirMissing(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Result type for deployment operations
pub type Result<T> = std::result::Result<T, DeployError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> DeployError + '_ {
    move |source| DeployError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Paths derived from the notebook location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookPaths {
    /// The notebook as given
    pub notebook: PathBuf,
    /// Directory containing the notebook (`.` if none was given)
    pub dir: PathBuf,
    /// Notebook file name without extension
    pub stem: String,
    /// Name of the converter's supporting-files directory (`{stem}_files`)
    pub supporting_files: String,
}

impl NotebookPaths {
    pub fn new(notebook: &Path) -> Result<Self> {
        let stem = notebook
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DeployError::InvalidNotebook(notebook.to_path_buf()))?;

        let dir = match notebook.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            notebook: notebook.to_path_buf(),
            dir,
            stem: stem.to_string(),
            supporting_files: format!("{stem}_files"),
        })
    }

    /// `{dir}/{stem}.md`, written by the converter
    pub fn markdown_file(&self) -> PathBuf {
        self.dir.join(format!("{}.md", self.stem))
    }

    /// `{dir}/{stem}_files`
    pub fn supporting_files_dir(&self) -> PathBuf {
        self.dir.join(&self.supporting_files)
    }
}

/// Options for a deployment
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Site directory receiving the markdown page (must exist)
    pub markdown_dir: PathBuf,
    /// Site directory receiving images and supporting files
    pub image_dir: PathBuf,
    /// Public URL of `image_dir`, used when rewriting links
    pub asset_url: AssetUrl,
    /// External tools
    pub tools: ToolCommands,
    /// Formula regeneration
    pub formulas: FormulaOptions,
}

impl DeployOptions {
    /// Options with default tools, using `image_dir` as the public image path
    pub fn new(markdown_dir: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        let image_dir = image_dir.into();
        let asset_url = AssetUrl::site(image_dir.to_string_lossy());

        Self {
            markdown_dir: markdown_dir.into(),
            image_dir,
            asset_url,
            tools: ToolCommands::default(),
            formulas: FormulaOptions::default(),
        }
    }
}

/// What a successful deployment did
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub paths: NotebookPaths,
    /// Rewritten markdown next to the notebook
    pub markdown_file: PathBuf,
    /// Markdown copied into the site
    pub published: PathBuf,
    /// Loose images copied into the image directory
    pub copied_images: Vec<PathBuf>,
    /// Supporting-files relocation; `None` if it failed (see `warnings`)
    pub supporting_files: Option<AssetRelocation>,
    /// One entry per formula source found
    pub formulas: Vec<FormulaOutcome>,
    /// Tolerated failures
    pub warnings: Vec<String>,
}

/// Deploys notebooks with a fixed set of options
#[derive(Debug, Clone)]
pub struct Deployer {
    options: DeployOptions,
}

impl Deployer {
    pub fn new(options: DeployOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DeployOptions {
        &self.options
    }

    /// Convert and publish one notebook
    pub fn deploy(&self, notebook: &Path) -> Result<DeployReport> {
        let paths = NotebookPaths::new(notebook)?;
        if !notebook.is_file() {
            return Err(DeployError::NotebookNotFound(notebook.to_path_buf()));
        }

        self.convert(&paths)?;

        let mut warnings = Vec::new();

        let formulas = if self.options.formulas.enabled {
            regenerate_formulas(&paths.dir, &self.options.tools, self.options.formulas.dpi)
                .unwrap_or_else(|e| {
                    warnings.push(format!(
                        "failed to scan {} for formulas: {e}",
                        paths.dir.display()
                    ));
                    Vec::new()
                })
        } else {
            Vec::new()
        };

        let markdown_file = paths.markdown_file();
        if !markdown_file.is_file() {
            return Err(DeployError::MarkdownNotProduced(markdown_file));
        }
        let markdown = fs::read_to_string(&markdown_file).map_err(io_error(&markdown_file))?;
        let markdown = rewrite_markdown(&markdown, &paths.supporting_files, &self.options.asset_url);

        let image_dir = &self.options.image_dir;
        let copied_images = copy_loose_images(&paths.dir, image_dir).unwrap_or_else(|e| {
            warnings.push(format!(
                "failed to copy images from {} to {}: {e}",
                paths.dir.display(),
                image_dir.display()
            ));
            Vec::new()
        });

        let supporting_files_dir = paths.supporting_files_dir();
        let supporting_files = match replace_supporting_files(&supporting_files_dir, image_dir) {
            Ok(relocation) => Some(relocation),
            Err(e) => {
                warnings.push(format!(
                    "failed to move {} to {}: {e}",
                    supporting_files_dir.display(),
                    image_dir.display()
                ));
                None
            }
        };

        fs::write(&markdown_file, &markdown).map_err(io_error(&markdown_file))?;
        let published = self.publish(&markdown_file)?;

        Ok(DeployReport {
            paths,
            markdown_file,
            published,
            copied_images,
            supporting_files,
            formulas,
            warnings,
        })
    }

    /// Run `<converter> nbconvert --to markdown <notebook>`
    fn convert(&self, paths: &NotebookPaths) -> Result<()> {
        let outcome = self.options.tools.converter.run(
            [
                "nbconvert".into(),
                "--to".into(),
                "markdown".into(),
                paths.notebook.as_os_str().to_os_string(),
            ],
            None,
        );

        match outcome {
            ToolOutcome::Success => Ok(()),
            ToolOutcome::Missing { program } => Err(DeployError::ConverterMissing { program }),
            outcome @ ToolOutcome::Failed { .. } => Err(DeployError::ConverterFailed {
                notebook: paths.notebook.clone(),
                outcome,
            }),
        }
    }

    /// Copy the rewritten markdown into the site's markdown directory
    fn publish(&self, markdown_file: &Path) -> Result<PathBuf> {
        let markdown_dir = &self.options.markdown_dir;
        if !markdown_dir.is_dir() {
            return Err(DeployError::MarkdownDirMissing(markdown_dir.clone()));
        }

        let Some(name) = markdown_file.file_name() else {
            return Err(DeployError::InvalidNotebook(markdown_file.to_path_buf()));
        };
        let published = markdown_dir.join(name);

        let same_file = match (markdown_file.canonicalize(), published.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            fs::copy(markdown_file, &published).map_err(io_error(&published))?;
        }

        Ok(published)
    }
}
