//! Formula image regeneration
//!
//! Notebooks may keep formulas as standalone `.tex` files next to the
//! notebook. Each one is typeset to a PDF and rasterized to a PNG of the same
//! name. This is best effort: outcomes are reported, never raised.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::tool::{ToolCommands, ToolOutcome};

/// Resolution used when rasterizing formula PDFs
pub const DEFAULT_DPI: u32 = 300;

/// Options for formula regeneration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaOptions {
    /// Regenerate formula images before rewriting (default: true)
    pub enabled: bool,
    /// Rasterization density in dots per inch (default: 300)
    pub dpi: u32,
}

impl Default for FormulaOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            dpi: DEFAULT_DPI,
        }
    }
}

/// Result of regenerating one formula image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaOutcome {
    /// The `.tex` source
    pub source: PathBuf,
    /// The `.png` that should have been produced
    pub image: PathBuf,
    /// Outcome of the typesetter
    pub typeset: ToolOutcome,
    /// Outcome of the rasterizer; `None` if typesetting failed
    pub rasterize: Option<ToolOutcome>,
}

impl FormulaOutcome {
    pub fn is_success(&self) -> bool {
        self.typeset.is_success() && self.rasterize.as_ref().is_some_and(ToolOutcome::is_success)
    }

    /// The first failing step, for diagnostics
    pub fn failure(&self) -> Option<(&'static str, &ToolOutcome)> {
        if !self.typeset.is_success() {
            return Some(("typeset", &self.typeset));
        }
        match &self.rasterize {
            Some(outcome) if !outcome.is_success() => Some(("rasterize", outcome)),
            _ => None,
        }
    }
}

/// Collect `.tex` files directly inside `dir`, sorted by name
pub fn find_formula_sources(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && let Some(ext) = path.extension()
            && ext.eq_ignore_ascii_case("tex")
        {
            sources.push(path);
        }
    }

    sources.sort();
    Ok(sources)
}

/// Typeset and rasterize every formula source in `dir`
///
/// Tools run with `dir` as working directory so their outputs land next to
/// the sources.
pub fn regenerate_formulas(
    dir: &Path,
    tools: &ToolCommands,
    dpi: u32,
) -> io::Result<Vec<FormulaOutcome>> {
    let sources = find_formula_sources(dir)?;

    Ok(sources
        .into_iter()
        .map(|source| regenerate_one(dir, source, tools, dpi))
        .collect())
}

fn regenerate_one(dir: &Path, source: PathBuf, tools: &ToolCommands, dpi: u32) -> FormulaOutcome {
    let pdf = source.with_extension("pdf");
    let image = source.with_extension("png");

    let file_name = |path: &Path| path.file_name().map(|n| n.to_os_string()).unwrap_or_default();

    let typeset = tools.typesetter.run([file_name(&source)], Some(dir));
    let rasterize = typeset.is_success().then(|| {
        tools.rasterizer.run(
            [
                "-density".into(),
                dpi.to_string().into(),
                file_name(&pdf),
                file_name(&image),
            ],
            Some(dir),
        )
    });

    FormulaOutcome {
        source,
        image,
        typeset,
        rasterize,
    }
}
