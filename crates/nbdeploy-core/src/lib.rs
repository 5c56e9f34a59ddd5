//! nbdeploy-core: Core library for deploying notebooks to a static site
//!
//! This crate provides:
//! - Markdown rewriting so that asset links point at the site's image path
//! - External tool invocation (notebook converter, formula typesetting)
//! - Asset relocation into the site's image directory
//! - The end-to-end [`Deployer`] tying these steps together

pub mod assets;
pub mod deploy;
pub mod formula;
pub mod rewrite;
pub mod tool;

pub use assets::{AssetRelocation, copy_loose_images, is_image_file, replace_supporting_files};
pub use deploy::{DeployError, DeployOptions, DeployReport, Deployer, NotebookPaths, Result};
pub use formula::{FormulaOptions, FormulaOutcome, regenerate_formulas};
pub use rewrite::{AssetUrl, DEFAULT_BASE_URL, rewrite_markdown};
pub use tool::{ToolCommand, ToolCommands, ToolOutcome};
