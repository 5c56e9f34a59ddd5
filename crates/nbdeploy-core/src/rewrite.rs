//! Markdown rewriting for site deployment
//!
//! The converter emits links relative to the notebook's directory. Once the
//! assets are moved into the site's image directory those links have to be
//! rewritten to `{{ site.baseurl }}/<image-path>/<target>`. The template is
//! emitted verbatim; it is expanded later by the static site generator.
//!
//! Two transforms run in order:
//!
//! 1. Supporting-files prefixing: every `(` immediately followed by the
//!    supporting-files directory name gets the asset prefix inserted after the
//!    parenthesis. The directory name itself is kept.
//! 2. Image-link prefixing: every `![alt](target)` whose target is a relative
//!    path has the asset prefix prepended to the target.
//!
//! The second transform never touches a target produced by the first one, so
//! no link is ever prefixed twice.

use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Base URL template understood by Jekyll-style site generators
pub const DEFAULT_BASE_URL: &str = "{{ site.baseurl }}";

/// `![alt](target "optional title")`
static IMAGE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[(?P<alt>[^\]]*)\]\((?P<target>[^)\s]+)(?P<title>\s+"[^"]*")?\)"#).unwrap()
});

/// `scheme:` prefix of an absolute URL (`https:`, `data:`, `attachment:`, ...)
static URL_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*:").unwrap());

/// Public URL under which deployed assets are served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrl {
    base_url: String,
    image_path: String,
}

impl AssetUrl {
    /// Create an asset URL from a base URL template and an image path
    ///
    /// Trailing slashes are removed from both parts, and a leading `./` is
    /// removed from the image path.
    pub fn new(base_url: impl Into<String>, image_path: impl AsRef<str>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let image_path = image_path.as_ref().trim_end_matches('/');
        let image_path = image_path.strip_prefix("./").unwrap_or(image_path);

        Self {
            base_url,
            image_path: image_path.to_string(),
        }
    }

    /// Asset URL using the default `{{ site.baseurl }}` template
    pub fn site(image_path: impl AsRef<str>) -> Self {
        Self::new(DEFAULT_BASE_URL, image_path)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    /// `{base_url}/{image_path}`
    pub fn prefix(&self) -> String {
        if self.image_path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, self.image_path)
        }
    }

    /// `{base_url}/{image_path}/{target}`
    pub fn resolve(&self, target: &str) -> String {
        format!("{}/{}", self.prefix(), target.trim_start_matches("./"))
    }

    /// Whether `target` was already rewritten against this base URL
    fn is_resolved(&self, target: &str) -> bool {
        !self.base_url.is_empty() && target.starts_with(&self.base_url)
    }
}

/// Rewrite converter output for publication
///
/// Strips leading whitespace, then prefixes supporting-files references and
/// relative image links with the asset URL.
pub fn rewrite_markdown(markdown: &str, supporting_files: &str, url: &AssetUrl) -> String {
    let markdown = strip_leading_whitespace(markdown);
    let markdown = prefix_supporting_files(markdown, supporting_files, url);
    prefix_image_links(&markdown, url)
}

/// Remove all whitespace and blank lines at the start of the document
pub fn strip_leading_whitespace(markdown: &str) -> &str {
    markdown.trim_start()
}

/// Insert the asset prefix between `(` and the supporting-files directory name
///
/// `(notebook_files/out.png)` becomes
/// `({{ site.baseurl }}/images/notebook_files/out.png)`.
pub fn prefix_supporting_files(markdown: &str, supporting_files: &str, url: &AssetUrl) -> String {
    if supporting_files.is_empty() {
        return markdown.to_string();
    }

    let needle = format!("({supporting_files}");
    let replacement = format!("({}/{supporting_files}", url.prefix());
    markdown.replace(&needle, &replacement)
}

/// Prefix the target of every relative `![alt](target)` image link
///
/// Absolute URLs, root-relative paths, fragments and targets already starting
/// with the base URL are kept as they are.
pub fn prefix_image_links(markdown: &str, url: &AssetUrl) -> String {
    IMAGE_LINK
        .replace_all(markdown, |caps: &Captures| {
            let target = &caps["target"];
            if is_external_target(target) || url.is_resolved(target) {
                return caps[0].to_string();
            }

            let title = caps.name("title").map_or("", |m| m.as_str());
            format!("![{}]({}{})", &caps["alt"], url.resolve(target), title)
        })
        .into_owned()
}

/// Targets that do not point at a file next to the notebook
fn is_external_target(target: &str) -> bool {
    target.starts_with('/') || target.starts_with('#') || URL_SCHEME.is_match(target)
}
