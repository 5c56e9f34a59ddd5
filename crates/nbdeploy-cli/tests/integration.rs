//! Integration tests for the nbdeploy binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn nbdeploy_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_nbdeploy"))
}

/// Stands in for `jupyter`: invoked as `<script> nbconvert --to markdown <nb>`
const FAKE_JUPYTER: &str = r#"#!/bin/sh
nb="$4"
base="${nb%.ipynb}"
mkdir -p "${base}_files"
printf 'png-data' > "${base}_files/fit_2_0.png"
cat > "$base.md" <<'EOF'

# Fitting a line

We fit `y = a x + b` by least squares.

```python
plt.scatter(x, y)
```

![png](fit_files/fit_2_0.png)

![diagram](diagram.png)
EOF
"#;

const FAILING_JUPYTER: &str = "#!/bin/sh\necho 'Notebook does not appear to be JSON' >&2\nexit 1\n";

/// A site root with `notebooks/fit.ipynb`, `_posts/` and a converter script
///
/// The root's name contains a space. The converter is configured in
/// `notebooks/_nbdeploy.toml` as `["sh", <script>]`, so the script never needs
/// to be executable.
struct Site {
    root: TempDir,
}

impl Site {
    fn new(converter: &str) -> Self {
        let root = tempfile::Builder::new()
            .prefix("nb site ")
            .tempdir()
            .expect("Failed to create temp dir");
        fs::create_dir_all(root.path().join("notebooks")).unwrap();
        fs::create_dir_all(root.path().join("_posts")).unwrap();
        fs::write(root.path().join("notebooks/fit.ipynb"), "{}").unwrap();
        fs::write(root.path().join("notebooks/diagram.png"), "diagram").unwrap();

        fs::write(root.path().join("jupyter"), converter).unwrap();

        let site = Self { root };
        site.write_config("");
        site
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    /// Write `notebooks/_nbdeploy.toml` with the converter and `extra` settings
    fn write_config(&self, extra: &str) {
        let script = toml::Value::String(self.path("jupyter").display().to_string());
        fs::write(
            self.path("notebooks/_nbdeploy.toml"),
            format!("{extra}\n[tools]\nconverter = [\"sh\", {script}]\n"),
        )
        .unwrap();
    }

    /// Run `nbdeploy notebooks/fit.ipynb _posts images` from the site root
    fn deploy(&self, extra: &[&str]) -> Output {
        Command::new(nbdeploy_binary())
            .current_dir(self.root.path())
            .args(["notebooks/fit.ipynb", "_posts", "images"])
            .args(extra)
            .output()
            .expect("Failed to run nbdeploy")
    }
}

#[cfg(unix)]
#[test]
fn test_deploy_notebook() {
    let site = Site::new(FAKE_JUPYTER);

    let output = site.deploy(&[]);
    assert!(
        output.status.success(),
        "nbdeploy failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.trim(), Path::new("_posts").join("fit.md").display().to_string());

    let published = fs::read_to_string(site.path("_posts/fit.md")).unwrap();
    insta::assert_snapshot!("published_markdown", published);

    let intermediate = fs::read_to_string(site.path("notebooks/fit.md")).unwrap();
    assert_eq!(intermediate, published);

    assert!(!site.path("notebooks/fit_files").exists());
    assert_eq!(
        fs::read_to_string(site.path("images/fit_files/fit_2_0.png")).unwrap(),
        "png-data"
    );
    assert_eq!(
        fs::read_to_string(site.path("images/diagram.png")).unwrap(),
        "diagram"
    );
}

#[cfg(unix)]
#[test]
fn test_deploy_twice() {
    let site = Site::new(FAKE_JUPYTER);

    assert!(site.deploy(&["-q"]).status.success());
    assert!(site.deploy(&["-q"]).status.success());

    let mut files: Vec<_> = fs::read_dir(site.path("images/fit_files"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    files.sort();
    assert_eq!(files, vec!["fit_2_0.png"]);
}

#[cfg(unix)]
#[test]
fn test_quiet_prints_nothing() {
    let site = Site::new(FAKE_JUPYTER);

    let output = site.deploy(&["--quiet"]);

    assert!(output.status.success());
    assert!(output.stdout.is_empty());
    assert!(output.stderr.is_empty());
}

#[cfg(unix)]
#[test]
fn test_converter_failure() {
    let site = Site::new(FAILING_JUPYTER);

    let output = site.deploy(&[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Notebook does not appear to be JSON"), "{stderr}");
    assert!(!site.path("images").exists());
    assert!(!site.path("_posts/fit.md").exists());
}

#[cfg(unix)]
#[test]
fn test_missing_markdown_dir() {
    let site = Site::new(FAKE_JUPYTER);
    fs::remove_dir(site.path("_posts")).unwrap();

    let output = site.deploy(&[]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Markdown directory does not exist"), "{stderr}");

    let intermediate = fs::read_to_string(site.path("notebooks/fit.md")).unwrap();
    assert!(intermediate.starts_with("# Fitting a line"));
    assert!(intermediate.contains("({{ site.baseurl }}/images/fit_files/fit_2_0.png)"));
}

#[cfg(unix)]
#[test]
fn test_config_next_to_notebook() {
    let site = Site::new(FAKE_JUPYTER);
    site.write_config("[site]\nbase_url = \"{{ site.url }}\"\nimage_url_path = \"assets/img\"\n");

    let output = site.deploy(&["-q"]);
    assert!(output.status.success());

    let published = fs::read_to_string(site.path("_posts/fit.md")).unwrap();
    assert!(published.contains("![diagram]({{ site.url }}/assets/img/diagram.png)"));
}

#[cfg(unix)]
#[test]
fn test_explicit_config_must_exist() {
    let site = Site::new(FAKE_JUPYTER);

    let output = site.deploy(&["--config", "missing.toml"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to read config file"));
    assert!(!site.path("notebooks/fit_files").exists());
}

#[test]
fn test_missing_arguments() {
    let output = Command::new(nbdeploy_binary())
        .arg("fit.ipynb")
        .output()
        .expect("Failed to run nbdeploy");

    assert!(!output.status.success());
}

#[test]
fn test_init_config() {
    let dir = tempfile::tempdir().unwrap();
    let output_file = dir.path().join("_nbdeploy.toml");

    let status = Command::new(nbdeploy_binary())
        .arg("init")
        .arg("-o")
        .arg(&output_file)
        .status()
        .expect("Failed to run nbdeploy init");
    assert!(status.success(), "nbdeploy init failed");

    let content = fs::read_to_string(&output_file).expect("Failed to read config file");
    insta::assert_snapshot!("init_config_toml", content);
    let parsed: toml::Table = toml::from_str(&content).expect("Invalid TOML");
    assert_eq!(parsed["formulas"]["dpi"].as_integer(), Some(300));

    let status = Command::new(nbdeploy_binary())
        .arg("init")
        .arg("-o")
        .arg(&output_file)
        .status()
        .expect("Failed to run nbdeploy init");
    assert!(!status.success(), "init must not overwrite an existing file");
}

#[test]
fn test_init_schema() {
    let output = Command::new(nbdeploy_binary())
        .arg("init")
        .arg("--schema")
        .output()
        .expect("Failed to run nbdeploy init --schema");

    assert!(output.status.success(), "nbdeploy init --schema failed");

    let schema: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Schema is not valid JSON");
    assert_eq!(schema["title"], "Config");
    assert!(schema["properties"]["site"].is_object());
}
