//! Reading workflows from files on disk.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, WrapErr, bail};
use tracing::{debug, instrument};
use wisp_extract::{WORKFLOW_KEYWORD, extract_from_reader, is_document};

use crate::cli::report;

/// Kinds of file a workflow can be read from, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The workflow itself, as a JSON document.
    Json,
    /// An image with the workflow embedded in a text chunk.
    Png,
}
impl Source {
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "json" => Some(Self::Json),
            "png" => Some(Self::Png),
            _ => None,
        }
    }
}

/// Read the workflow JSON from a `.json` or `.png` file.
#[instrument]
pub async fn workflow(path: &Path) -> miette::Result<String> {
    let Some(source) = Source::of(path) else {
        bail!("{} is not a .json or .png file containing workflow data", path.display());
    };
    debug!(?source, "reading workflow");
    match source {
        Source::Json => {
            let text = tokio::fs::read_to_string(path)
                .await
                .into_diagnostic()
                .wrap_err_with(|| format!("could not read {}", path.display()))?;
            if !is_document(&text) {
                bail!("{} does not contain a JSON object", path.display());
            }
            Ok(text)
        },
        Source::Png => {
            let owned: PathBuf = path.to_path_buf();
            tokio::task::spawn_blocking(move || {
                let file = File::open(&owned)
                    .into_diagnostic()
                    .wrap_err_with(|| format!("could not open {}", owned.display()))?;
                extract_from_reader(BufReader::new(file), WORKFLOW_KEYWORD).map_err(report)
            })
            .await
            .into_diagnostic()?
        },
    }
}

/// Name to remember a workflow under when none is given.
pub fn default_name(path: &Path) -> String {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::png;
    use rstest::rstest;

    #[rstest]
    #[case("flow.json", Some(Source::Json))]
    #[case("flow.PNG", Some(Source::Png))]
    #[case("dir/flow.png", Some(Source::Png))]
    #[case("flow.jpg", None)]
    #[case("flow", None)]
    fn sources(#[case] path: &str, #[case] expected: Option<Source>) {
        assert_eq!(Source::of(Path::new(path)), expected);
    }

    #[tokio::test]
    async fn reads_json_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("flow.json");
        std::fs::write(&path, r#"{"nodes": []}"#).unwrap();
        assert_eq!(workflow(&path).await.unwrap(), r#"{"nodes": []}"#);

        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(workflow(&path).await.is_err());
    }

    #[tokio::test]
    async fn reads_png_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("image.png");
        std::fs::write(&path, png(&[("prompt", "{}"), ("workflow", r#"{"nodes": [1]}"#)])).unwrap();
        assert_eq!(workflow(&path).await.unwrap(), r#"{"nodes": [1]}"#);

        std::fs::write(&path, png(&[("prompt", "{}")])).unwrap();
        let err = workflow(&path).await.unwrap_err();
        assert!(err.to_string().contains("no 'workflow' text chunk"));
    }

    #[tokio::test]
    async fn rejects_other_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("image.jpg");
        std::fs::write(&path, b"whatever").unwrap();
        assert!(workflow(&path).await.is_err());
        assert!(workflow(&temp_dir.path().join("missing.json")).await.is_err());
    }

    #[test]
    fn default_names() {
        assert_eq!(default_name(Path::new("/tmp/some/flow.png")), "flow.png");
    }
}
