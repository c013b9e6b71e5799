use std::fs;
use std::path::Path;

use anyhow::Context;
use manga_engine::RunConfig;

/// Reads run settings from a RON file. Missing fields keep their defaults.
pub fn load_run_config(path: &Path) -> anyhow::Result<RunConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let config = ron::from_str(&content)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn partial_file_fills_in_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("manga.ron");
        fs::write(
            &path,
            r#"(
                output_dir: "library",
                max_concurrency: 2,
                user_agent: Some("test-agent/1.0"),
            )"#,
        )
        .unwrap();

        let config = load_run_config(&path).unwrap();
        assert_eq!(
            config,
            RunConfig {
                output_dir: PathBuf::from("library"),
                max_concurrency: 2,
                user_agent: Some("test-agent/1.0".into()),
                ..RunConfig::default()
            }
        );
    }

    #[test]
    fn unreadable_or_malformed_files_are_errors() {
        let temp = TempDir::new().unwrap();
        assert!(load_run_config(&temp.path().join("missing.ron")).is_err());

        let path = temp.path().join("bad.ron");
        fs::write(&path, "(max_concurrency: \"many\")").unwrap();
        let err = load_run_config(&path).unwrap_err();
        assert!(err.to_string().contains("bad.ron"));
    }
}
