use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let project_root = discover_project_root();
        let user_data_dir = discover_user_data_dir(&project_root);
        Self::with_dirs(project_root, user_data_dir)
    }

    /// Lays out every path under a single directory. Used by tests and
    /// embedded setups that do not want platform discovery.
    pub fn from_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self::with_dirs(data_dir.clone(), data_dir)
    }

    fn with_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        let db_path = user_data_dir.join("pagewise.db");
        let secrets_path = user_data_dir.join("secrets.yaml");

        for dir in [&user_data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            project_root,
            user_data_dir,
            log_dir,
            db_path,
            secrets_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_project_root() -> PathBuf {
    if let Ok(root) = env::var("PAGEWISE_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").exists() {
        return manifest_dir;
    }

    env::current_dir().unwrap_or(manifest_dir)
}

/// `PAGEWISE_DATA_DIR` when set, otherwise the project root itself.
fn discover_user_data_dir(project_root: &Path) -> PathBuf {
    resolve_data_dir(project_root, env::var_os("PAGEWISE_DATA_DIR").map(PathBuf::from))
}

fn resolve_data_dir(project_root: &Path, override_dir: Option<PathBuf>) -> PathBuf {
    override_dir
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| project_root.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_data_dir_places_everything_under_the_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::from_data_dir(dir.path());

        assert_eq!(paths.db_path, dir.path().join("pagewise.db"));
        assert_eq!(paths.secrets_path, dir.path().join("secrets.yaml"));
        assert!(paths.log_dir.exists());
    }

    #[test]
    fn data_dir_defaults_to_project_root_unless_overridden() {
        let root = Path::new("/srv/pagewise");

        assert_eq!(resolve_data_dir(root, None), root.to_path_buf());
        assert_eq!(resolve_data_dir(root, Some(PathBuf::new())), root.to_path_buf());
        assert_eq!(
            resolve_data_dir(root, Some(PathBuf::from("/var/lib/pagewise"))),
            PathBuf::from("/var/lib/pagewise")
        );
    }
}
