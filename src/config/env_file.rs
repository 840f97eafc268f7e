//! `.env` file discovery

use std::path::{Path, PathBuf};

/// Candidate env files in priority order
///
/// `$ENV_FILE` wins, then the file matching `APP_ENV`, then the fixed list.
#[must_use]
pub fn env_file_candidates(env_file: Option<&str>, app_env: Option<&str>) -> Vec<PathBuf> {
    let preferred = if app_env == Some("production") {
        ".env.production"
    } else {
        ".env.dev"
    };

    env_file
        .into_iter()
        .chain([preferred, ".env.production", ".env.dev", ".env"])
        .map(PathBuf::from)
        .collect()
}

/// Load the first existing env file relative to `base`
///
/// Variables already present in the process environment are never
/// overridden. Returns the path that was loaded.
pub fn load_env_file_in(base: &Path) -> Option<PathBuf> {
    let env_file = std::env::var("ENV_FILE").ok();
    let app_env = std::env::var("APP_ENV").ok();

    for candidate in env_file_candidates(env_file.as_deref(), app_env.as_deref()) {
        let path = base.join(candidate);
        if !path.is_file() {
            continue;
        }

        match dotenvy::from_path(&path) {
            Ok(()) => return Some(path),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load env file");
            }
        }
    }

    None
}

/// Load the first existing env file from the working directory
pub fn load_env_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    load_env_file_in(&cwd)
}
