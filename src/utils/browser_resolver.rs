use anyhow::Result;
use std::path::{Path, PathBuf};

/// Environment variables that may point at a Chromium build, in priority order
const ENV_VARS: &[&str] = &["FOLIO_CHROMIUM_PATH", "PLAYWRIGHT_CHROMIUM_EXECUTABLE_PATH"];

const SYSTEM_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

const PATH_NAMES: &[&str] = &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"];

/// Find a Chromium executable.
///
/// Order: explicit env override, Playwright's download cache, well-known
/// install locations, then `PATH`. Returns an error listing what was checked.
pub fn find_chromium() -> Result<PathBuf> {
    let mut checked = Vec::new();

    for var in ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            let path = PathBuf::from(&value);
            checked.push(format!("${}: {}", var, path.display()));
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Some(cache) = dirs::cache_dir() {
        let root = cache.join("ms-playwright");
        checked.push(format!("Playwright cache: {}", root.display()));
        if let Some(path) = find_in_playwright_cache(&root) {
            return Ok(path);
        }
    }

    for path in SYSTEM_PATHS {
        let p = Path::new(path);
        checked.push(format!("System: {}", p.display()));
        if p.exists() {
            return Ok(p.to_path_buf());
        }
    }

    for name in PATH_NAMES {
        if let Ok(path) = which::which(name) {
            return Ok(path);
        }
    }
    checked.push(format!("PATH: {}", PATH_NAMES.join(", ")));

    Err(anyhow::anyhow!(
        "Could not find a Chromium executable. Checked:\n{}",
        checked.join("\n")
    ))
}

/// Newest `chromium-<rev>` build under a Playwright cache directory
pub fn find_in_playwright_cache(root: &Path) -> Option<PathBuf> {
    let pattern = root.join("chromium-*").to_string_lossy().to_string();
    let mut builds: Vec<PathBuf> = glob::glob(&pattern)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_dir())
        .collect();

    builds.sort_by_key(|p| revision_of(p));
    builds.reverse();

    builds.iter().find_map(|build| {
        [
            "chrome-linux/chrome",
            "chrome-mac/Chromium.app/Contents/MacOS/Chromium",
            "chrome-win/chrome.exe",
        ]
        .iter()
        .map(|rel| build.join(rel))
        .find(|candidate| candidate.exists())
    })
}

fn revision_of(build_dir: &Path) -> u64 {
    build_dir
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_prefix("chromium-"))
        .and_then(|rev| rev.parse().ok())
        .unwrap_or(0)
}
