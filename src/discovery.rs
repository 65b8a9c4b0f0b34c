//! Locate user homes and browser profiles under a filesystem root.
//!
//! Linux homes live in `<root>/home`, macOS and Windows homes in
//! `<root>/Users`. A browser is processed for a user when one of its profile
//! directories exists; nothing is reported for users without browser data.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::artefact::Browser;

const CHROME_PROFILES: &[&str] = &[
    ".config/google-chrome/Default",
    "Library/Application Support/Google/Chrome/Default",
    "AppData/Local/Google/Chrome/User Data/Default",
];

/// Firefox profile roots, paired with the matching local cache root.
const FIREFOX_PROFILE_ROOTS: &[(&str, &str)] = &[
    (".mozilla/firefox", ".cache/mozilla/firefox"),
    (
        "Library/Application Support/Firefox/Profiles",
        "Library/Caches/Firefox/Profiles",
    ),
    (
        "AppData/Roaming/Mozilla/Firefox/Profiles",
        "AppData/Local/Mozilla/Firefox/Profiles",
    ),
];

/// Directories one browser profile keeps its stores in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePaths {
    pub data_dir: PathBuf,
    /// Where disk caches live. Same as `data_dir` unless the platform splits
    /// roaming and local data.
    pub cache_dir: PathBuf,
}

impl ProfilePaths {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            cache_dir: data_dir.clone(),
            data_dir,
        }
    }

    pub fn with_cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileTarget {
    pub user: String,
    pub browser: Browser,
    pub paths: ProfilePaths,
}

/// User home directories under `root`, sorted by user name.
pub fn user_homes(root: &Path) -> Vec<(String, PathBuf)> {
    let mut homes = Vec::new();
    for parent in ["home", "Users"] {
        for dir in subdirs(&root.join(parent)) {
            let Some(name) = dir.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            homes.push((name, dir));
        }
    }
    homes.sort();
    homes
}

pub fn chrome_profiles(home: &Path) -> Vec<ProfilePaths> {
    CHROME_PROFILES
        .iter()
        .map(|rel| home.join(rel))
        .filter(|dir| dir.is_dir())
        .map(ProfilePaths::new)
        .collect()
}

/// Every `<salt>.<name>` directory under a known Firefox profile root.
pub fn firefox_profiles(home: &Path) -> Vec<ProfilePaths> {
    let mut out = Vec::new();
    for (data_rel, cache_rel) in FIREFOX_PROFILE_ROOTS {
        for dir in subdirs(&home.join(data_rel)) {
            let Some(name) = dir.file_name().map(|n| n.to_os_string()) else {
                continue;
            };
            if !name.to_string_lossy().contains('.') {
                // "Crash Reports", "Pending Pings"
                continue;
            }
            let cache_dir = home.join(cache_rel).join(&name);
            let paths = ProfilePaths::new(dir);
            out.push(if cache_dir.is_dir() {
                paths.with_cache_dir(cache_dir)
            } else {
                paths
            });
        }
    }
    out
}

/// All profiles for `browsers` under `root`, optionally restricted to one user.
pub fn discover(root: &Path, browsers: &[Browser], user: Option<&str>) -> Vec<ProfileTarget> {
    let mut targets = Vec::new();
    for (name, home) in user_homes(root) {
        if user.is_some_and(|wanted| wanted != name) {
            continue;
        }
        for &browser in browsers {
            let profiles = match browser {
                Browser::Chrome => chrome_profiles(&home),
                Browser::Firefox => firefox_profiles(&home),
            };
            if profiles.is_empty() {
                debug!("no {} profile for user {name}", browser.as_str());
            }
            targets.extend(profiles.into_iter().map(|paths| ProfileTarget {
                user: name.clone(),
                browser,
                paths,
            }));
        }
    }
    targets
}

fn subdirs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn mkdir(path: &Path) {
        std::fs::create_dir_all(path).expect("mkdir");
    }

    #[test]
    fn finds_linux_and_macos_profiles() {
        let root = tempdir().expect("tempdir");
        let alice = root.path().join("home/alice");
        mkdir(&alice.join(".config/google-chrome/Default"));
        mkdir(&alice.join(".mozilla/firefox/ab12cd.default-release"));
        mkdir(&alice.join(".mozilla/firefox/Crash Reports"));
        mkdir(&alice.join(".cache/mozilla/firefox/ab12cd.default-release"));
        let bob = root.path().join("Users/bob");
        mkdir(&bob.join("Library/Application Support/Firefox/Profiles/zz.default"));

        let targets = discover(root.path(), &Browser::all(), None);
        assert_eq!(targets.len(), 3);

        assert_eq!(targets[0].user, "alice");
        assert_eq!(targets[0].browser, Browser::Chrome);
        assert_eq!(targets[1].browser, Browser::Firefox);
        assert_eq!(
            targets[1].paths.cache_dir,
            alice.join(".cache/mozilla/firefox/ab12cd.default-release")
        );
        assert_eq!(targets[2].user, "bob");
        assert_eq!(targets[2].paths.cache_dir, targets[2].paths.data_dir);
    }

    #[test]
    fn filters_by_user_and_browser() {
        let root = tempdir().expect("tempdir");
        mkdir(&root.path().join("home/alice/.config/google-chrome/Default"));
        mkdir(&root.path().join("home/carol/.config/google-chrome/Default"));
        mkdir(&root.path().join("home/carol/.mozilla/firefox/x.default"));

        let targets = discover(root.path(), &[Browser::Chrome], Some("carol"));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].user, "carol");
        assert_eq!(targets[0].browser, Browser::Chrome);
    }

    #[test]
    fn empty_root_has_no_targets() {
        let root = tempdir().expect("tempdir");
        assert!(discover(root.path(), &Browser::all(), None).is_empty());
    }
}
