// src/exec/locator.rs

//! Tool locator: resolves logical tool names to executable paths.
//!
//! The search path is `PATH` followed by a fixed list of system binary
//! directories, `$HOME/go/bin` (where most recon tools get installed) and any
//! `[tools].extra_paths`. Lookups are cached per executable name for the
//! lifetime of the locator; a tool that is absent stays absent.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::fs::{FileSystem, RealFileSystem};

/// Standard binary directories searched after `PATH`.
const FALLBACK_DIRS: [&str; 5] = ["/usr/local/bin", "/usr/bin", "/bin", "/usr/sbin", "/sbin"];

/// Logical tools the pipeline knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Subfinder,
    Assetfinder,
    Findomain,
    Nmap,
    Httpx,
    Gobuster,
    Dig,
    Curl,
}

impl Tool {
    pub const ALL: [Tool; 8] = [
        Tool::Subfinder,
        Tool::Assetfinder,
        Tool::Findomain,
        Tool::Nmap,
        Tool::Httpx,
        Tool::Gobuster,
        Tool::Dig,
        Tool::Curl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Subfinder => "subfinder",
            Tool::Assetfinder => "assetfinder",
            Tool::Findomain => "findomain",
            Tool::Nmap => "nmap",
            Tool::Httpx => "httpx",
            Tool::Gobuster => "gobuster",
            Tool::Dig => "dig",
            Tool::Curl => "curl",
        }
    }

    /// Acceptable executable names, in preference order.
    pub fn executables(&self) -> &'static [&'static str] {
        match self {
            Tool::Httpx => &["httpx", "httpx-toolkit"],
            Tool::Subfinder => &["subfinder"],
            Tool::Assetfinder => &["assetfinder"],
            Tool::Findomain => &["findomain"],
            Tool::Nmap => &["nmap"],
            Tool::Gobuster => &["gobuster"],
            Tool::Dig => &["dig"],
            Tool::Curl => &["curl"],
        }
    }
}

/// Cached executable lookup over a fixed search path.
#[derive(Debug)]
pub struct ToolLocator {
    fs: Arc<dyn FileSystem>,
    search_paths: Vec<PathBuf>,
    cache: RwLock<HashMap<String, Option<PathBuf>>>,
}

impl ToolLocator {
    /// Locator over an explicit list of directories.
    pub fn new(fs: Arc<dyn FileSystem>, search_paths: Vec<PathBuf>) -> Self {
        Self {
            fs,
            search_paths: unique_paths(search_paths),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Locator over the real filesystem using the process environment.
    pub fn from_env(extra_paths: &[PathBuf]) -> Self {
        let path_var = std::env::var_os("PATH");
        let home = std::env::var_os("HOME").map(PathBuf::from);
        let paths = build_search_paths(path_var.as_deref(), home.as_deref(), extra_paths);
        Self::new(Arc::new(RealFileSystem), paths)
    }

    /// Resolve a single executable name, consulting the cache first.
    pub fn resolve(&self, command: &str) -> Option<PathBuf> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(hit) = cache.get(command) {
                return hit.clone();
            }
        }

        // Concurrent misses may probe twice; the result is identical.
        let found = self
            .search_paths
            .iter()
            .map(|dir| dir.join(command))
            .find(|candidate| self.fs.is_executable(candidate));

        debug!(command, resolved = ?found, "tool lookup");

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.insert(command.to_string(), found.clone());
        found
    }

    /// First acceptable executable found for any of `names`.
    pub fn find_any(&self, names: &[&str]) -> Option<PathBuf> {
        names.iter().find_map(|name| self.resolve(name))
    }

    pub fn find(&self, tool: Tool) -> Option<PathBuf> {
        self.find_any(tool.executables())
    }

    /// Resolution result for every known tool.
    pub fn report(&self) -> Vec<(Tool, Option<PathBuf>)> {
        Tool::ALL.iter().map(|t| (*t, self.find(*t))).collect()
    }
}

/// Build the ordered, de-duplicated search path.
pub fn build_search_paths(
    path_var: Option<&std::ffi::OsStr>,
    home: Option<&Path>,
    extra_paths: &[PathBuf],
) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = path_var
        .map(|p| std::env::split_paths(p).collect())
        .unwrap_or_default();

    paths.extend(FALLBACK_DIRS.iter().map(PathBuf::from));

    if let Some(home) = home {
        paths.push(home.join("go").join("bin"));
    }

    paths.extend(extra_paths.iter().cloned());
    unique_paths(paths)
}

fn unique_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths
        .into_iter()
        .filter(|p| !p.as_os_str().is_empty())
        .filter(|p| seen.insert(p.clone()))
        .collect()
}
