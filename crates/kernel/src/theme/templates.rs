//! Page template discovery.
//!
//! A theme declares a page template by putting a `Template Name: <label>`
//! line in a file's header comment. Files are looked up in the theme root and
//! one directory below it; the template slug is the path relative to the root.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, warn};

/// Only the start of a file is searched for the header.
const HEADER_BYTES: u64 = 8 * 1024;

/// Page templates offered by the active theme.
pub struct TemplateRegistry {
    /// Theme directory (None = no theme on disk).
    dir: Option<PathBuf>,
    header: Regex,
    /// Last directory scan, dropped by [`TemplateRegistry::refresh`].
    cache: RwLock<Option<BTreeMap<String, String>>>,
    /// Templates registered in code, kept across refreshes.
    registered: DashMap<String, String>,
}

impl TemplateRegistry {
    /// Create a registry over a theme directory.
    pub fn new(dir: Option<PathBuf>) -> Result<Self> {
        let header = Regex::new(r"(?mi)^[ \t/*#@]*Template Name:(.*)$")
            .context("invalid template header pattern")?;

        Ok(Self {
            dir,
            header,
            cache: RwLock::new(None),
            registered: DashMap::new(),
        })
    }

    /// Registry with no theme directory.
    pub fn empty() -> Result<Self> {
        Self::new(None)
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Add a template without a file on disk.
    pub fn register(&self, slug: &str, label: &str) {
        self.registered.insert(slug.to_string(), label.to_string());
    }

    /// Forget the cached scan so the next lookup reads the directory again.
    pub fn refresh(&self) {
        *self.cache.write() = None;
    }

    /// Template slug -> label.
    pub fn page_templates(&self) -> BTreeMap<String, String> {
        let mut templates = self.scanned();
        for entry in &self.registered {
            templates.insert(entry.key().clone(), entry.value().clone());
        }
        templates
    }

    /// Is `slug` a known template. A miss rescans the theme once, so files
    /// added after startup are found without a restart.
    pub fn contains(&self, slug: &str) -> bool {
        if self.registered.contains_key(slug) || self.scanned().contains_key(slug) {
            return true;
        }
        if self.dir.is_none() {
            return false;
        }
        self.refresh();
        self.scanned().contains_key(slug)
    }

    /// Sorted template slugs.
    pub fn slugs(&self) -> Vec<String> {
        self.page_templates().into_keys().collect()
    }

    fn scanned(&self) -> BTreeMap<String, String> {
        if let Some(cached) = self.cache.read().as_ref() {
            return cached.clone();
        }

        let scanned = match &self.dir {
            Some(dir) => self.scan(dir),
            None => BTreeMap::new(),
        };
        *self.cache.write() = Some(scanned.clone());
        scanned
    }

    fn scan(&self, root: &Path) -> BTreeMap<String, String> {
        let mut templates = BTreeMap::new();

        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %root.display(), error = %e, "theme directory not readable");
                return templates;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                if let Ok(children) = fs::read_dir(&path) {
                    for child in children.flatten() {
                        self.consider(root, &child.path(), &mut templates);
                    }
                }
            } else {
                self.consider(root, &path, &mut templates);
            }
        }

        debug!(dir = %root.display(), count = templates.len(), "scanned page templates");
        templates
    }

    fn consider(&self, root: &Path, path: &Path, templates: &mut BTreeMap<String, String>) {
        if !path.is_file() {
            return;
        }
        let Ok(relative) = path.strip_prefix(root) else {
            return;
        };
        let slug = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        match self.read_label(path) {
            Ok(Some(label)) => {
                templates.insert(slug, label);
            }
            Ok(None) => {}
            Err(e) => warn!(file = %path.display(), error = %e, "failed to read template header"),
        }
    }

    fn read_label(&self, path: &Path) -> Result<Option<String>> {
        let file = fs::File::open(path).context("failed to open template")?;
        let mut head = Vec::new();
        file.take(HEADER_BYTES)
            .read_to_end(&mut head)
            .context("failed to read template")?;
        let head = String::from_utf8_lossy(&head);

        Ok(self
            .header
            .captures(&head)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().trim_end_matches("*/").trim().to_string())
            .filter(|label| !label.is_empty()))
    }
}
