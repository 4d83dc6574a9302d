use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;
use xsweep_core::{ErrorInfo, SweepError};
use xsweep_exp::from_yaml_str;

/// Provider name under which the bundled sweeper configs are registered.
pub const BUNDLED_PROVIDER: &str = "xsweep-explicit";
/// Package path of the bundled sweeper configs.
pub const BUNDLED_PACKAGE: &str = "pkg://xsweep_host.conf";

const PKG_SCHEME: &str = "pkg://";
const FILE_SCHEME: &str = "file://";

const BUNDLED_FILES: &[(&str, &str)] = &[(
    "sweeper/explicit.yaml",
    include_str!("../conf/sweeper/explicit.yaml"),
)];

/// One place configs are looked up in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPathEntry {
    pub provider: String,
    pub path: String,
}

enum Source<'a> {
    Bundled,
    Directory(PathBuf),
    UnknownPackage(&'a str),
}

impl SearchPathEntry {
    fn source(&self) -> Source<'_> {
        if let Some(package) = self.path.strip_prefix(PKG_SCHEME) {
            if self.path == BUNDLED_PACKAGE {
                Source::Bundled
            } else {
                Source::UnknownPackage(package)
            }
        } else {
            let dir = self.path.strip_prefix(FILE_SCHEME).unwrap_or(&self.path);
            Source::Directory(PathBuf::from(dir))
        }
    }

    fn read(&self, relative: &str) -> Result<Option<String>, SweepError> {
        match self.source() {
            Source::Bundled => Ok(BUNDLED_FILES
                .iter()
                .find(|(path, _)| *path == relative)
                .map(|(_, text)| text.to_string())),
            Source::Directory(dir) => {
                let path = dir.join(relative);
                if !path.is_file() {
                    return Ok(None);
                }
                fs::read_to_string(&path).map(Some).map_err(|err| {
                    SweepError::Serde(
                        ErrorInfo::new("xsweep.search_path.read", err.to_string())
                            .with_context("path", path.display().to_string()),
                    )
                })
            }
            Source::UnknownPackage(package) => Err(unknown_package(self, package)),
        }
    }

    fn options(&self, group: &str) -> Result<BTreeSet<String>, SweepError> {
        match self.source() {
            Source::Bundled => {
                let prefix = format!("{group}/");
                Ok(BUNDLED_FILES
                    .iter()
                    .filter_map(|(path, _)| path.strip_prefix(&prefix))
                    .filter_map(|file| file.strip_suffix(".yaml"))
                    .map(str::to_string)
                    .collect())
            }
            Source::Directory(dir) => Ok(yaml_stems(&dir.join(group))),
            Source::UnknownPackage(package) => Err(unknown_package(self, package)),
        }
    }
}

fn unknown_package(entry: &SearchPathEntry, package: &str) -> SweepError {
    SweepError::Registry(
        ErrorInfo::new(
            "xsweep.search_path.unknown_package",
            format!("no bundled configs for package {package}"),
        )
        .with_context("provider", entry.provider.clone()),
    )
}

fn yaml_stems(dir: &Path) -> BTreeSet<String> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let path = entry.path();
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml") | Some("yml") => path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string),
                _ => None,
            }
        })
        .collect()
}

/// Ordered list of config sources; earlier entries shadow later ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSearchPath {
    entries: Vec<SearchPathEntry>,
}

impl ConfigSearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, provider: impl Into<String>, path: impl Into<String>) {
        self.entries.push(SearchPathEntry {
            provider: provider.into(),
            path: path.into(),
        });
    }

    pub fn prepend(&mut self, provider: impl Into<String>, path: impl Into<String>) {
        self.entries.insert(
            0,
            SearchPathEntry {
                provider: provider.into(),
                path: path.into(),
            },
        );
    }

    pub fn entries(&self) -> &[SearchPathEntry] {
        &self.entries
    }

    /// Loads `group/name.yaml` from the first entry that provides it.
    pub fn load(&self, group: &str, name: &str) -> Result<Value, SweepError> {
        let relative = format!("{group}/{name}.yaml");
        for entry in &self.entries {
            if let Some(text) = entry.read(&relative)? {
                debug!("resolved {} from {} ({})", relative, entry.path, entry.provider);
                let value: Value = from_yaml_str(&text)?;
                return Ok(value);
            }
        }
        let available = self.list_options(group)?;
        Err(SweepError::Registry(
            ErrorInfo::new(
                "xsweep.search_path.option_not_found",
                format!("could not find '{group}/{name}'"),
            )
            .with_context("group", group)
            .with_context("option", name)
            .with_hint(format!(
                "available options: {}",
                available.into_iter().collect::<Vec<_>>().join(", ")
            )),
        ))
    }

    /// Names of every option of `group` across all entries.
    pub fn list_options(&self, group: &str) -> Result<BTreeSet<String>, SweepError> {
        let mut names = BTreeSet::new();
        for entry in &self.entries {
            names.extend(entry.options(group)?);
        }
        Ok(names)
    }

    /// Options of `group` provided by one entry.
    pub fn entry_options(
        &self,
        entry: &SearchPathEntry,
        group: &str,
    ) -> Result<BTreeSet<String>, SweepError> {
        entry.options(group)
    }
}

/// Contributes configuration sources to a search path.
pub trait SearchPathPlugin {
    fn manipulate_search_path(&self, search_path: &mut ConfigSearchPath);
}

/// Adds the bundled sweeper configs so `sweeper: explicit` resolves by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitSweeperSearchPathPlugin;

impl SearchPathPlugin for ExplicitSweeperSearchPathPlugin {
    fn manipulate_search_path(&self, search_path: &mut ConfigSearchPath) {
        search_path.append(BUNDLED_PROVIDER, BUNDLED_PACKAGE);
    }
}

/// Search path with user config directories first, then plugin contributions.
pub fn build_search_path(
    config_dirs: &[PathBuf],
    plugins: &[&dyn SearchPathPlugin],
) -> ConfigSearchPath {
    let mut search_path = ConfigSearchPath::new();
    for dir in config_dirs {
        search_path.append("command-line", format!("{FILE_SCHEME}{}", dir.display()));
    }
    for plugin in plugins {
        plugin.manipulate_search_path(&mut search_path);
    }
    search_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_explicit_config_resolves() {
        let mut search_path = ConfigSearchPath::new();
        ExplicitSweeperSearchPathPlugin.manipulate_search_path(&mut search_path);
        assert_eq!(search_path.entries()[0].provider, BUNDLED_PROVIDER);
        let node = search_path.load("sweeper", "explicit").expect("bundled");
        assert_eq!(node["_target_"], "explicit");
        assert_eq!(node["seed_key"], "seed");
        let options = search_path.list_options("sweeper").expect("options");
        assert!(options.contains("explicit"));
    }

    #[test]
    fn missing_option_lists_alternatives() {
        let search_path = build_search_path(&[], &[&ExplicitSweeperSearchPathPlugin]);
        let err = search_path.load("sweeper", "grid").expect_err("missing");
        assert_eq!(err.info().code, "xsweep.search_path.option_not_found");
        assert_eq!(err.info().hint.as_deref(), Some("available options: explicit"));
    }

    #[test]
    fn unknown_package_is_rejected() {
        let mut search_path = ConfigSearchPath::new();
        search_path.append("other", "pkg://somewhere.conf");
        let err = search_path.load("sweeper", "explicit").expect_err("unknown");
        assert_eq!(err.info().code, "xsweep.search_path.unknown_package");
    }
}
