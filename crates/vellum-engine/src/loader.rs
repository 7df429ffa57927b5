// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Search-path template loading for `include` and `extends`.

use std::fs;
use std::path::PathBuf;

use log::{debug, warn};

use crate::Template;

/// Resolves template names to parsed templates via an ordered search-path
/// list.
///
/// The lookup contract is `Template | absent`: the first search path
/// containing the named file wins, and a file that exists but fails to
/// parse counts as absent. No caching — every load re-reads and re-parses.
pub struct TemplateLoader {
    paths: Vec<PathBuf>,
}

impl TemplateLoader {
    /// Creates a loader over the given search paths, consulted in order.
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    /// The search paths, used to build "not found" diagnostics.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Loads and parses the named template, or returns `None`.
    pub fn load_template(&self, name: &str) -> Option<Template> {
        for dir in &self.paths {
            let candidate = dir.join(name);
            debug!("looking for template {name:?} at {}", candidate.display());

            let Ok(source) = fs::read_to_string(&candidate) else {
                continue;
            };

            return match Template::parse_str(name, &source) {
                Ok(template) => Some(template),
                Err(err) => {
                    warn!("template {name:?} at {} failed to parse: {err}", candidate.display());
                    None
                }
            };
        }

        None
    }
}
