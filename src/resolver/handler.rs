//! Handler string parsing and entry file selection.
//!
//! # Handler grammar
//!
//! ```text
//! handler   := dir* stem ext? export?
//! dir       := segment "/"          (segment: one or more chars other than "/")
//! stem      := one or more chars other than "." and "/"
//! ext       := ".js" | ".jsx" | ".ts" | ".tsx"
//! export    := "." anything
//! ```
//!
//! `src/handlers/hello.handler` parses to dir `src/handlers`, stem `hello`;
//! `index.js.main` parses to dir ``, stem `index`, ext `.js`. A trailing slash
//! (`handlers/`) or an empty stem (`src/.handler`) does not parse.

use regex::Regex;
use std::sync::LazyLock;

static HANDLER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[^/\n]+/)*)([^./\n]+)((?:\.(?:jsx|js|tsx|ts))?)(?:\..*)?$")
        .expect("handler pattern is a valid regex")
});

/// The file-system part of a handler string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerPath {
    /// Directory relative to the project root, without trailing slash.
    pub dir: String,
    /// File name without extension.
    pub stem: String,
    /// Source extension spelled in the handler, including the dot.
    pub extension: Option<String>,
}

impl HandlerPath {
    /// Parse a handler string; `None` when it does not match the grammar.
    #[must_use]
    pub fn parse(handler: &str) -> Option<Self> {
        let captures = HANDLER_PATTERN.captures(handler)?;
        let dir = captures.get(1).map_or("", |m| m.as_str()).trim_end_matches('/');
        let stem = captures.get(2)?.as_str();
        let extension = captures.get(3).map(|m| m.as_str()).filter(|ext| !ext.is_empty());

        Some(Self {
            dir: dir.to_string(),
            stem: stem.to_string(),
            extension: extension.map(str::to_string),
        })
    }

    /// Entry key: the handler path up to and including the stem and extension.
    #[must_use]
    pub fn entry_key(&self) -> String {
        let name = self.file_prefix();
        if self.dir.is_empty() {
            name
        } else {
            format!("{}/{name}", self.dir)
        }
    }

    fn file_prefix(&self) -> String {
        match &self.extension {
            Some(ext) => format!("{}{ext}", self.stem),
            None => self.stem.clone(),
        }
    }

    /// Pick the source file for this handler among the names in its directory.
    ///
    /// With an explicit extension only the exact file name qualifies. Without
    /// one, candidates are `stem` itself and `stem.<ext>` where `<ext>` holds
    /// no further dot, so `hello.test.js` never competes with `hello.js`.
    /// A single candidate is returned as is; several candidates resolve to
    /// `stem.<backup_extension>`. No candidate yields `None`.
    #[must_use]
    pub fn select_file<S: AsRef<str>>(&self, files: &[S], backup_extension: &str) -> Option<String> {
        let candidates: Vec<&str> =
            files.iter().map(|name| name.as_ref()).filter(|name| self.is_candidate(name)).collect();

        match candidates.as_slice() {
            [] => None,
            [only] => Some((*only).to_string()),
            _ => Some(format!("{}.{backup_extension}", self.stem)),
        }
    }

    fn is_candidate(&self, file_name: &str) -> bool {
        if self.extension.is_some() {
            return file_name == self.file_prefix();
        }
        if file_name == self.stem {
            return true;
        }
        file_name
            .strip_prefix(self.stem.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .is_some_and(|ext| !ext.is_empty() && !ext.contains('.'))
    }
}
