//! Style templates: an HTML file split around the line carrying the marker
//! tag, giving the header written before converted content and the footer
//! written after it.

use crate::config::{Settings, DEFAULT_MARKER};
use regex::bytes::Regex;
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::{Path, PathBuf},
};
use tracing::debug;

/// Longest template line read in one piece; longer lines are scanned in parts.
const MAX_LINE_LEN: usize = 8192;

/// Case-insensitive, unanchored glob identifying the marker line.
#[derive(Debug, Clone)]
pub struct Marker {
    regex: Regex,
}

impl Marker {
    /// Build from a glob where `*` matches any run of bytes and `?` any
    /// single byte.
    pub fn from_glob(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::new();
        for ch in pattern.to_ascii_lowercase().chars() {
            match ch {
                '*' => expr.push_str("(?s-u:.*)"),
                '?' => expr.push_str("(?s-u:.)"),
                ch => expr.push_str(&regex::escape(ch.encode_utf8(&mut [0; 4]))),
            }
        }
        Ok(Self {
            regex: Regex::new(&expr)?,
        })
    }

    pub fn matches(&self, line: &[u8]) -> bool {
        let lower = line.to_ascii_lowercase();
        self.regex.is_match(&lower)
    }
}

impl Default for Marker {
    fn default() -> Self {
        Self::from_glob(DEFAULT_MARKER).expect("default marker is a valid pattern")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSplit {
    pub header: Vec<u8>,
    pub footer: Vec<u8>,
    /// Whether the header and footer came from a template file.
    pub found: bool,
}

impl TemplateSplit {
    /// The minimal page shell used when no template is usable.
    pub fn synthetic(title: &str) -> Self {
        let header = format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{}</title></head>\n<body>\n",
            escape_html(title)
        );
        Self {
            header: header.into_bytes(),
            footer: b"</body>\n</html>\n".to_vec(),
            found: false,
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            ch => escaped.push(ch),
        }
    }
    escaped
}

/// Which template a request asked for, and where templates live. Built
/// fresh for every request.
#[derive(Debug, Clone)]
pub struct StyleSelection {
    pub requested: Option<String>,
    pub default_name: Option<String>,
    pub base_path: PathBuf,
    pub extension: String,
}

enum Resolution {
    Unresolved,
    Explicit(String),
    Default(String),
    Template(TemplateSplit),
    Synthetic,
}

impl StyleSelection {
    pub fn new(settings: &Settings, requested: Option<&str>) -> Self {
        Self {
            requested: requested.filter(|name| !name.is_empty()).map(str::to_owned),
            default_name: settings.style.default_name.clone(),
            base_path: settings
                .style
                .path
                .clone()
                .unwrap_or_else(|| settings.document_root.clone()),
            extension: settings.style.extension.clone(),
        }
    }

    /// Resolve to a template split, falling back to the default style and
    /// then to the synthetic shell. The default style is retried both when
    /// the first file cannot be opened and when it has no marker line.
    pub fn resolve(&self, marker: &Marker, title: &str) -> TemplateSplit {
        let mut state = Resolution::Unresolved;
        loop {
            state = match state {
                Resolution::Unresolved => {
                    match self.requested.as_ref().or(self.default_name.as_ref()) {
                        Some(name) => Resolution::Explicit(name.clone()),
                        None => Resolution::Synthetic,
                    }
                }
                Resolution::Explicit(name) => match self.load(&name, marker) {
                    Some(split) => Resolution::Template(split),
                    None => match &self.default_name {
                        Some(name) => Resolution::Default(name.clone()),
                        None => Resolution::Synthetic,
                    },
                },
                Resolution::Default(name) => match self.load(&name, marker) {
                    Some(split) => Resolution::Template(split),
                    None => Resolution::Synthetic,
                },
                Resolution::Template(split) => return split,
                Resolution::Synthetic => return TemplateSplit::synthetic(title),
            };
        }
    }

    fn path_for(&self, name: &str) -> Option<PathBuf> {
        if name.contains(['/', '\\']) || name.contains("..") {
            return None;
        }
        Some(self.base_path.join(format!("{name}{}", self.extension)))
    }

    fn load(&self, name: &str, marker: &Marker) -> Option<TemplateSplit> {
        let Some(path) = self.path_for(name) else {
            debug!(style = name, "style name is not a plain file name");
            return None;
        };
        match split_template(&path, marker) {
            Ok(Some(split)) => Some(split),
            Ok(None) => {
                debug!(path = %path.display(), "style file has no marker line");
                None
            }
            Err(err) => {
                debug!(path = %path.display(), error = %err, "style file could not be read");
                None
            }
        }
    }
}

/// Split the file at `path` after the first line matching `marker`.
/// Returns `Ok(None)` when no line matches; nothing of the scanned header
/// survives in that case.
pub fn split_template(path: &Path, marker: &Marker) -> io::Result<Option<TemplateSplit>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut header = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .by_ref()
            .take(MAX_LINE_LEN as u64)
            .read_until(b'\n', &mut line)?;
        if read == 0 {
            return Ok(None);
        }

        header.extend_from_slice(&line);
        if marker.matches(&line) {
            let mut footer = Vec::new();
            reader.read_to_end(&mut footer)?;
            return Ok(Some(TemplateSplit {
                header,
                footer,
                found: true,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TEMPLATE: &str = "<html>\n<BODY class=\"x\">\n<p>footer</p>\n</html>\n";

    fn selection(dir: &TempDir, requested: Option<&str>, default: Option<&str>) -> StyleSelection {
        StyleSelection {
            requested: requested.map(str::to_owned),
            default_name: default.map(str::to_owned),
            base_path: dir.path().to_path_buf(),
            extension: ".html".into(),
        }
    }

    #[test]
    fn marker_glob_matches_case_insensitively() {
        let marker = Marker::default();
        assert!(marker.matches(b"<body>\n"));
        assert!(marker.matches(b"  <BODY class=\"x\" id='y'>\n"));
        assert!(!marker.matches(b"<head>\n"));
        assert!(!marker.matches(b"</body>\n"));

        let marker = Marker::from_glob("<main?>").unwrap();
        assert!(marker.matches(b"<MAIN1>"));
        assert!(!marker.matches(b"<main>"));

        let marker = Marker::from_glob("[x]*(y)").unwrap();
        assert!(marker.matches(b"a [X] and (Y)"));
    }

    #[test]
    fn splits_at_marker_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.html");
        fs::write(&path, TEMPLATE).unwrap();

        let split = split_template(&path, &Marker::default()).unwrap().unwrap();

        assert_eq!(split.header, b"<html>\n<BODY class=\"x\">\n");
        assert_eq!(split.footer, b"<p>footer</p>\n</html>\n");
        assert!(split.found);
    }

    #[test]
    fn marker_on_last_line_leaves_empty_footer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site.html");
        fs::write(&path, "<html><body>").unwrap();

        let split = split_template(&path, &Marker::default()).unwrap().unwrap();

        assert_eq!(split.header, b"<html><body>");
        assert!(split.footer.is_empty());
    }

    #[test]
    fn template_without_marker_is_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.html");
        fs::write(&path, "<html>\n<p>no marker</p>\n</html>\n").unwrap();

        assert_eq!(split_template(&path, &Marker::default()).unwrap(), None);
    }

    #[test]
    fn requested_style_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("site.html"), TEMPLATE).unwrap();
        fs::write(dir.path().join("fallback.html"), "<body>\nother\n").unwrap();

        let split = selection(&dir, Some("site"), Some("fallback")).resolve(&Marker::default(), "t");

        assert!(split.found);
        assert_eq!(split.footer, b"<p>footer</p>\n</html>\n");
    }

    #[test]
    fn missing_style_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fallback.html"), "<body>\nother\n").unwrap();

        let split =
            selection(&dir, Some("missing"), Some("fallback")).resolve(&Marker::default(), "t");

        assert!(split.found);
        assert_eq!(split.header, b"<body>\n");
        assert_eq!(split.footer, b"other\n");
    }

    #[test]
    fn markerless_style_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain.html"), "<p>nothing</p>\n").unwrap();
        fs::write(dir.path().join("fallback.html"), "<body>\nother\n").unwrap();

        let split =
            selection(&dir, Some("plain"), Some("fallback")).resolve(&Marker::default(), "t");

        assert!(split.found);
        assert_eq!(split.header, b"<body>\n");
    }

    #[test]
    fn default_used_when_nothing_requested() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("fallback.html"), TEMPLATE).unwrap();

        let split = selection(&dir, None, Some("fallback")).resolve(&Marker::default(), "t");

        assert!(split.found);
    }

    #[test]
    fn unusable_styles_yield_synthetic_shell() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("plain.html"), "<p>nothing</p>\n").unwrap();
        let marker = Marker::default();
        let shell = TemplateSplit::synthetic("Docs");

        assert_eq!(selection(&dir, None, None).resolve(&marker, "Docs"), shell);
        assert_eq!(selection(&dir, Some("plain"), None).resolve(&marker, "Docs"), shell);
        assert_eq!(
            selection(&dir, Some("missing"), Some("plain")).resolve(&marker, "Docs"),
            shell
        );
        assert_eq!(
            selection(&dir, Some("plain"), Some("missing")).resolve(&marker, "Docs"),
            shell
        );
    }

    #[test]
    fn path_like_style_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("site.html"), TEMPLATE).unwrap();

        let split = selection(&dir, Some("nested/site"), None).resolve(&Marker::default(), "t");

        assert!(!split.found);
    }

    #[test]
    fn synthetic_shell_escapes_title() {
        let shell = TemplateSplit::synthetic("A & <B>");

        assert_eq!(
            shell.header,
            b"<!DOCTYPE html>\n<html>\n<head><title>A &amp; &lt;B&gt;</title></head>\n<body>\n"
        );
        assert_eq!(shell.footer, b"</body>\n</html>\n");
        assert!(!shell.found);
    }
}
