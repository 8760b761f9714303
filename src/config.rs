use crate::{buffer::READ_UNIT, error::ConfigError, style::Marker};
use clap::{builder::BoolishValueParser, Parser, ValueEnum};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

pub const DEFAULT_MARKER: &str = "<body*>";
pub const DEFAULT_TITLE: &str = "Markdown Proxy";
pub const DEFAULT_STYLE_EXTENSION: &str = ".html";
const DEFAULT_MAX_FORM_BYTES: usize = 1024 * 1024;

/// Command-line arguments for the mdgate binary.
#[derive(Debug, Parser)]
#[command(name = "mdgate", version, about = "Serve Markdown as styled HTML")]
pub struct CliArgs {
    /// Address to listen on.
    #[arg(long, env = "MDGATE_LISTEN", default_value = "127.0.0.1:9000")]
    pub listen: SocketAddr,

    /// Directory request paths are resolved against.
    #[arg(long, env = "MDGATE_DOCUMENT_ROOT", default_value = ".", value_name = "PATH")]
    pub document_root: PathBuf,

    /// Directory holding style templates. Defaults to the document root.
    #[arg(long, env = "MDGATE_STYLE_PATH", value_name = "PATH")]
    pub style_path: Option<PathBuf>,

    /// Style used when a request names none, or names one that is unusable.
    #[arg(long, env = "MDGATE_STYLE_DEFAULT", value_name = "NAME")]
    pub style_default: Option<String>,

    /// File extension appended to style names.
    #[arg(long, env = "MDGATE_STYLE_EXTENSION", default_value = DEFAULT_STYLE_EXTENSION)]
    pub style_extension: String,

    /// Absolute path of the page served when a request yields no content.
    #[arg(long, env = "MDGATE_PAGE_DEFAULT", value_name = "PATH")]
    pub page_default: Option<PathBuf>,

    /// Glob locating the insertion line in a style template.
    #[arg(long, env = "MDGATE_MARKER", default_value = DEFAULT_MARKER)]
    pub marker: String,

    /// Title of the built-in page shell.
    #[arg(long, env = "MDGATE_DEFAULT_TITLE", default_value = DEFAULT_TITLE)]
    pub default_title: String,

    /// Buffer growth increment in bytes.
    #[arg(long, env = "MDGATE_READ_UNIT", default_value_t = READ_UNIT)]
    pub read_unit: usize,

    /// Markdown extension to enable; may be repeated.
    #[arg(long = "extension", env = "MDGATE_EXTENSIONS", value_enum, value_delimiter = ',')]
    pub extensions: Vec<Extension>,

    /// Pass raw HTML in Markdown sources through unescaped.
    #[arg(long, env = "MDGATE_UNSAFE_HTML")]
    pub unsafe_html: bool,

    /// Honor the `raw` request parameter.
    #[arg(
        long,
        env = "MDGATE_RAW_SUPPORT",
        value_name = "BOOL",
        default_value = "true",
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub raw_support: bool,

    /// Remote fetch connect timeout in seconds.
    #[arg(long, env = "MDGATE_FETCH_CONNECT_TIMEOUT", default_value_t = 30)]
    pub fetch_connect_timeout: u64,

    /// Remote fetch total timeout in seconds.
    #[arg(long, env = "MDGATE_FETCH_TIMEOUT", default_value_t = 60)]
    pub fetch_timeout: u64,

    /// Largest accepted form body in bytes.
    #[arg(long, env = "MDGATE_MAX_FORM_BYTES", default_value_t = DEFAULT_MAX_FORM_BYTES)]
    pub max_form_bytes: usize,

    /// Base log level (trace|debug|info|warn|error); RUST_LOG takes precedence.
    #[arg(long, env = "MDGATE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Markdown syntax extensions understood by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Extension {
    Autolink,
    Strikethrough,
    Superscript,
    Tables,
    Tasklist,
    Footnotes,
    DescriptionLists,
    Tagfilter,
}

#[derive(Debug, Clone)]
pub struct StyleSettings {
    pub path: Option<PathBuf>,
    pub default_name: Option<String>,
    pub extension: String,
    pub marker: Marker,
    pub default_title: String,
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

/// Immutable configuration shared by every request.
#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub document_root: PathBuf,
    pub page_default: Option<PathBuf>,
    pub read_unit: usize,
    pub style: StyleSettings,
    pub extensions: Vec<Extension>,
    pub unsafe_html: bool,
    pub raw_support: bool,
    pub fetch: FetchSettings,
    pub max_form_bytes: usize,
}

impl Settings {
    pub fn from_cli(args: &CliArgs) -> Result<Self, ConfigError> {
        if args.read_unit == 0 {
            return Err(ConfigError::ZeroReadUnit);
        }
        if let Some(page) = &args.page_default {
            if !page.is_absolute() {
                return Err(ConfigError::RelativePageDefault(page.display().to_string()));
            }
        }

        let marker = Marker::from_glob(&args.marker).map_err(|source| ConfigError::Marker {
            pattern: args.marker.clone(),
            source,
        })?;

        Ok(Self {
            listen: args.listen,
            document_root: args.document_root.clone(),
            page_default: args.page_default.clone(),
            read_unit: args.read_unit,
            style: StyleSettings {
                path: args.style_path.clone(),
                default_name: args.style_default.clone().filter(|name| !name.is_empty()),
                extension: args.style_extension.clone(),
                marker,
                default_title: args.default_title.clone(),
            },
            extensions: args.extensions.clone(),
            unsafe_html: args.unsafe_html,
            raw_support: args.raw_support,
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(args.fetch_connect_timeout),
                timeout: Duration::from_secs(args.fetch_timeout),
            },
            max_form_bytes: args.max_form_bytes,
        })
    }

    /// Settings with every option at its default, rooted at `document_root`.
    pub fn with_document_root(document_root: impl Into<PathBuf>) -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 9000)),
            document_root: document_root.into(),
            page_default: None,
            read_unit: READ_UNIT,
            style: StyleSettings {
                path: None,
                default_name: None,
                extension: DEFAULT_STYLE_EXTENSION.to_string(),
                marker: Marker::default(),
                default_title: DEFAULT_TITLE.to_string(),
            },
            extensions: Vec::new(),
            unsafe_html: false,
            raw_support: true,
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(30),
                timeout: Duration::from_secs(60),
            },
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
        }
    }
}
