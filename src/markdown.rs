use crate::config::Extension;
use comrak::{markdown_to_html, ComrakOptions};

/// Markdown to HTML conversion.
pub trait Convert: Send + Sync {
    fn convert(&self, source: &[u8]) -> Vec<u8>;
}

#[derive(Debug, Clone, Default)]
pub struct ComrakConverter {
    options: ComrakOptions,
}

impl ComrakConverter {
    pub fn new(extensions: &[Extension], unsafe_html: bool) -> Self {
        let mut options = ComrakOptions::default();
        for extension in extensions {
            match extension {
                Extension::Autolink => options.extension.autolink = true,
                Extension::Strikethrough => options.extension.strikethrough = true,
                Extension::Superscript => options.extension.superscript = true,
                Extension::Tables => options.extension.table = true,
                Extension::Tasklist => options.extension.tasklist = true,
                Extension::Footnotes => options.extension.footnotes = true,
                Extension::DescriptionLists => options.extension.description_lists = true,
                Extension::Tagfilter => options.extension.tagfilter = true,
            }
        }
        options.render.unsafe_ = unsafe_html;
        Self { options }
    }
}

impl Convert for ComrakConverter {
    fn convert(&self, source: &[u8]) -> Vec<u8> {
        let source = String::from_utf8_lossy(source);
        markdown_to_html(&source, &self.options).into_bytes()
    }
}
