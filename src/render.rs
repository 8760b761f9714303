use crate::{
    acquire::{Acquirer, ContentRequest},
    config::Settings,
    error::AcquireError,
    fetch::Fetch,
    markdown::Convert,
    style::{StyleSelection, TemplateSplit},
};
use std::sync::Arc;
use tracing::debug;

/// The bytes a request answers with, in write order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Source bytes exactly as acquired.
    Raw(Vec<u8>),
    Page {
        header: Vec<u8>,
        body: Vec<u8>,
        footer: Vec<u8>,
    },
}

impl Rendered {
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Raw(bytes) => bytes,
            Self::Page {
                mut header,
                body,
                footer,
            } => {
                header.reserve(body.len() + footer.len());
                header.extend_from_slice(&body);
                header.extend_from_slice(&footer);
                header
            }
        }
    }
}

/// Acquire, convert and wrap content for one request at a time. Holds only
/// read-only state, so one instance serves every request concurrently.
pub struct Pipeline {
    settings: Arc<Settings>,
    fetcher: Arc<dyn Fetch>,
    converter: Arc<dyn Convert>,
}

impl Pipeline {
    pub fn new(
        settings: Arc<Settings>,
        fetcher: Arc<dyn Fetch>,
        converter: Arc<dyn Convert>,
    ) -> Self {
        Self {
            settings,
            fetcher,
            converter,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn render(
        &self,
        request: &ContentRequest,
        style: Option<&str>,
    ) -> Result<Rendered, AcquireError> {
        let content = Acquirer::new(&self.settings, self.fetcher.as_ref())
            .acquire(request)
            .await?;

        if request.raw && !content.is_empty() {
            return Ok(Rendered::Raw(content.into_bytes()));
        }

        let body = if content.is_empty() {
            Vec::new()
        } else {
            self.converter.convert(content.as_bytes())
        };
        content.release();

        let template = self.template(style).await?;
        debug!(found = template.found, body = body.len(), "rendering page");

        Ok(Rendered::Page {
            header: template.header,
            body,
            footer: template.footer,
        })
    }

    async fn template(&self, style: Option<&str>) -> Result<TemplateSplit, AcquireError> {
        let selection = StyleSelection::new(&self.settings, style);
        let marker = self.settings.style.marker.clone();
        let title = self.settings.style.default_title.clone();

        tokio::task::spawn_blocking(move || selection.resolve(&marker, &title))
            .await
            .map_err(AcquireError::internal)
    }
}
