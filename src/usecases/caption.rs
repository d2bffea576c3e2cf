//! Caption building for forwarded media.
//!
//! Order: base caption (caption, else filename) → optional enrichment from the parsed
//! title and looked-up year → optional template → optional bold markup.

use crate::domain::{Category, Classification, JobOptions, MessageView};
use crate::ports::{ClassifierPort, MetadataPort};
use bytesize::ByteSize;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct CaptionFormatter {
    classifier: Arc<dyn ClassifierPort>,
    metadata: Arc<dyn MetadataPort>,
}

impl CaptionFormatter {
    pub fn new(classifier: Arc<dyn ClassifierPort>, metadata: Arc<dyn MetadataPort>) -> Self {
        Self {
            classifier,
            metadata,
        }
    }

    /// Caption to send with `view`, or `None` when there is nothing to say.
    ///
    /// `parsed` is the classification already computed by the policy, if any.
    pub async fn format(
        &self,
        view: &MessageView,
        options: &JobOptions,
        parsed: Option<&Classification>,
    ) -> Option<String> {
        let base = view.title().map(str::to_string);

        let caption = match (&base, options.enrich_captions) {
            (Some(raw), true) => self.enrich(raw, parsed).await.or(base.clone()),
            _ => base.clone(),
        };

        let caption = match options.caption_template.as_deref() {
            Some(template) => Some(render_template(
                template,
                view.source_filename.as_deref().unwrap_or_default(),
                view.file_size,
                caption.as_deref().unwrap_or_default(),
            )),
            None => caption,
        };

        caption
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .map(|c| {
                if options.bold_caption {
                    format!("**{c}**")
                } else {
                    c
                }
            })
    }

    async fn enrich(&self, raw: &str, parsed: Option<&Classification>) -> Option<String> {
        let cls = match parsed {
            Some(c) => c.clone(),
            None => match self.classifier.classify_title(raw) {
                Ok(c) => c,
                Err(e) => {
                    debug!(error = %e, "caption parse failed, keeping original");
                    return None;
                }
            },
        };
        if !cls.accepted || cls.category == Category::Unknown || cls.title.is_empty() {
            return None;
        }

        let year = match cls.year {
            Some(y) => Some(y),
            None => match self
                .metadata
                .lookup_year(&cls.title, cls.category, cls.season)
                .await
            {
                Ok(y) => y,
                Err(e) => {
                    warn!(title = %cls.title, error = %e, "year lookup failed");
                    None
                }
            },
        };
        Some(enriched_caption(&cls, year))
    }
}

/// `Name (Year) S01 E01 quality audio` for series, `Name (Year) quality audio` for movies.
pub fn enriched_caption(cls: &Classification, year: Option<u16>) -> String {
    let mut parts = vec![cls.title.clone()];
    if let Some(y) = year {
        parts.push(format!("({y})"));
    }
    if cls.category == Category::Series {
        if let Some(season) = cls.season {
            parts.push(format!("S{season:02}"));
        }
        match cls.episodes {
            Some(eps) => parts.push(eps.to_string()),
            None => parts.push("Complete".to_string()),
        }
    }
    parts.extend(cls.quality.clone());
    parts.extend(cls.audio.clone());
    parts.join(" ")
}

/// Replace `{file_name}`, `{file_size}` and `{caption}`. Other braces are left alone.
pub fn render_template(template: &str, file_name: &str, file_size: Option<u64>, caption: &str) -> String {
    let size = file_size
        .map(|b| ByteSize::b(b).to_string())
        .unwrap_or_default();
    template
        .replace("{file_name}", file_name)
        .replace("{file_size}", &size)
        .replace("{caption}", caption)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::classify::TitleParser;
    use crate::domain::MediaKind;
    use crate::usecases::fakes::{FakeMetadata, media};
    use std::sync::atomic::Ordering;

    fn formatter(metadata: Arc<FakeMetadata>) -> CaptionFormatter {
        CaptionFormatter::new(Arc::new(TitleParser::new()), metadata)
    }

    #[tokio::test]
    async fn plain_caption_passes_through() {
        let f = formatter(Arc::new(FakeMetadata::default()));
        let view = media(1, MediaKind::Video, Some("Dune 2021 1080p"), None);
        assert_eq!(
            f.format(&view, &JobOptions::default(), None).await,
            Some("Dune 2021 1080p".to_string())
        );
    }

    #[tokio::test]
    async fn no_caption_no_filename_is_none() {
        let f = formatter(Arc::new(FakeMetadata::default()));
        let view = media(1, MediaKind::Video, None, None);
        assert_eq!(f.format(&view, &JobOptions::default(), None).await, None);
    }

    #[tokio::test]
    async fn template_and_bold() {
        let f = formatter(Arc::new(FakeMetadata::default()));
        let view = media(1, MediaKind::Document, Some("orig"), Some("movie.mkv"));
        let options = JobOptions {
            caption_template: Some("{file_name} | {caption} | {unknown}".into()),
            bold_caption: true,
            ..JobOptions::default()
        };
        assert_eq!(
            f.format(&view, &options, None).await,
            Some("**movie.mkv | orig | {unknown}**".to_string())
        );
    }

    #[tokio::test]
    async fn enrichment_looks_up_missing_year() {
        let metadata = Arc::new(FakeMetadata::default().with_year("Dark", 2017));
        let f = formatter(metadata.clone());
        let view = media(1, MediaKind::Video, None, Some("Dark.S01E03.720p.mkv"));
        let options = JobOptions {
            enrich_captions: true,
            ..JobOptions::default()
        };

        let caption = f.format(&view, &options, None).await;

        assert_eq!(caption, Some("Dark (2017) S01 E03 720p".to_string()));
        assert_eq!(metadata.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn enrichment_skips_lookup_when_year_known() {
        let metadata = Arc::new(FakeMetadata::default());
        let f = formatter(metadata.clone());
        let view = media(1, MediaKind::Video, Some("Inception 2010 1080p Dual Audio"), None);
        let options = JobOptions {
            enrich_captions: true,
            ..JobOptions::default()
        };

        let caption = f.format(&view, &options, None).await;

        assert_eq!(
            caption,
            Some("Inception (2010) 1080p Dual Audio".to_string())
        );
        assert_eq!(metadata.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn file_size_is_human_readable() {
        let out = render_template("{file_size}", "", Some(2_000_000), "");
        assert_eq!(out, ByteSize::b(2_000_000).to_string());
        assert_eq!(render_template("[{file_size}]", "", None, ""), "[]");
    }
}
