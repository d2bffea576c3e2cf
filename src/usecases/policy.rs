//! Per-message forwarding policy: which messages are skipped and why.
//!
//! Runs the synchronous checks (tombstone, media kind, category filter). The duplicate
//! check needs the network and is done by the job after a message passes screening.

use crate::domain::{Category, Classification, JobOptions, MediaKind, MessageView};
use crate::ports::ClassifierPort;
use tracing::debug;

/// Media kinds forwarded by the classification modes.
const CLASSIFIED_KINDS: &[MediaKind] = &[MediaKind::Document, MediaKind::Video];

/// Media kinds forwarded by the unfiltered clone mode.
const CLONE_KINDS: &[MediaKind] = &[
    MediaKind::Photo,
    MediaKind::Document,
    MediaKind::Audio,
    MediaKind::Sticker,
    MediaKind::Video,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Deleted,
    NonMedia,
    Unsupported(MediaKind),
    CategoryMismatch(Category),
    Duplicate,
}

/// Counter bucket a skip lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipBucket {
    Deleted,
    NonMedia,
    Duplicate,
}

impl SkipReason {
    pub fn bucket(&self) -> SkipBucket {
        match self {
            SkipReason::Deleted => SkipBucket::Deleted,
            SkipReason::Duplicate => SkipBucket::Duplicate,
            SkipReason::NonMedia
            | SkipReason::Unsupported(_)
            | SkipReason::CategoryMismatch(_) => SkipBucket::NonMedia,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Re-send media by its cached file reference.
    CachedMedia,
    /// Copy the whole message.
    Copy,
}

/// A message that passed screening.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub delivery: Delivery,
    /// Present when a category filter ran; reused for caption enrichment.
    pub classification: Option<Classification>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Screening {
    Skip(SkipReason),
    Forward(Candidate),
}

/// Apply steps 1–5 of the forwarding policy to one message.
pub fn screen(
    view: &MessageView,
    options: &JobOptions,
    classifier: &dyn ClassifierPort,
) -> Screening {
    if view.is_empty {
        return Screening::Skip(SkipReason::Deleted);
    }

    let Some(kind) = view.media_kind else {
        if options.forward_non_media {
            return Screening::Forward(Candidate {
                delivery: Delivery::Copy,
                classification: None,
            });
        }
        return Screening::Skip(SkipReason::NonMedia);
    };

    let accepted = if options.unfiltered_clone {
        CLONE_KINDS
    } else {
        CLASSIFIED_KINDS
    };
    if !accepted.contains(&kind) {
        return Screening::Skip(SkipReason::Unsupported(kind));
    }

    let delivery = if view.file_reference.is_some() {
        Delivery::CachedMedia
    } else {
        Delivery::Copy
    };

    let wanted = category_filter(options);
    if options.unfiltered_clone || wanted.is_none() {
        return Screening::Forward(Candidate {
            delivery,
            classification: None,
        });
    }

    let classification = classify(view, classifier);
    if !classification.accepted || Some(classification.category) != wanted {
        return Screening::Skip(SkipReason::CategoryMismatch(classification.category));
    }
    Screening::Forward(Candidate {
        delivery,
        classification: Some(classification),
    })
}

fn category_filter(options: &JobOptions) -> Option<Category> {
    match (options.movie_only, options.series_only) {
        (true, false) => Some(Category::Movie),
        (false, true) => Some(Category::Series),
        _ => None,
    }
}

/// Classify the caption (or filename). Parser failures degrade to "unclassified".
fn classify(view: &MessageView, classifier: &dyn ClassifierPort) -> Classification {
    let Some(title) = view.title() else {
        return Classification::unclassified();
    };
    classifier.classify_title(title).unwrap_or_else(|e| {
        debug!(msg_id = view.id, error = %e, "title classification failed");
        Classification::unclassified()
    })
}
