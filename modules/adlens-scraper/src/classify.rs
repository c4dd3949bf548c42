use tracing::debug;

use crate::traits::ScrapedAd;

/// Result of validating a raw result batch.
#[derive(Debug, Default)]
pub struct Classified {
    pub kept: Vec<ScrapedAd>,
    /// Records lacking both an archive id and a provider-internal ad id.
    pub skipped_no_id: usize,
    /// Records whose extracted media set was completely empty.
    pub skipped_no_media: usize,
}

impl Classified {
    pub fn skipped(&self) -> usize {
        self.skipped_no_id + self.skipped_no_media
    }
}

/// Two validation passes over the raw provider payload. A creative without
/// an identifier cannot be stored; one without any media asset is not
/// useful and is dropped rather than stored.
pub fn classify(records: Vec<ScrapedAd>) -> Classified {
    let mut result = Classified::default();

    for record in records {
        if record.item.archive_id().is_none() {
            result.skipped_no_id += 1;
            continue;
        }
        if record.item.media_sets().is_empty() {
            debug!(
                ad_archive_id = record.item.archive_id().unwrap_or_default(),
                "Dropping creative with no media assets"
            );
            result.skipped_no_media += 1;
            continue;
        }
        result.kept.push(record);
    }

    result
}
