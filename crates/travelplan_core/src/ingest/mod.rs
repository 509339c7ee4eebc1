//! Catalog ingestion: walks a paginated artwork catalog and stores every
//! item as a place.
//!
//! # Responsibility
//! - Define the page shape returned by the catalog search API.
//! - Follow `pagination.next_url` until the catalog is exhausted.
//! - Upsert each item with get-or-create semantics.
//!
//! # Invariants
//! - Re-running ingestion is idempotent: no duplicate places and no title
//!   refresh for ids already stored.
//! - A URL is fetched at most once per run.
//!
//! Transport is supplied by the caller through [`CatalogSource`].

use crate::model::place::PlaceId;
use crate::repo::place_repo::PlaceRepository;
use crate::service::place_service::{PlaceService, PlaceServiceError};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Default artwork search endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://api.artic.edu/api/v1/artworks/search";
/// Largest page size the catalog accepts.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// One catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: PlaceId,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPagination {
    #[serde(default)]
    pub next_url: Option<String>,
}

/// One page of the catalog search response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub data: Vec<CatalogItem>,
    #[serde(default)]
    pub pagination: CatalogPagination,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("catalog request to `{url}` failed: {message}")]
    Fetch { url: String, message: String },
    #[error(transparent)]
    Place(#[from] PlaceServiceError),
}

/// Page transport used by [`ingest_catalog`].
pub trait CatalogSource {
    fn fetch_page(&self, url: &str) -> Result<CatalogPage, IngestError>;
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub pages: u32,
    /// Items seen across all pages.
    pub fetched: u32,
    pub created: u32,
    /// Items whose id was already stored.
    pub existing: u32,
    /// Items without a usable title or id.
    pub skipped: u32,
}

/// Ingestion stopped early; `partial` holds what was stored before.
#[derive(Debug, Error)]
#[error("catalog ingestion stopped after {} page(s): {source}", .partial.pages)]
pub struct IngestFailure {
    pub partial: IngestReport,
    #[source]
    pub source: IngestError,
}

/// Builds the first page URL for a catalog endpoint.
pub fn first_page_url(base_url: &str, limit: u32) -> String {
    let limit = limit.clamp(1, MAX_PAGE_LIMIT);
    let separator = if base_url.contains('?') { '&' } else { '?' };
    format!("{base_url}{separator}limit={limit}&page=1")
}

/// Walks the catalog from `start_url` and upserts every item.
pub fn ingest_catalog<S, R>(
    source: &S,
    places: &PlaceService<R>,
    start_url: &str,
) -> Result<IngestReport, IngestFailure>
where
    S: CatalogSource,
    R: PlaceRepository,
{
    let mut report = IngestReport::default();
    let mut seen_urls = HashSet::new();
    let mut next = Some(start_url.to_string());

    while let Some(url) = next.take() {
        if !seen_urls.insert(url.clone()) {
            warn!("event=catalog_ingest module=ingest status=stopped reason=repeated_url");
            break;
        }

        info!("event=catalog_page module=ingest status=start page={}", report.pages + 1);
        let page = match source.fetch_page(&url) {
            Ok(page) => page,
            Err(err) => {
                error!(
                    "event=catalog_page module=ingest status=error page={} error={}",
                    report.pages + 1,
                    err
                );
                return Err(IngestFailure {
                    partial: report,
                    source: err,
                });
            }
        };
        report.pages += 1;

        for item in page.data {
            report.fetched += 1;
            let Some(title) = item.title.as_deref() else {
                report.skipped += 1;
                continue;
            };

            match places.upsert_place(item.id, title) {
                Ok((_, true)) => report.created += 1,
                Ok((_, false)) => report.existing += 1,
                Err(PlaceServiceError::Validation(_)) => report.skipped += 1,
                Err(err) => {
                    return Err(IngestFailure {
                        partial: report,
                        source: err.into(),
                    })
                }
            }
        }

        next = page
            .pagination
            .next_url
            .filter(|value| !value.trim().is_empty());
    }

    info!(
        "event=catalog_ingest module=ingest status=ok pages={} fetched={} created={} existing={} skipped={}",
        report.pages, report.fetched, report.created, report.existing, report.skipped
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::{first_page_url, CatalogPage};

    #[test]
    fn first_page_url_clamps_limit_and_respects_existing_query() {
        assert_eq!(
            first_page_url("https://example.test/search", 500),
            "https://example.test/search?limit=100&page=1"
        );
        assert_eq!(
            first_page_url("https://example.test/search?q=cats", 0),
            "https://example.test/search?q=cats&limit=1&page=1"
        );
    }

    #[test]
    fn page_tolerates_missing_fields() {
        let page: CatalogPage = serde_json::from_str(
            r#"{"data":[{"id":4,"title":null},{"id":5}],"pagination":{"total":2}}"#,
        )
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert!(page.data[0].title.is_none());
        assert!(page.pagination.next_url.is_none());
    }
}
