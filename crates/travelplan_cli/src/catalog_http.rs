//! HTTP transport for catalog ingestion.

use reqwest::blocking::Client;
use std::time::Duration;
use travelplan_core::{CatalogPage, CatalogSource, IngestError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches catalog pages with a blocking `reqwest` client.
pub struct HttpCatalogSource {
    client: Client,
}

impl HttpCatalogSource {
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("travelplan/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch_page(&self, url: &str) -> Result<CatalogPage, IngestError> {
        let fetch_error = |err: reqwest::Error| IngestError::Fetch {
            url: url.to_string(),
            message: err.to_string(),
        };

        self.client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(fetch_error)?
            .json::<CatalogPage>()
            .map_err(fetch_error)
    }
}

#[cfg(test)]
mod tests {
    use super::HttpCatalogSource;
    use httpmock::prelude::*;
    use serde_json::json;
    use travelplan_core::db::open_db_in_memory;
    use travelplan_core::{
        first_page_url, ingest_catalog, IngestError, PlaceService, SqlitePlaceRepository,
    };

    #[test]
    fn ingests_every_page_from_http_catalog() {
        let server = MockServer::start();
        let second_url = server.url("/artworks/search?limit=2&page=2");
        let first = server.mock(|when, then| {
            when.method(GET)
                .path("/artworks/search")
                .query_param("page", "1");
            then.status(200).json_body(json!({
                "data": [
                    {"id": 27992, "title": "A Sunday on La Grande Jatte"},
                    {"id": 28560, "title": "The Bedroom"}
                ],
                "pagination": {"next_url": second_url}
            }));
        });
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/artworks/search")
                .query_param("page", "2");
            then.status(200).json_body(json!({
                "data": [{"id": 111628, "title": null}],
                "pagination": {"next_url": null}
            }));
        });

        let conn = open_db_in_memory().unwrap();
        let places = PlaceService::new(SqlitePlaceRepository::try_new(&conn).unwrap());
        let source = HttpCatalogSource::new().unwrap();
        let start = first_page_url(&server.url("/artworks/search"), 2);

        let report = ingest_catalog(&source, &places, &start).unwrap();

        first.assert();
        second.assert();
        assert_eq!(report.pages, 2);
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(places.get_place(28560).unwrap().title, "The Bedroom");
    }

    #[test]
    fn non_success_status_is_a_fetch_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/artworks/search");
            then.status(503);
        });

        let source = HttpCatalogSource::new().unwrap();
        let err = travelplan_core::CatalogSource::fetch_page(
            &source,
            &server.url("/artworks/search"),
        )
        .unwrap_err();
        assert!(matches!(err, IngestError::Fetch { ref message, .. } if message.contains("503")));
    }
}
