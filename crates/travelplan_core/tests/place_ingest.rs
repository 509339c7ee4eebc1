use std::cell::RefCell;
use std::collections::HashMap;
use travelplan_core::db::open_db_in_memory;
use travelplan_core::{
    ingest_catalog, CatalogItem, CatalogPage, CatalogPagination, CatalogSource, IngestError,
    PageQuery, PlaceService, PlaceServiceError, PlaceValidationError, SqlitePlaceRepository,
};

/// In-memory catalog keyed by URL; records every fetched URL.
struct FakeCatalog {
    pages: HashMap<String, CatalogPage>,
    requested: RefCell<Vec<String>>,
}

impl FakeCatalog {
    fn new(pages: Vec<(&str, CatalogPage)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(url, page)| (url.to_string(), page))
                .collect(),
            requested: RefCell::new(Vec::new()),
        }
    }
}

impl CatalogSource for FakeCatalog {
    fn fetch_page(&self, url: &str) -> Result<CatalogPage, IngestError> {
        self.requested.borrow_mut().push(url.to_string());
        self.pages.get(url).cloned().ok_or_else(|| IngestError::Fetch {
            url: url.to_string(),
            message: "HTTP 503".to_string(),
        })
    }
}

fn page(items: &[(i64, Option<&str>)], next_url: Option<&str>) -> CatalogPage {
    CatalogPage {
        data: items
            .iter()
            .map(|(id, title)| CatalogItem {
                id: *id,
                title: title.map(str::to_string),
            })
            .collect(),
        pagination: CatalogPagination {
            next_url: next_url.map(str::to_string),
        },
    }
}

#[test]
fn upsert_is_idempotent_and_keeps_first_title() {
    let conn = open_db_in_memory().unwrap();
    let service = PlaceService::new(SqlitePlaceRepository::try_new(&conn).unwrap());

    let (created, was_created) = service.upsert_place(27992, "A Sunday on La Grande Jatte").unwrap();
    assert!(was_created);
    let (again, was_created) = service.upsert_place(27992, "Renamed upstream").unwrap();
    assert!(!was_created);
    assert_eq!(again, created);
    assert_eq!(
        service.get_place(27992).unwrap().title,
        "A Sunday on La Grande Jatte"
    );
}

#[test]
fn upsert_rejects_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let service = PlaceService::new(SqlitePlaceRepository::try_new(&conn).unwrap());

    assert!(matches!(
        service.upsert_place(0, "Nowhere"),
        Err(PlaceServiceError::Validation(PlaceValidationError::InvalidId(0)))
    ));
    assert!(matches!(
        service.upsert_place(3, "   "),
        Err(PlaceServiceError::Validation(PlaceValidationError::BlankTitle))
    ));
    assert!(matches!(
        service.get_place(3),
        Err(PlaceServiceError::PlaceNotFound(3))
    ));
}

#[test]
fn list_places_clamps_limit_and_reports_total() {
    let conn = open_db_in_memory().unwrap();
    let service = PlaceService::new(SqlitePlaceRepository::try_new(&conn).unwrap());
    for id in 1..=3 {
        service.upsert_place(id, &format!("Artwork {id}")).unwrap();
    }

    let listed = service
        .list_places(&PageQuery {
            limit: Some(500),
            offset: 0,
        })
        .unwrap();
    assert_eq!(listed.applied_limit, 100);
    assert_eq!(listed.total, 3);
    assert_eq!(listed.items.len(), 3);

    let second = service
        .list_places(&PageQuery {
            limit: Some(1),
            offset: 1,
        })
        .unwrap();
    assert_eq!(second.items.len(), 1);
}

#[test]
fn ingest_follows_pagination_and_skips_untitled_items() {
    let conn = open_db_in_memory().unwrap();
    let service = PlaceService::new(SqlitePlaceRepository::try_new(&conn).unwrap());
    let catalog = FakeCatalog::new(vec![
        (
            "https://catalog.test/search?limit=2&page=1",
            page(
                &[(1, Some("Nighthawks")), (2, None)],
                Some("https://catalog.test/search?limit=2&page=2"),
            ),
        ),
        (
            "https://catalog.test/search?limit=2&page=2",
            page(&[(3, Some("American Gothic")), (4, Some("  "))], None),
        ),
    ]);

    let report = ingest_catalog(
        &catalog,
        &service,
        "https://catalog.test/search?limit=2&page=1",
    )
    .unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.fetched, 4);
    assert_eq!(report.created, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(service.get_place(3).unwrap().title, "American Gothic");
    assert!(service.get_place(2).is_err());

    let rerun = ingest_catalog(
        &catalog,
        &service,
        "https://catalog.test/search?limit=2&page=1",
    )
    .unwrap();
    assert_eq!(rerun.created, 0);
    assert_eq!(rerun.existing, 2);
    assert_eq!(
        service.list_places(&PageQuery::default()).unwrap().total,
        2
    );
}

#[test]
fn fetch_failure_keeps_pages_already_stored() {
    let conn = open_db_in_memory().unwrap();
    let service = PlaceService::new(SqlitePlaceRepository::try_new(&conn).unwrap());
    let catalog = FakeCatalog::new(vec![(
        "https://catalog.test/p1",
        page(
            &[(10, Some("The Bedroom"))],
            Some("https://catalog.test/p2"),
        ),
    )]);

    let failure = ingest_catalog(&catalog, &service, "https://catalog.test/p1").unwrap_err();

    assert_eq!(failure.partial.pages, 1);
    assert_eq!(failure.partial.created, 1);
    assert!(matches!(failure.source, IngestError::Fetch { ref url, .. } if url == "https://catalog.test/p2"));
    assert_eq!(service.get_place(10).unwrap().title, "The Bedroom");
}

#[test]
fn repeated_next_url_stops_the_walk() {
    let conn = open_db_in_memory().unwrap();
    let service = PlaceService::new(SqlitePlaceRepository::try_new(&conn).unwrap());
    let catalog = FakeCatalog::new(vec![
        (
            "https://catalog.test/a",
            page(&[(1, Some("One"))], Some("https://catalog.test/b")),
        ),
        (
            "https://catalog.test/b",
            page(&[(2, Some("Two"))], Some("https://catalog.test/a")),
        ),
    ]);

    let report = ingest_catalog(&catalog, &service, "https://catalog.test/a").unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.created, 2);
    assert_eq!(catalog.requested.borrow().len(), 2);
}
