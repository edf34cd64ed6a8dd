// ── Entry/exit log ──
//
// Paged view over `POST /analytics/entry-exit`. A failed or shapeless
// response shows as an empty page with zero totals.

use std::sync::Arc;

use crowdlens_api::ApiClient;
use crowdlens_api::models::EntryExitRequest;
use tracing::{debug, warn};

use crate::model::{EntryPage, EntryRecord};
use crate::pagination::{PageMarker, Pager};

/// Fetch one page. Never fails.
pub async fn fetch_page(
    client: &ApiClient,
    page_number: u32,
    page_size: u32,
    site_id: Option<&str>,
) -> EntryPage {
    let request = EntryExitRequest {
        page_number,
        page_size,
        site_id: site_id.map(str::to_owned),
    };

    let response = match client.entry_exit(&request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, page_number, "entry/exit request failed");
            return EntryPage {
                page_number,
                ..EntryPage::default()
            };
        }
    };

    let Some(records) = response.records else {
        debug!(page_number, "entry/exit response carried no records");
        return EntryPage {
            page_number,
            ..EntryPage::default()
        };
    };

    EntryPage {
        page_number,
        total_records: response.total_records,
        total_pages: response.total_pages,
        records: records.into_iter().map(EntryRecord::from).collect(),
    }
}

/// Entry/exit records with pager state.
pub struct EntryLog {
    client: Arc<ApiClient>,
    site_id: Option<String>,
    pager: Pager,
    page: EntryPage,
}

impl EntryLog {
    pub fn new(client: Arc<ApiClient>, page_size: u32, site_id: Option<String>) -> Self {
        Self {
            client,
            site_id,
            pager: Pager::new(page_size),
            page: EntryPage::default(),
        }
    }

    /// Reload the current page.
    pub async fn load(&mut self) -> &EntryPage {
        self.page = fetch_page(
            &self.client,
            self.pager.current_page(),
            self.pager.page_size(),
            self.site_id.as_deref(),
        )
        .await;
        self.pager
            .update_totals(self.page.total_records, self.page.total_pages);
        &self.page
    }

    /// Jump to `page` and load it. `false` (and no request) when out of range.
    pub async fn go_to_page(&mut self, page: u32) -> bool {
        if !self.pager.go_to_page(page) {
            return false;
        }
        self.load().await;
        true
    }

    pub async fn next_page(&mut self) -> bool {
        self.go_to_page(self.pager.current_page().saturating_add(1))
            .await
    }

    pub async fn previous_page(&mut self) -> bool {
        self.go_to_page(self.pager.current_page().saturating_sub(1))
            .await
    }

    pub fn page(&self) -> &EntryPage {
        &self.page
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub fn window(&self) -> Vec<PageMarker> {
        self.pager.window()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crowdlens_api::TransportConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, Arc<ApiClient>) {
        let server = MockServer::start().await;
        let base = Url::parse(&format!("{}/api/", server.uri())).unwrap();
        let client = ApiClient::new(base, &TransportConfig::default()).unwrap();
        (server, Arc::new(client))
    }

    fn page_body(page: u32) -> serde_json::Value {
        json!({
            "pageNumber": page,
            "totalRecords": 25,
            "totalPages": 3,
            "records": [{
                "personId": format!("p{page}"),
                "personName": "Ada Lovelace",
                "zoneName": "Lobby",
                "entryUtc": 1_709_280_000_000_i64,
                "exitUtc": 1_709_283_900_000_i64,
                "dwellMinutes": 65.0,
            }],
        })
    }

    #[tokio::test]
    async fn loads_and_pages_forward() {
        let (server, client) = setup().await;
        for page in 1..=2 {
            Mock::given(method("POST"))
                .and(path("/api/analytics/entry-exit"))
                .and(body_json(json!({ "pageNumber": page, "pageSize": 10, "siteId": "s1" })))
                .respond_with(ResponseTemplate::new(200).set_body_json(page_body(page)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let mut log = EntryLog::new(client, 10, Some("s1".into()));
        let page = log.load().await;
        assert_eq!(page.total_records, 25);
        let record = &page.records[0];
        assert_eq!(record.zone.as_deref(), Some("Lobby"));
        assert_eq!(record.dwell_label(), "01:05");
        assert_eq!(record.initials(), "AL");

        assert!(log.next_page().await);
        assert_eq!(log.page().records[0].person_id, "p2");
        assert!(!log.go_to_page(4).await);
        assert_eq!(log.pager().current_page(), 2);
    }

    #[tokio::test]
    async fn failure_yields_empty_page() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let page = fetch_page(&client, 1, 10, None).await;
        assert_eq!(page.total_records, 0);
        assert_eq!(page.total_pages, 0);
        assert!(page.records.is_empty());
    }

    #[tokio::test]
    async fn missing_records_resets_totals() {
        let (server, client) = setup().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "totalRecords": 9, "totalPages": 1 })),
            )
            .mount(&server)
            .await;

        let mut log = EntryLog::new(client, 10, None);
        assert_eq!(log.load().await, &EntryPage { page_number: 1, ..EntryPage::default() });
        assert!(log.window().is_empty());
    }
}
