use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use serde_json::json;
use tokio::time::Instant;

use super::error::RemoteError;
use super::types::ListMediaItemsResponse;
use super::{CatalogPage, DateRange};

const DEFAULT_BASE_URL: &str = "https://photoslibrary.googleapis.com";

/// Paginated, rate-limited reader over the remote media catalog.
///
/// One instance drives one run's listing. Auth failures and transport
/// errors propagate unmodified; there is no retry here because a failed
/// listing aborts the run and the next run starts over from the first page.
pub struct CatalogReader {
    http: Client,
    base_url: String,
    access_token: String,
    page_size: u32,
    date_range: Option<DateRange>,
    pacer: Pacer,
}

impl CatalogReader {
    pub fn new(
        access_token: impl Into<String>,
        page_size: u32,
        pause: Duration,
        date_range: Option<DateRange>,
    ) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, access_token, page_size, pause, date_range)
    }

    pub fn with_base_url(
        base_url: &str,
        access_token: impl Into<String>,
        page_size: u32,
        pause: Duration,
        date_range: Option<DateRange>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            page_size,
            date_range,
            pacer: Pacer::new(pause),
        }
    }

    /// Fetch one listing page. `cursor` must be `None` for the first call or
    /// a value previously returned in `CatalogPage::next_cursor`.
    pub async fn fetch_page(&mut self, cursor: Option<&str>) -> Result<CatalogPage, RemoteError> {
        self.pacer.pause().await;

        let request = match self.date_range {
            Some(range) => self.search_request(cursor, range),
            None => self.list_request(cursor),
        };

        let result = request.send().await;
        // The call counts against the rate limit whether or not it succeeded
        self.pacer.mark();
        let response = result?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Api { status, body });
        }

        let payload: ListMediaItemsResponse = response.json().await?;

        // The remote signals exhaustion with either an absent or a blank token
        let next_cursor = payload.next_page_token.filter(|token| !token.is_empty());

        Ok(CatalogPage {
            items: payload.media_items,
            next_cursor,
        })
    }

    fn list_request(&self, cursor: Option<&str>) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/mediaItems", self.base_url);
        let mut query: Vec<(&str, String)> = vec![("pageSize", self.page_size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("pageToken", cursor.to_string()));
        }
        self.http
            .get(url)
            .query(&query)
            .bearer_auth(&self.access_token)
    }

    fn search_request(&self, cursor: Option<&str>, range: DateRange) -> reqwest::RequestBuilder {
        let url = format!("{}/v1/mediaItems:search", self.base_url);
        let mut body = json!({
            "pageSize": self.page_size,
            "filters": {
                "dateFilter": {
                    "ranges": [{
                        "startDate": date_parts(range.after),
                        "endDate": date_parts(range.before),
                    }],
                },
            },
        });
        if let Some(cursor) = cursor {
            body["pageToken"] = json!(cursor);
        }
        self.http
            .post(url)
            .json(&body)
            .bearer_auth(&self.access_token)
    }
}

fn date_parts(date: NaiveDate) -> serde_json::Value {
    json!({"year": date.year(), "month": date.month(), "day": date.day()})
}

/// Enforces a minimum spacing between consecutive remote calls.
///
/// `pause` waits out whatever remains of the interval since the last
/// `mark`; the first call goes through immediately.
#[derive(Debug)]
struct Pacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Pacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    async fn pause(&self) {
        if let Some(last) = self.last {
            tokio::time::sleep_until(last + self.interval).await;
        }
    }

    fn mark(&mut self) {
        self.last = Some(Instant::now());
    }
}
