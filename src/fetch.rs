use reqwest::blocking::{Client as HttpClient, Response};
use serde::Deserialize;
use serde_json::Value as Json;
use std::time::Duration;
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::domain::MdvError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extracts the sheet id from a full Google Sheets URL
/// (`https://docs.google.com/spreadsheets/d/<id>/edit?gid=0`).
pub fn parse_sheet_id(url: &str) -> Option<String> {
    let rest = url.split_once("/spreadsheets/d/")?.1;
    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (!id.is_empty()).then_some(id)
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Map<String, Json>,
}

#[derive(Debug, Deserialize)]
struct SellersFile {
    #[serde(default)]
    sellers: Option<Json>,
}

/// Blocking fetch layer for the three remote shapes the viewer reads:
/// a Google Sheet's CSV export, the region JSON feed, and a sellers.json
/// feed. One-shot request/response, no retry policy; the caller keeps its
/// last good dataset when any of these fail.
pub struct Fetcher {
    http: HttpClient,
}

impl Fetcher {
    pub fn new() -> Result<Self, MdvError> {
        let http = HttpClient::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self { http })
    }

    fn checked(&self, response: Response) -> Result<Response, MdvError> {
        let status = response.status();
        if !status.is_success() {
            return Err(MdvError::FetchFailed(format!(
                "{} answered {status}",
                response.url()
            )));
        }
        Ok(response)
    }

    /// Downloads one tab of a public sheet as raw CSV text via the gviz
    /// export endpoint.
    pub fn sheet_csv(&self, sheet_id: &str, tab: &str) -> Result<String, MdvError> {
        let url = format!("https://docs.google.com/spreadsheets/d/{sheet_id}/gviz/tq");
        debug!("Fetching sheet {sheet_id}, tab {tab}");
        let response = self
            .http
            .get(&url)
            .query(&[("tqx", "out:csv"), ("sheet", tab)])
            .send()?;
        let text = self.checked(response)?.text()?;
        Ok(text)
    }

    /// Fetches the region feed (`{status, data: {region: [record…]}}`) and
    /// returns one dataset per region, in feed order.
    pub fn region_feed(
        &self,
        url: &str,
        weeks: Option<u32>,
    ) -> Result<Vec<(String, Dataset)>, MdvError> {
        let mut request = self.http.get(url);
        if let Some(weeks) = weeks {
            request = request.query(&[("weeks", weeks.to_string())]);
        }
        let response = self.checked(request.send()?)?;
        let feed: FeedResponse = response.json()?;
        if feed.status != "success" {
            return Err(MdvError::FetchFailed(format!(
                "feed status {}: {}",
                feed.status, feed.message
            )));
        }

        let mut regions = Vec::with_capacity(feed.data.len());
        for (region, rows) in feed.data {
            let records = records_from(&rows)
                .ok_or_else(|| MdvError::FetchFailed(format!("region {region} is not an array of records")))?;
            regions.push((region, Dataset::from_records(&records)));
        }
        let total: usize = regions.iter().map(|(_, d)| d.len()).sum();
        info!("Loaded {total} records across {} regions", regions.len());
        Ok(regions)
    }

    /// Fetches a sellers.json feed; only its `sellers` array becomes the
    /// dataset, the surrounding metadata is dropped.
    pub fn sellers(&self, url: &str) -> Result<Dataset, MdvError> {
        let response = self.checked(self.http.get(url).send()?)?;
        let file: SellersFile = response.json()?;
        let sellers = file
            .sellers
            .as_ref()
            .and_then(records_from)
            .ok_or_else(|| MdvError::FetchFailed("no sellers array in response".to_string()))?;
        info!("Loaded {} sellers", sellers.len());
        Ok(Dataset::from_records(&sellers))
    }
}

fn records_from(json: &Json) -> Option<Vec<serde_json::Map<String, Json>>> {
    json.as_array()?
        .iter()
        .map(|item| item.as_object().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_id_from_edit_url() {
        let url = "https://docs.google.com/spreadsheets/d/18BriA-gtmtxV8aL47vOpAWL-kFp2aQkxv_4-kbRJF-w/edit?gid=0#gid=0";
        assert_eq!(
            parse_sheet_id(url).as_deref(),
            Some("18BriA-gtmtxV8aL47vOpAWL-kFp2aQkxv_4-kbRJF-w")
        );
    }

    #[test]
    fn non_sheet_url_yields_none() {
        assert_eq!(parse_sheet_id("https://example.com/other"), None);
        assert_eq!(parse_sheet_id("https://docs.google.com/spreadsheets/d/"), None);
    }

    #[test]
    fn records_from_rejects_non_objects() {
        let rows: Json = serde_json::from_str(r#"[{"a":1},{"a":2}]"#).unwrap();
        assert_eq!(records_from(&rows).unwrap().len(), 2);
        let bad: Json = serde_json::from_str(r#"[{"a":1},42]"#).unwrap();
        assert!(records_from(&bad).is_none());
    }
}
