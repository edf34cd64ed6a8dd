// Analytics aggregate endpoints.
//
// Every aggregate is a POST carrying `{siteId, fromUtc, toUtc}`.

use serde::de::DeserializeOwned;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{
    DemographicsResponse, DwellResponse, EntryExitRequest, EntryExitResponse, FootfallResponse,
    OccupancyResponse, RangeQuery, TimeRange,
};

impl ApiClient {
    async fn range_query<T: DeserializeOwned>(
        &self,
        path: &str,
        site_id: &str,
        range: TimeRange,
    ) -> Result<T, Error> {
        let url = self.endpoint(path)?;
        let body = RangeQuery {
            site_id,
            from_utc: range.from_utc,
            to_utc: range.to_utc,
        };
        self.post_json(url, &body).await
    }

    /// `POST /analytics/dwell`
    pub async fn dwell(&self, site_id: &str, range: TimeRange) -> Result<DwellResponse, Error> {
        self.range_query("analytics/dwell", site_id, range).await
    }

    /// `POST /analytics/footfall`
    pub async fn footfall(
        &self,
        site_id: &str,
        range: TimeRange,
    ) -> Result<FootfallResponse, Error> {
        self.range_query("analytics/footfall", site_id, range).await
    }

    /// `POST /analytics/occupancy`
    pub async fn occupancy(
        &self,
        site_id: &str,
        range: TimeRange,
    ) -> Result<OccupancyResponse, Error> {
        self.range_query("analytics/occupancy", site_id, range).await
    }

    /// `POST /analytics/demographics`
    pub async fn demographics(
        &self,
        site_id: &str,
        range: TimeRange,
    ) -> Result<DemographicsResponse, Error> {
        self.range_query("analytics/demographics", site_id, range).await
    }

    /// One page of the entry/exit log.
    ///
    /// `POST /analytics/entry-exit`
    pub async fn entry_exit(&self, request: &EntryExitRequest) -> Result<EntryExitResponse, Error> {
        let url = self.endpoint("analytics/entry-exit")?;
        self.post_json(url, request).await
    }
}
