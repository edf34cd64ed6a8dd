// Site catalogue endpoint.

use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::SiteDto;

impl ApiClient {
    /// List every site visible to the authenticated user.
    ///
    /// `GET /sites`
    pub async fn list_sites(&self) -> Result<Vec<SiteDto>, Error> {
        let url = self.endpoint("sites")?;
        let sites: Vec<SiteDto> = self.get_json(url).await?;
        debug!(count = sites.len(), "sites loaded");
        Ok(sites)
    }
}
