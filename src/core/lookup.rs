use crate::core::query;
use crate::core::response::{self, PointLookup};
use crate::domain::model::Coordinate;
use crate::domain::ports::{ConfigProvider, FetchError, ServiceClient};
use crate::utils::error::{GeocodeError, Result};

/// Reverse lookup of a single point, asking for the matched outline as WKT.
pub async fn lookup_point<G, C>(client: &G, config: &C, point: Coordinate) -> Result<PointLookup>
where
    G: ServiceClient + ?Sized,
    C: ConfigProvider + ?Sized,
{
    let url = query::point_lookup_url(&config.reverse_url(), point, config.level_of_detail());
    tracing::debug!("Point lookup: {}", url);

    let body = client.fetch(&url).await.map_err(|e| {
        let message = match e {
            FetchError::Status(msg) | FetchError::Transport(msg) => msg,
        };
        GeocodeError::ServiceError { message }
    })?;
    Ok(response::parse_point_lookup(&body))
}
