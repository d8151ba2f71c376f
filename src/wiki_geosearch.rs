//! Client for the Wikipedia `list=geosearch` API.

use crate::models::Article;
use crate::proximity::GeoPoint;
use serde::Deserialize;

pub const DEFAULT_SEARCH_RADIUS_M: u32 = 200;
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

const USER_AGENT: &str = concat!(
    "bus-guide-backend/",
    env!("CARGO_PKG_VERSION"),
    " (article collector)"
);

#[derive(Deserialize, Debug)]
pub struct GeoSearchResponse {
    pub query: GeoSearchQuery,
}

#[derive(Deserialize, Debug)]
pub struct GeoSearchQuery {
    pub geosearch: Vec<GeoSearchHit>,
}

#[derive(Deserialize, Debug)]
pub struct GeoSearchHit {
    pub pageid: i64,
    pub ns: i64,
    pub title: String,
    pub lat: f64,
    pub lon: f64,
    pub dist: f64,
    #[serde(default)]
    pub primary: String,
}

impl GeoSearchResponse {
    /// Converts the hits to articles tagged with `lang`.
    pub fn into_articles(self, lang: &str) -> Vec<Article> {
        self.query
            .geosearch
            .into_iter()
            .map(|hit| Article {
                pageid: hit.pageid,
                ns: hit.ns,
                title: hit.title,
                lat: hit.lat,
                lon: hit.lon,
                dist: hit.dist,
                primary: hit.primary,
                lang: lang.to_string(),
            })
            .collect()
    }
}

pub fn endpoint_for_language(lang: &str) -> String {
    format!("https://{}.wikipedia.org/w/api.php", lang)
}

pub fn geosearch_params(
    point: &GeoPoint,
    radius_m: u32,
    limit: u32,
) -> Vec<(&'static str, String)> {
    vec![
        ("action", "query".to_string()),
        ("format", "json".to_string()),
        ("list", "geosearch".to_string()),
        ("gscoord", format!("{}|{}", point.lat(), point.lon())),
        ("gsradius", radius_m.to_string()),
        ("gslimit", limit.to_string()),
    ]
}

pub struct GeoSearchClient {
    client: reqwest::Client,
}

impl GeoSearchClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()?;

        Ok(Self { client })
    }

    /// Articles within `radius_m` of `point` on the `lang` Wikipedia.
    pub async fn geosearch(
        &self,
        point: &GeoPoint,
        radius_m: u32,
        limit: u32,
        lang: &str,
    ) -> Result<Vec<Article>, reqwest::Error> {
        let response = self
            .client
            .get(endpoint_for_language(lang))
            .query(&geosearch_params(point, radius_m, limit))
            .send()
            .await?
            .error_for_status()?;

        let body: GeoSearchResponse = response.json().await?;

        Ok(body.into_articles(lang))
    }
}
