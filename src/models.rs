use crate::proximity::GeoPoint;
use ahash::AHashSet;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_CIRCLE_NAME: &str = "Unnamed Circle";
pub const DEFAULT_CIRCLE_COLOR: &str = "#3388ff";

fn default_circle_name() -> String {
    DEFAULT_CIRCLE_NAME.to_string()
}

fn default_circle_color() -> String {
    DEFAULT_CIRCLE_COLOR.to_string()
}

/// A named region grouping Wikipedia articles for the guide.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Empty on a create request means "generate one".
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_circle_name")]
    pub name: String,
    pub center: GeoPoint,
    /// Metres.
    pub radius: f64,
    #[serde(default = "default_circle_color")]
    pub color: String,
    #[serde(default, deserialize_with = "deserialize_article_ids")]
    pub articles: Vec<i64>,
}

impl Circle {
    pub fn contains_article(&self, article_id: i64) -> bool {
        self.articles.contains(&article_id)
    }

    /// Drops repeated article ids, keeping the first occurrence of each.
    pub fn dedup_articles(&mut self) {
        let mut seen = AHashSet::with_capacity(self.articles.len());
        self.articles.retain(|id| seen.insert(*id));
    }
}

// Older circle files stored article ids as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientArticleId {
    Number(i64),
    Text(String),
}

fn deserialize_article_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<LenientArticleId>> = Option::deserialize(deserializer)?;

    raw.unwrap_or_default()
        .into_iter()
        .map(|id| match id {
            LenientArticleId::Number(n) => Ok(n),
            LenientArticleId::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| serde::de::Error::custom(format!("invalid article id '{}'", s))),
        })
        .collect()
}

/// A geotagged Wikipedia article as returned by the geosearch API, tagged with
/// the wiki language it came from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub pageid: i64,
    pub ns: i64,
    pub title: String,
    pub lat: f64,
    pub lon: f64,
    /// Distance in metres from the sampled route point that found the article.
    pub dist: f64,
    #[serde(default)]
    pub primary: String,
    pub lang: String,
}

impl Article {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ArticleOperation {
    pub article_id: i64,
}

/// Listing entry for a `bus<ID>.geojson` route file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RouteSummary {
    pub id: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<serde_json::Value>,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub route_ref: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<serde_json::Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircleStatusKind {
    Created,
    Updated,
    Deleted,
}

#[derive(Clone, Debug, Serialize)]
pub struct CircleStatus {
    pub id: String,
    pub status: CircleStatusKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatusKind {
    Added,
    AlreadyExists,
    Removed,
}

#[derive(Clone, Debug, Serialize)]
pub struct MembershipStatus {
    pub circle_id: String,
    pub article_id: i64,
    pub status: MembershipStatusKind,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}
