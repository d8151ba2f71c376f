//! Article data file handling and the helpers used to build it from a route.

use crate::models::Article;
use crate::proximity::GeoPoint;
use ahash::{AHashMap, AHashSet};
use geojson::{GeoJson, Geometry, Value};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArticleFileError {
    #[error("I/O error accessing article file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse article file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_articles(path: &Path) -> Result<Vec<Article>, ArticleFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ArticleFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&contents).map_err(|source| ArticleFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_articles(path: &Path, articles: &[Article]) -> Result<(), ArticleFileError> {
    let io_err = |source: io::Error| ArticleFileError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
    }

    let json = serde_json::to_string_pretty(articles).map_err(|source| ArticleFileError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    std::fs::write(path, json).map_err(io_err)
}

/// Unique coordinates of a route: every stop point plus every line vertex.
///
/// GeoJSON positions are `[lon, lat]`; the result is in first-seen order.
pub fn extract_route_coordinates(geojson: &GeoJson) -> Vec<GeoPoint> {
    let mut seen = AHashSet::new();
    let mut points = vec![];

    let mut push = |position: &[f64]| {
        if let &[lon, lat, ..] = position {
            if seen.insert((lat.to_bits(), lon.to_bits())) {
                points.push(GeoPoint::new(lat, lon));
            }
        }
    };

    let mut visit = |geometry: &Geometry| match &geometry.value {
        Value::Point(position) => push(position),
        Value::LineString(line) => line.iter().for_each(|position| push(position)),
        Value::MultiLineString(lines) => lines
            .iter()
            .flatten()
            .for_each(|position| push(position)),
        _ => {}
    };

    match geojson {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .iter()
            .filter_map(|feature| feature.geometry.as_ref())
            .for_each(&mut visit),
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                visit(geometry);
            }
        }
        GeoJson::Geometry(geometry) => visit(geometry),
    }

    points
}

/// Keeps one article per `(pageid, lang)`, the one with the smallest `dist`.
///
/// Output order follows the first appearance of each key.
pub fn dedupe_articles(articles: impl IntoIterator<Item = Article>) -> Vec<Article> {
    let mut index_by_key: AHashMap<(i64, String), usize> = AHashMap::new();
    let mut unique: Vec<Article> = vec![];

    for article in articles {
        let key = (article.pageid, article.lang.clone());

        match index_by_key.get(&key) {
            Some(&index) => {
                if article.dist < unique[index].dist {
                    unique[index] = article;
                }
            }
            None => {
                index_by_key.insert(key, unique.len());
                unique.push(article);
            }
        }
    }

    unique
}
