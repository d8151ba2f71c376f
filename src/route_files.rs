//! Bus route GeoJSON files, stored as `bus<ID>.geojson` in one directory.

use crate::models::RouteSummary;
use geojson::GeoJson;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ROUTE_FILE_PREFIX: &str = "bus";
const ROUTE_FILE_EXTENSION: &str = "geojson";

#[derive(Error, Debug)]
pub enum RouteFileError {
    #[error("Route {0} not found")]
    NotFound(String),
    #[error("Error reading route data from '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error parsing route data in '{path}': {source}")]
    InvalidGeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },
}

pub struct RouteDirectory {
    root: PathBuf,
}

impl RouteDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn route_path(&self, route_id: &str) -> PathBuf {
        self.root
            .join(format!("{ROUTE_FILE_PREFIX}{route_id}.{ROUTE_FILE_EXTENSION}"))
    }

    /// Loads and parses the GeoJSON for one route.
    pub fn get_route(&self, route_id: &str) -> Result<GeoJson, RouteFileError> {
        if !is_safe_route_id(route_id) {
            return Err(RouteFileError::NotFound(route_id.to_string()));
        }

        let path = self.route_path(route_id);
        if !path.is_file() {
            return Err(RouteFileError::NotFound(route_id.to_string()));
        }

        read_geojson(&path)
    }

    /// Summaries of every route file in the directory, ordered by id.
    ///
    /// A missing directory yields an empty list; an unreadable or invalid
    /// route file fails the whole listing.
    pub fn list_routes(&self) -> Result<Vec<RouteSummary>, RouteFileError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let entries = std::fs::read_dir(&self.root).map_err(|source| RouteFileError::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut routes = vec![];

        for entry in entries {
            let entry = entry.map_err(|source| RouteFileError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();

            let Some(route_id) = route_id_from_path(&path) else {
                continue;
            };

            let geojson = read_geojson(&path)?;
            let file = entry.file_name().to_string_lossy().into_owned();

            routes.push(summarize_route(route_id, file, &geojson));
        }

        routes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(routes)
    }
}

fn is_safe_route_id(route_id: &str) -> bool {
    !route_id.is_empty()
        && !route_id.contains(['/', '\\'])
        && !route_id.contains("..")
}

fn route_id_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(ROUTE_FILE_EXTENSION) {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    stem.strip_prefix(ROUTE_FILE_PREFIX)
        .map(|route_id| route_id.to_string())
}

fn read_geojson(path: &Path) -> Result<GeoJson, RouteFileError> {
    let contents = std::fs::read_to_string(path).map_err(|source| RouteFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    contents
        .parse::<GeoJson>()
        .map_err(|source| RouteFileError::InvalidGeoJson {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
}

/// Builds the listing entry, taking name/ref/from/to from the first feature.
pub fn summarize_route(route_id: String, file: String, geojson: &GeoJson) -> RouteSummary {
    let mut summary = RouteSummary {
        id: route_id,
        file,
        name: None,
        route_ref: None,
        from: None,
        to: None,
    };

    let GeoJson::FeatureCollection(collection) = geojson else {
        return summary;
    };

    let Some(first) = collection.features.first() else {
        return summary;
    };

    summary.name = first.property("name").cloned();
    summary.route_ref = first.property("ref").cloned();

    // only reported as a pair
    if let (Some(from), Some(to)) = (first.property("from"), first.property("to")) {
        summary.from = Some(from.clone());
        summary.to = Some(to.clone());
    }

    summary
}
