//! JSON-file storage for user circles.
//!
//! The whole circle list lives in one pretty-printed JSON array. Every call
//! reads the file again, so callers always see the latest persisted state.
//! Writes land in a temporary sibling file first and are then renamed over
//! the original.

use crate::models::Circle;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CircleStoreError {
    #[error("Circle not found")]
    NotFound(String),
    #[error("Circle with this ID already exists")]
    AlreadyExists(String),
    #[error("Circle ID in URL must match circle ID in body")]
    IdMismatch { path_id: String, body_id: String },
    #[error("Article not found in circle")]
    ArticleNotInCircle { circle_id: String, article_id: i64 },
    #[error("I/O error accessing circle file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to serialize circles: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddArticleOutcome {
    Added,
    AlreadyExists,
}

pub struct CircleStore {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl CircleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the circle list. A missing or unparsable file counts as empty.
    fn load(&self) -> Result<Vec<Circle>, CircleStoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => {
                return Err(CircleStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        match serde_json::from_str::<Vec<Circle>>(&contents) {
            Ok(circles) => Ok(circles),
            Err(err) => {
                warn!(
                    "Circle file {} could not be parsed, treating it as empty: {}",
                    self.path.display(),
                    err
                );
                Ok(vec![])
            }
        }
    }

    fn save(&self, circles: &[Circle]) -> Result<(), CircleStoreError> {
        let io_err = |source: io::Error| CircleStoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }

        let json = serde_json::to_string_pretty(circles)?;
        let temp_path = self.path.with_extension("json.tmp");

        std::fs::write(&temp_path, json).map_err(io_err)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_err)?;

        Ok(())
    }

    pub fn list(&self) -> Result<Vec<Circle>, CircleStoreError> {
        self.load()
    }

    pub fn get(&self, id: &str) -> Result<Circle, CircleStoreError> {
        self.load()?
            .into_iter()
            .find(|circle| circle.id == id)
            .ok_or_else(|| CircleStoreError::NotFound(id.to_string()))
    }

    /// Stores a new circle and returns its id, generating one when empty.
    pub fn create(&self, mut circle: Circle) -> Result<String, CircleStoreError> {
        let _guard = self.lock();
        let mut circles = self.load()?;

        if circle.id.is_empty() {
            circle.id = uuid::Uuid::new_v4().to_string();
        }

        if circles.iter().any(|existing| existing.id == circle.id) {
            return Err(CircleStoreError::AlreadyExists(circle.id));
        }

        circle.dedup_articles();
        let id = circle.id.clone();
        circles.push(circle);
        self.save(&circles)?;

        info!("Created circle {}", id);
        Ok(id)
    }

    /// Replaces the stored circle `path_id` with `circle`.
    pub fn update(&self, path_id: &str, mut circle: Circle) -> Result<(), CircleStoreError> {
        if path_id != circle.id {
            return Err(CircleStoreError::IdMismatch {
                path_id: path_id.to_string(),
                body_id: circle.id,
            });
        }

        let _guard = self.lock();
        let mut circles = self.load()?;

        let slot = circles
            .iter_mut()
            .find(|existing| existing.id == path_id)
            .ok_or_else(|| CircleStoreError::NotFound(path_id.to_string()))?;

        circle.dedup_articles();
        *slot = circle;
        self.save(&circles)?;

        info!("Updated circle {}", path_id);
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), CircleStoreError> {
        let _guard = self.lock();
        let mut circles = self.load()?;

        let initial_count = circles.len();
        circles.retain(|circle| circle.id != id);

        if circles.len() == initial_count {
            return Err(CircleStoreError::NotFound(id.to_string()));
        }

        self.save(&circles)?;

        info!("Deleted circle {}", id);
        Ok(())
    }

    pub fn add_article(
        &self,
        circle_id: &str,
        article_id: i64,
    ) -> Result<AddArticleOutcome, CircleStoreError> {
        let _guard = self.lock();
        let mut circles = self.load()?;

        let circle = circles
            .iter_mut()
            .find(|circle| circle.id == circle_id)
            .ok_or_else(|| CircleStoreError::NotFound(circle_id.to_string()))?;

        if circle.contains_article(article_id) {
            return Ok(AddArticleOutcome::AlreadyExists);
        }

        circle.articles.push(article_id);
        self.save(&circles)?;

        info!("Added article {} to circle {}", article_id, circle_id);
        Ok(AddArticleOutcome::Added)
    }

    pub fn remove_article(&self, circle_id: &str, article_id: i64) -> Result<(), CircleStoreError> {
        let _guard = self.lock();
        let mut circles = self.load()?;

        let circle = circles
            .iter_mut()
            .find(|circle| circle.id == circle_id)
            .ok_or_else(|| CircleStoreError::NotFound(circle_id.to_string()))?;

        let Some(position) = circle.articles.iter().position(|id| *id == article_id) else {
            return Err(CircleStoreError::ArticleNotInCircle {
                circle_id: circle_id.to_string(),
                article_id,
            });
        };

        circle.articles.remove(position);
        self.save(&circles)?;

        info!("Removed article {} from circle {}", article_id, circle_id);
        Ok(())
    }
}
