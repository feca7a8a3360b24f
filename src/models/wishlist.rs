use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::Document;
use crate::error::{AppError, AppResult};

use super::Movie;

/// A movie id as it reaches the wishlist: numeric from the catalog, or the
/// string form used as a document key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovieKey {
    Numeric(u64),
    Text(String),
}

impl MovieKey {
    /// Document key under the user's wishlist collection
    pub fn document_key(&self) -> String {
        self.to_string()
    }

    fn as_numeric(&self) -> Option<u64> {
        match self {
            MovieKey::Numeric(id) => Some(*id),
            MovieKey::Text(_) => None,
        }
    }
}

impl Display for MovieKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovieKey::Numeric(id) => write!(f, "{}", id),
            MovieKey::Text(id) => write!(f, "{}", id.trim()),
        }
    }
}

impl From<u64> for MovieKey {
    fn from(id: u64) -> Self {
        MovieKey::Numeric(id)
    }
}

impl From<&str> for MovieKey {
    fn from(id: &str) -> Self {
        MovieKey::Text(id.to_string())
    }
}

impl From<String> for MovieKey {
    fn from(id: String) -> Self {
        MovieKey::Text(id)
    }
}

/// Stored body of a wishlist document: the movie copy plus `addedAt`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WishlistDocument {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
}

impl WishlistDocument {
    pub fn new(movie: Movie, added_at: DateTime<Utc>) -> Self {
        Self { movie, added_at }
    }

    pub fn into_data(self) -> AppResult<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(AppError::Internal(format!(
                "Wishlist document serialized to non-object: {}",
                other
            ))),
        }
    }
}

/// One entry of the locally mirrored wishlist
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WishlistEntry {
    /// Document key (string form of the movie id)
    pub id: String,
    pub movie: Movie,
    #[serde(rename = "addedAt")]
    pub added_at: Option<DateTime<Utc>>,
}

impl WishlistEntry {
    /// Builds an entry from a stored document
    ///
    /// Documents written by older clients may lack `addedAt`; documents that
    /// do not carry a movie at all are rejected.
    pub fn from_document(document: &Document) -> AppResult<Self> {
        let mut data = document.data.clone();
        let added_at = data
            .remove("addedAt")
            .and_then(|v| v.as_str().map(str::to_string))
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|ts| ts.with_timezone(&Utc));

        let movie: Movie = serde_json::from_value(Value::Object(data))?;

        Ok(Self {
            id: document.id.clone(),
            movie,
            added_at,
        })
    }

    /// Numeric match on the stored movie id, or string match on either id
    pub fn matches(&self, key: &MovieKey) -> bool {
        if key.as_numeric() == Some(self.movie.id) {
            return true;
        }

        let wanted = key.to_string();
        self.id == wanted || self.movie.id.to_string() == wanted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn document(id: &str, data: Value) -> Document {
        match data {
            Value::Object(map) => Document {
                id: id.to_string(),
                data: map,
            },
            _ => panic!("document data must be an object"),
        }
    }

    #[test]
    fn test_movie_key_document_key() {
        assert_eq!(MovieKey::from(42).document_key(), "42");
        assert_eq!(MovieKey::from(" 42 ").document_key(), "42");
    }

    #[test]
    fn test_document_serializes_movie_fields_and_added_at() {
        let added_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let data = WishlistDocument::new(Movie::new(42, "X"), added_at)
            .into_data()
            .unwrap();

        assert_eq!(data["id"], json!(42));
        assert_eq!(data["title"], json!("X"));
        assert_eq!(data["addedAt"], json!("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn test_entry_from_document() {
        let entry = WishlistEntry::from_document(&document(
            "42",
            json!({
                "id": 42,
                "title": "X",
                "poster_path": "/x.jpg",
                "addedAt": "2024-05-01T12:00:00.000Z"
            }),
        ))
        .unwrap();

        assert_eq!(entry.id, "42");
        assert_eq!(entry.movie.id, 42);
        assert!(entry.added_at.is_some());
    }

    #[test]
    fn test_entry_without_movie_is_rejected() {
        let result = WishlistEntry::from_document(&document("42", json!({ "note": "?" })));
        assert!(result.is_err());
    }

    #[test]
    fn test_entry_matches_numeric_and_string_ids() {
        let entry = WishlistEntry {
            id: "42".to_string(),
            movie: Movie::new(42, "X"),
            added_at: None,
        };

        assert!(entry.matches(&MovieKey::from(42)));
        assert!(entry.matches(&MovieKey::from("42")));
        assert!(!entry.matches(&MovieKey::from(7)));
        assert!(!entry.matches(&MovieKey::from("7")));
    }
}
