//! Result handles produced by collection operations.

use mongodb::bson::{self, doc, Bson, Document};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Outcome of a find operation, decoded by the caller.
///
/// A `SingleResult` is produced by exactly one find call and consumed by
/// exactly one [`decode`](SingleResult::decode); errors that occurred
/// during the find, including "no document matched", are carried inside
/// and surface only at decode time.
#[derive(Debug)]
pub struct SingleResult(State);

#[derive(Debug)]
enum State {
    /// A document matched the filter.
    Matched(Document),
    /// The filter matched nothing.
    NoMatch,
    /// The find itself failed; the error is deferred to decode.
    Failed(Error),
}

impl SingleResult {
    /// Wrap a matched document.
    pub fn from_document(document: Document) -> Self {
        Self(State::Matched(document))
    }

    /// Wrap a find that matched no document.
    pub fn none() -> Self {
        Self(State::NoMatch)
    }

    /// Wrap a find that failed before producing a document.
    pub fn from_error(err: Error) -> Self {
        Self(State::Failed(err))
    }

    /// Check whether a document matched, without consuming the result.
    pub fn has_match(&self) -> bool {
        matches!(self.0, State::Matched(_))
    }

    /// Decode the matched document into a caller-supplied structure.
    ///
    /// Consumes the result. Fails with [`Error::NoDocument`] when the find
    /// matched nothing, a decode-classified error when the document cannot
    /// be mapped onto `T`, or the deferred error when the find itself
    /// failed (returned unchanged in class).
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self.0 {
            State::Matched(document) => from_document(document),
            State::NoMatch => Err(Error::NoDocument),
            State::Failed(err) => Err(err),
        }
    }
}

/// Outcome of an update operation.
///
/// Carries the server's match/modify counts and, for upserts, the
/// identifier of the inserted document.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSummary {
    /// Number of documents matched.
    pub matched_count: u64,
    /// Number of documents modified.
    pub modified_count: u64,
    /// The ID of the upserted document, if any.
    pub upserted_id: Option<Bson>,
}

impl UpdateSummary {
    /// Deserialize the summary into a caller-supplied structure.
    ///
    /// Re-encodes the summary as a BSON document with driver-style field
    /// names (`matchedCount`, `modifiedCount`, and `upsertedId` when an
    /// upsert happened; counts as `i64`) and maps it onto `T`. Fails with
    /// a decode-classified error when the shape does not fit.
    pub fn unmarshal_into<T: DeserializeOwned>(&self) -> Result<T> {
        let mut document = doc! {
            "matchedCount": self.matched_count as i64,
            "modifiedCount": self.modified_count as i64,
        };
        if let Some(ref id) = self.upserted_id {
            document.insert("upsertedId", id.clone());
        }
        from_document(document)
    }
}

/// Serialize an application value into the BSON document the operations
/// exchange.
///
/// Fails with a write-classified error when the value does not serialize
/// to a document (serialization failures only matter on the write path).
pub fn to_document<T: Serialize>(item: &T) -> Result<Document> {
    bson::to_bson(item)?
        .as_document()
        .cloned()
        .ok_or_else(|| Error::write(None, "value did not serialize to a document"))
}

/// Deserialize a BSON document into an application value.
pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T> {
    Ok(bson::from_bson(Bson::Document(document))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Named {
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Counts {
        #[serde(rename = "matchedCount")]
        matched: i64,
        #[serde(rename = "modifiedCount")]
        modified: i64,
    }

    #[test]
    fn test_decode_matched_document() {
        let result = SingleResult::from_document(doc! { "name": "John" });
        assert!(result.has_match());
        let named: Named = result.decode().unwrap();
        assert_eq!(named.name, "John");
    }

    #[test]
    fn test_decode_no_match_is_deferred_decode_error() {
        let result = SingleResult::none();
        assert!(!result.has_match());
        let err = result.decode::<Named>().unwrap_err();
        assert!(err.is_no_document());
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_decode_shape_mismatch() {
        let err = SingleResult::from_document(doc! { "other": 1 })
            .decode::<Named>()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(!err.is_no_document());
    }

    #[test]
    fn test_decode_returns_deferred_error_unchanged() {
        let result = SingleResult::from_error(Error::connection("socket closed"));
        let err = result.decode::<Named>().unwrap_err();
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_unmarshal_summary_counts() {
        let summary = UpdateSummary {
            matched_count: 1,
            modified_count: 1,
            upserted_id: None,
        };
        let counts: Counts = summary.unmarshal_into().unwrap();
        assert_eq!(counts, Counts { matched: 1, modified: 1 });
    }

    #[test]
    fn test_unmarshal_summary_into_document_keeps_upserted_id() {
        let id = Bson::ObjectId(bson::oid::ObjectId::new());
        let summary = UpdateSummary {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id.clone()),
        };
        let document: Document = summary.unmarshal_into().unwrap();
        assert_eq!(document.get("upsertedId"), Some(&id));
    }

    #[test]
    fn test_unmarshal_summary_shape_mismatch() {
        let summary = UpdateSummary {
            matched_count: 1,
            modified_count: 0,
            upserted_id: None,
        };
        let err = summary.unmarshal_into::<Named>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_to_document_round_trip() {
        let named = Named { name: "John".to_string() };
        let document = to_document(&named).unwrap();
        assert_eq!(document, doc! { "name": "John" });
        let back: Named = from_document(document).unwrap();
        assert_eq!(back, named);
    }

    #[test]
    fn test_to_document_rejects_non_documents() {
        let err = to_document(&42).unwrap_err();
        assert!(err.is_write_error());
    }
}
