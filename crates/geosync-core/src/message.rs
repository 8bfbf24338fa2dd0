//! The server-to-client update message.
//!
//! Wire form (JSON text frame):
//!
//! ```text
//! {"type":"update","dataset_id":"region","hash":"<64 hex>","data":<payload>}
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hash::ContentHash;
use crate::types::DatasetId;

/// A dataset's current state as delivered to subscribers.
///
/// The payload is shared, so cloning a message for many subscribers does not
/// copy the data.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename = "update")]
pub struct UpdateMessage<P> {
    pub dataset_id: DatasetId,
    pub hash: ContentHash,
    pub data: Arc<P>,
}

impl<P: Serialize> UpdateMessage<P> {
    /// Serialize to the JSON text sent over the wire.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<P> Clone for UpdateMessage<P> {
    fn clone(&self) -> Self {
        Self {
            dataset_id: self.dataset_id.clone(),
            hash: self.hash,
            data: Arc::clone(&self.data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample() -> UpdateMessage<Value> {
        UpdateMessage {
            dataset_id: DatasetId::new("region"),
            hash: ContentHash::from_bytes([0xab; 32]),
            data: Arc::new(json!([{"x": 0.0, "y": 0.0}])),
        }
    }

    #[test]
    fn test_wire_shape() {
        let text = sample().to_json().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "update");
        assert_eq!(value["dataset_id"], "region");
        assert_eq!(value["hash"], "ab".repeat(32));
        assert_eq!(value["data"], json!([{"x": 0.0, "y": 0.0}]));
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_parse_from_wire() {
        let text = sample().to_json().unwrap();
        let parsed: UpdateMessage<Value> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.dataset_id, DatasetId::new("region"));
        assert_eq!(parsed.hash, ContentHash::from_bytes([0xab; 32]));
    }
}
