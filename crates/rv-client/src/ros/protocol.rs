//! rosbridge v2 operations

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Compression;

/// rosbridge operation, tagged by its `op` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Subscribe {
        id: String,
        topic: String,
        #[serde(rename = "type")]
        message_type: String,
        compression: Compression,
        queue_length: u32,
    },
    Unsubscribe {
        id: String,
        topic: String,
    },
    Publish {
        topic: String,
        msg: Value,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscribe_wire_format() {
        let op = Operation::Subscribe {
            id: "subscribe:/map:0".into(),
            topic: "/map".into(),
            message_type: "nav_msgs/OccupancyGrid".into(),
            compression: Compression::Cbor,
            queue_length: 1,
        };
        assert_eq!(
            serde_json::to_value(&op).unwrap(),
            json!({
                "op": "subscribe",
                "id": "subscribe:/map:0",
                "topic": "/map",
                "type": "nav_msgs/OccupancyGrid",
                "compression": "cbor",
                "queue_length": 1,
            })
        );
    }

    #[test]
    fn test_publish_parses() {
        let op: Operation =
            serde_json::from_str(r#"{"op":"publish","topic":"/map","msg":{"a":1}}"#).unwrap();
        assert_eq!(
            op,
            Operation::Publish {
                topic: "/map".into(),
                msg: json!({"a": 1}),
            }
        );
    }
}
