//! Entity payloads returned by the discovery endpoints
//!
//! Only the id is interpreted; every other field is kept as raw JSON so
//! callers can render whatever the server sends.

use discovery_collection::{Entity, Identifier};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! discovery_entity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub struct $name {
            /// Server-assigned identifier
            pub id: Identifier,
            /// Remaining fields, uninterpreted
            #[serde(flatten)]
            pub fields: Map<String, Value>,
        }

        impl $name {
            /// Create payload without fields
            #[inline]
            #[must_use]
            pub fn new(id: impl Into<Identifier>) -> Self {
                Self {
                    id: id.into(),
                    fields: Map::new(),
                }
            }

            /// With an extra field
            #[inline]
            #[must_use]
            pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
                self.fields.insert(key.into(), value.into());
                self
            }

            /// Field lookup
            #[inline]
            #[must_use]
            pub fn field(&self, key: &str) -> Option<&Value> {
                self.fields.get(key)
            }

            /// Display name, when the server sent one
            #[must_use]
            pub fn name(&self) -> Option<&str> {
                self.field("name").and_then(Value::as_str)
            }
        }

        impl Entity for $name {
            fn id(&self) -> Identifier {
                self.id.clone()
            }

            fn set_id(&mut self, id: Identifier) {
                self.id = id;
            }
        }
    };
}

discovery_entity!(
    /// A sequenced sample
    Sample
);

discovery_entity!(
    /// A project grouping samples
    Project
);

discovery_entity!(
    /// A saved visualization (heatmap, phylogenetic tree, ...)
    Visualization
);

discovery_entity!(
    /// A workflow run (consensus genome, AMR, benchmark, ...)
    WorkflowRun
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_keeps_unknown_fields() {
        let sample: Sample = serde_json::from_str(
            r#"{"id": 12, "name": "patient-4", "details": {"host": "human"}}"#,
        )
        .unwrap();

        assert_eq!(sample.id(), Identifier::Int(12));
        assert_eq!(sample.name(), Some("patient-4"));
        assert_eq!(sample.field("details").unwrap()["host"], "human");

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["id"], 12);
        assert_eq!(json["details"]["host"], "human");
    }

    #[test]
    fn string_ids_and_set_id() {
        let mut run: WorkflowRun = serde_json::from_str(r#"{"id": "wr-9"}"#).unwrap();
        assert_eq!(run.id(), Identifier::from("wr-9"));
        assert!(run.name().is_none());

        run.set_id(Identifier::Int(9));
        assert_eq!(run, WorkflowRun::new(9));
        assert_eq!(Project::new(1).with_field("name", "p").name(), Some("p"));
    }
}
