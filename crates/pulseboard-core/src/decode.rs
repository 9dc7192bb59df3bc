// ── Message decoding ──
//
// Turns one inbound text frame into a typed `ChangeEvent`. Envelope
// parsing lives in `pulseboard_api::wire`; this layer maps the raw
// notification `type` onto the domain `Change` variants.

use pulseboard_api::wire::{self, DecodeError, Notification};

use crate::model::{CREATE_TYPE, Change, ChangeEvent, Record, RecordId, UPDATE_TYPE};

/// Decode one text frame.
///
/// Server-reported errors and malformed JSON come back as [`DecodeError`].
/// An unknown or missing `type` is not an error and decodes to
/// [`Change::Unrecognized`].
pub fn decode(text: &str) -> Result<ChangeEvent, DecodeError> {
    wire::parse_frame(text).map(from_notification)
}

/// Map a parsed notification onto the domain model.
///
/// An update whose `id` is missing or unusable cannot be correlated with a
/// row, so it is demoted to [`Change::Unrecognized`].
pub fn from_notification(notification: Notification) -> ChangeEvent {
    let Notification {
        kind,
        time,
        id,
        fields,
    } = notification;
    let payload = Record::new(fields);

    let change = match kind.as_deref() {
        Some(UPDATE_TYPE) => match id.as_ref().and_then(RecordId::from_value) {
            Some(record_id) => Change::Updated { record_id, payload },
            None => Change::Unrecognized {
                raw_type: UPDATE_TYPE.to_owned(),
            },
        },
        Some(CREATE_TYPE) => Change::Created { payload },
        _ => Change::Unrecognized {
            raw_type: kind.unwrap_or_default(),
        },
    };

    ChangeEvent {
        emitted_at_secs: time,
        change,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn frame(content: &serde_json::Value) -> String {
        json!({ "content": content.to_string() }).to_string()
    }

    #[test]
    fn decodes_update() {
        let text = frame(&json!({
            "id": 5, "time": 1_700_000_000.25, "type": "data.update",
            "instrument": "BNP", "quantity": 100.0
        }));
        let event = decode(&text).unwrap();

        assert_eq!(event.emitted_at_secs, Some(1_700_000_000.25));
        match event.change {
            Change::Updated { record_id, payload } => {
                assert_eq!(record_id, RecordId::Int(5));
                assert_eq!(payload.id(), Some(RecordId::Int(5)));
                assert_eq!(payload.cell("instrument"), "BNP");
                assert!(payload.get("time").is_none());
                assert!(payload.get("type").is_none());
            }
            other => panic!("expected Updated, got {other:?}"),
        }
    }

    #[test]
    fn decodes_create() {
        let text = frame(&json!({ "id": 9, "time": 1.0, "type": "data.new", "value": 3 }));
        let event = decode(&text).unwrap();
        assert!(matches!(event.change, Change::Created { .. }));
        assert_eq!(event.kind(), "created");
    }

    #[test]
    fn unknown_type_is_unrecognized() {
        let text = frame(&json!({ "id": 1, "time": 1.0, "type": "data.delete" }));
        let event = decode(&text).unwrap();
        assert_eq!(
            event.change,
            Change::Unrecognized {
                raw_type: "data.delete".into()
            }
        );
    }

    #[test]
    fn update_without_time_is_still_applied() {
        let text = r#"{"content":"{\"id\":5,\"type\":\"data.update\",\"value\":\"x\"}"}"#;
        let event = decode(text).unwrap();

        assert_eq!(event.emitted_at_secs, None);
        assert_eq!(
            event.change,
            Change::Updated {
                record_id: RecordId::Int(5),
                payload: Record::try_from(json!({ "id": 5, "value": "x" })).unwrap(),
            }
        );
    }

    #[test]
    fn missing_type_is_unrecognized() {
        let event = decode(r#"{"content":"{\"id\":1,\"time\":1000}"}"#).unwrap();
        assert_eq!(event.emitted_at_secs, Some(1000.0));
        assert_eq!(
            event.change,
            Change::Unrecognized {
                raw_type: String::new()
            }
        );
    }

    #[test]
    fn non_string_type_is_unrecognized() {
        let event = decode(&frame(&json!({ "id": 1, "time": 1.0, "type": 7 }))).unwrap();
        assert_eq!(
            event.change,
            Change::Unrecognized {
                raw_type: "7".into()
            }
        );
    }

    #[test]
    fn float_id_without_fraction_matches_integer() {
        let event = decode(&frame(&json!({ "id": 5.0, "time": 1.0, "type": "data.update" }))).unwrap();
        assert!(matches!(
            event.change,
            Change::Updated { record_id: RecordId::Int(5), .. }
        ));
    }

    #[test]
    fn update_without_usable_id_is_unrecognized() {
        for content in [
            json!({ "time": 1.0, "type": "data.update" }),
            json!({ "id": null, "time": 1.0, "type": "data.update" }),
            json!({ "id": 2.5, "time": 1.0, "type": "data.update" }),
        ] {
            let event = decode(&frame(&content)).unwrap();
            assert_eq!(
                event.change,
                Change::Unrecognized {
                    raw_type: "data.update".into()
                }
            );
        }
    }

    #[test]
    fn server_error_wins() {
        let text = json!({ "error": "X", "content": "{}" }).to_string();
        assert_eq!(decode(&text), Err(DecodeError::Server("X".into())));
    }

    #[test]
    fn empty_envelope_is_protocol_error() {
        assert!(matches!(decode("{}"), Err(DecodeError::Protocol { .. })));
        assert!(matches!(decode("not json"), Err(DecodeError::Protocol { .. })));
    }

    #[test]
    fn malformed_inner_content_is_protocol_error() {
        let text = json!({ "content": "{not json" }).to_string();
        assert!(matches!(decode(&text), Err(DecodeError::Protocol { .. })));
    }
}
