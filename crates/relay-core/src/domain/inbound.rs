//! Inbound transaction body, validated once at the boundary.
//!
//! Wire shape: `{"PARTNER_ID": int, "DATA": object|string, "EVENT_ID"?: int}`.
//! After [`InboundTransaction::parse`] succeeds nothing downstream looks at
//! the raw JSON again.

use serde::Deserialize;
use serde_json::Value;

use super::entity::LocalId;
use super::ids::{EventId, PartnerId};
use super::state::Reply;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct RawInbound {
    #[serde(default)]
    partner_id: Option<Value>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    event_id: Option<Value>,
}

/// A validated inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundTransaction {
    pub partner_id: PartnerId,
    /// Absent when the event comes from the route instead of the body.
    pub event_id: Option<EventId>,
    pub local_id: LocalId,
    /// Serialized payload as it will be stored and forwarded.
    pub data: String,
}

impl InboundTransaction {
    /// Decode and validate a request body.
    ///
    /// # Errors
    /// - `BadRequestJsonDecode`: body is not JSON
    /// - `BadRequestMandatoryKey`: `PARTNER_ID` or `DATA` missing, or `DATA`
    ///   is an object without `ID`
    /// - `BadRequestNotStoreAble`: a key has an unusable shape
    ///
    /// `EVENT_ID` is optional here; the caller decides whether it is needed.
    pub fn parse(body: &[u8]) -> Result<Self, Reply> {
        let value: Value = serde_json::from_slice(body).map_err(|_| Reply::BadRequestJsonDecode)?;
        if !value.is_object() {
            return Err(Reply::BadRequestMandatoryKey);
        }
        let raw: RawInbound =
            serde_json::from_value(value).map_err(|_| Reply::BadRequestNotStoreAble)?;

        let (Some(partner_id), Some(data)) = (raw.partner_id, raw.data) else {
            return Err(Reply::BadRequestMandatoryKey);
        };
        let partner_id = integer(&partner_id)?;
        let event_id = match raw.event_id {
            Some(v) => Some(EventId::new(integer(&v)?)),
            None => None,
        };
        let (local_id, data) = payload(data)?;

        Ok(Self {
            partner_id: PartnerId::new(partner_id),
            event_id,
            local_id,
            data,
        })
    }
}

fn integer(value: &Value) -> Result<i64, Reply> {
    value.as_i64().ok_or(Reply::BadRequestNotStoreAble)
}

/// Splits `DATA` into the local id and the stored payload.
fn payload(data: Value) -> Result<(LocalId, String), Reply> {
    match data {
        Value::Object(map) => {
            let id = map.get("ID").ok_or(Reply::BadRequestMandatoryKey)?;
            let local_id = LocalId::from_json(id).ok_or(Reply::BadRequestNotStoreAble)?;
            let data = serde_json::to_string(&map).map_err(|_| Reply::BadRequestNotStoreAble)?;
            Ok((local_id, data))
        }
        // Pre-serialized payload: kept verbatim, but it must decode.
        Value::String(s) => {
            let decoded: Value =
                serde_json::from_str(&s).map_err(|_| Reply::BadRequestNotStoreAble)?;
            let local_id = decoded
                .get("ID")
                .and_then(LocalId::from_json)
                .unwrap_or_default();
            Ok((local_id, s))
        }
        _ => Err(Reply::BadRequestNotStoreAble),
    }
}
