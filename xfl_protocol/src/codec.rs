//! MessagePack encoding of requests, responses and snapshot records.
//!
//! Requests and responses follow the msgpack-rpc array layout:
//!
//! ```text
//! request  = [0, call_id, procedure, [args...]]
//! response = [1, call_id, error | nil, result | nil]
//! ```
//!
//! Records are written as maps keyed by field name so a decoder identifies
//! values by field presence rather than position.

use crate::{RequestEnvelope, ResponseEnvelope, RpcError, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

const REQUEST_TYPE: u8 = 0;
const RESPONSE_TYPE: u8 = 1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CodecError> {
    rmp_serde::to_vec_named(value).map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encodes `value` and reads it back as a dynamic msgpack value.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, CodecError> {
    let bytes = encode(value)?;
    rmpv::decode::read_value(&mut bytes.as_slice()).map_err(|e| CodecError::Encode(e.to_string()))
}

pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, CodecError> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, value).map_err(|e| CodecError::Decode(e.to_string()))?;
    decode(&buf)
}

pub fn encode_request(req: &RequestEnvelope) -> Result<Vec<u8>, CodecError> {
    encode(&(REQUEST_TYPE, req.call_id, &req.procedure, &req.args))
}

pub fn decode_request(bytes: &[u8]) -> Result<RequestEnvelope, CodecError> {
    let (kind, call_id, procedure, args): (u8, u32, String, Vec<Value>) = decode(bytes)?;
    if kind != REQUEST_TYPE {
        return Err(CodecError::Decode(format!(
            "expected request type {REQUEST_TYPE}, got {kind}"
        )));
    }
    Ok(RequestEnvelope {
        call_id,
        procedure,
        args,
    })
}

pub fn encode_response(resp: &ResponseEnvelope) -> Result<Vec<u8>, CodecError> {
    match &resp.outcome {
        Ok(result) => encode(&(RESPONSE_TYPE, resp.call_id, None::<&RpcError>, result)),
        Err(err) => encode(&(RESPONSE_TYPE, resp.call_id, Some(err), &Value::Nil)),
    }
}

pub fn decode_response(bytes: &[u8]) -> Result<ResponseEnvelope, CodecError> {
    let (kind, call_id, error, result): (u8, u32, Option<RpcError>, Value) = decode(bytes)?;
    if kind != RESPONSE_TYPE {
        return Err(CodecError::Decode(format!(
            "expected response type {RESPONSE_TYPE}, got {kind}"
        )));
    }
    let outcome = match error {
        Some(err) => Err(err),
        None => Ok(result),
    };
    Ok(ResponseEnvelope { call_id, outcome })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coord, ErrorKind, FoilSnapshot, StateSnapshot};

    #[test]
    fn request_decodes_with_positional_args() {
        let req = RequestEnvelope {
            call_id: 7,
            procedure: "setGeom".to_string(),
            args: vec![Value::from("NACA 2412"), Value::from(0.02), Value::from(0.0)],
        };
        let bytes = encode_request(&req).unwrap();
        let decoded = decode_request(&bytes).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn malformed_bytes_are_decode_errors() {
        assert!(matches!(decode_request(&[0xc1, 0x00]), Err(CodecError::Decode(_))));
        assert!(matches!(decode_request(&[]), Err(CodecError::Decode(_))));
    }

    #[test]
    fn response_bytes_are_not_a_request() {
        let resp = ResponseEnvelope {
            call_id: 1,
            outcome: Ok(Value::Boolean(true)),
        };
        let bytes = encode_response(&resp).unwrap();
        assert!(matches!(decode_request(&bytes), Err(CodecError::Decode(_))));
    }

    #[test]
    fn error_response_has_exactly_one_slot() {
        let resp = ResponseEnvelope {
            call_id: 3,
            outcome: Err(RpcError::new(ErrorKind::NotFound, "missing")),
        };
        let bytes = encode_response(&resp).unwrap();
        let raw: (u8, u32, Value, Value) = decode(&bytes).unwrap();
        assert_eq!(raw.0, 1);
        assert!(raw.2.is_map());
        assert!(raw.3.is_nil());
        assert_eq!(decode_response(&bytes).unwrap(), resp);
    }

    #[test]
    fn records_are_keyed_by_field_name() {
        let foil = FoilSnapshot {
            name: "NACA 0012".to_string(),
            thickness: 0.12,
            thickness_x: 0.3,
            n: 99,
            ..FoilSnapshot::default()
        };
        let value = to_value(&foil).unwrap();
        let keys: Vec<&str> = value
            .as_map()
            .unwrap()
            .iter()
            .filter_map(|(k, _)| k.as_str())
            .collect();
        assert!(keys.contains(&"camber_x"));
        assert!(keys.contains(&"thickness_x"));

        let state = to_value(&StateSnapshot::default()).unwrap();
        let state_keys: Vec<&str> = state
            .as_map()
            .unwrap()
            .iter()
            .filter_map(|(k, _)| k.as_str())
            .collect();
        assert!(state_keys.contains(&"projectPath"));
        assert!(state_keys.contains(&"projectName"));
    }

    #[test]
    fn unknown_fields_are_ignored_and_missing_fields_default() {
        let value = Value::Map(vec![
            (Value::from("n"), Value::from(12)),
            (Value::from("name"), Value::from("flat")),
            (Value::from("added_later"), Value::from("ignored")),
        ]);
        let foil: FoilSnapshot = from_value(&value).unwrap();
        assert_eq!(foil.name, "flat");
        assert_eq!(foil.n, 12);
        assert_eq!(foil.camber, 0.0);
    }

    #[test]
    fn coords_travel_as_pairs_and_accept_integers() {
        let value = to_value(&Coord::new(0.5, -0.25)).unwrap();
        assert_eq!(value, Value::Array(vec![Value::from(0.5), Value::from(-0.25)]));

        let ints = Value::Array(vec![Value::from(1), Value::from(0)]);
        let coord: Coord = from_value(&ints).unwrap();
        assert_eq!(coord, Coord::new(1.0, 0.0));
    }

    struct Unsupported;

    impl Serialize for Unsupported {
        fn serialize<S: serde::Serializer>(&self, _s: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("live resource cannot be encoded"))
        }
    }

    #[test]
    fn unsupported_values_are_encode_errors() {
        assert!(matches!(encode(&Unsupported), Err(CodecError::Encode(_))));
        assert!(matches!(to_value(&Unsupported), Err(CodecError::Encode(_))));
    }
}
