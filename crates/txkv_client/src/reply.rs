//! Decoding raw command replies into typed results.

use crate::error::{ClientError, ClientResult};
use txkv_protocol::RawValue;

/// A type a queued operation's raw reply can be decoded into.
///
/// A decode failure faults only the operation it belongs to.
pub trait FromRawValue: Sized {
    /// Decodes a raw reply.
    fn from_raw(value: RawValue) -> ClientResult<Self>;
}

fn unexpected(expected: &str, value: &RawValue) -> ClientError {
    ClientError::UnexpectedReply(format!("expected {expected}, got {}", value.type_name()))
}

impl FromRawValue for i64 {
    fn from_raw(value: RawValue) -> ClientResult<Self> {
        value
            .as_integer()
            .ok_or_else(|| unexpected("integer", &value))
    }
}

impl FromRawValue for bool {
    fn from_raw(value: RawValue) -> ClientResult<Self> {
        match value {
            RawValue::Integer(0) | RawValue::Nil => Ok(false),
            RawValue::Integer(1) => Ok(true),
            RawValue::Status(ref status) if status == "OK" => Ok(true),
            other => Err(unexpected("boolean", &other)),
        }
    }
}

impl FromRawValue for Option<Vec<u8>> {
    fn from_raw(value: RawValue) -> ClientResult<Self> {
        match value {
            RawValue::Nil => Ok(None),
            RawValue::Bulk(bytes) => Ok(Some(bytes)),
            other => Err(unexpected("bulk", &other)),
        }
    }
}

impl FromRawValue for Option<String> {
    fn from_raw(value: RawValue) -> ClientResult<Self> {
        Option::<Vec<u8>>::from_raw(value)?
            .map(String::from_utf8)
            .transpose()
            .map_err(|e| ClientError::UnexpectedReply(e.to_string()))
    }
}

impl FromRawValue for () {
    fn from_raw(_value: RawValue) -> ClientResult<Self> {
        Ok(())
    }
}

impl FromRawValue for RawValue {
    fn from_raw(value: RawValue) -> ClientResult<Self> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers() {
        assert_eq!(i64::from_raw(RawValue::Integer(15)), Ok(15));
        assert_eq!(i64::from_raw(RawValue::Bulk(b"-3".to_vec())), Ok(-3));
        assert!(matches!(
            i64::from_raw(RawValue::Nil),
            Err(ClientError::UnexpectedReply(_))
        ));
    }

    #[test]
    fn booleans() {
        assert_eq!(bool::from_raw(RawValue::Integer(1)), Ok(true));
        assert_eq!(bool::from_raw(RawValue::Integer(0)), Ok(false));
        assert_eq!(bool::from_raw(RawValue::Status("OK".into())), Ok(true));
        assert_eq!(bool::from_raw(RawValue::Nil), Ok(false));
        assert!(bool::from_raw(RawValue::Integer(7)).is_err());
    }

    #[test]
    fn strings() {
        assert_eq!(
            Option::<String>::from_raw(RawValue::Bulk(b"15".to_vec())),
            Ok(Some("15".to_string()))
        );
        assert_eq!(Option::<String>::from_raw(RawValue::Nil), Ok(None));
        assert!(Option::<String>::from_raw(RawValue::Bulk(vec![0xff])).is_err());
        assert!(Option::<Vec<u8>>::from_raw(RawValue::Integer(1)).is_err());
    }
}
