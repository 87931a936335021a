//! APDU response definitions
//!
//! A response is the payload followed by the two status bytes. Only `90 00`
//! classifies as success.

pub mod error;
pub mod status;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

pub use error::{ResponseError, StatusError};
use status::StatusWord;

/// Basic APDU response structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload data (possibly empty)
    payload: Bytes,
    /// Status word
    status: StatusWord,
}

/// Outcome of classifying a response by its trailing status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseClass {
    /// The chip answered `90 00`; carries the payload with the status word removed
    Success(Bytes),
    /// Any other status word
    Failure(StatusWord),
}

impl Response {
    /// Create a new response with payload and status
    pub fn new(payload: impl Into<Bytes>, status: impl Into<StatusWord>) -> Self {
        Self {
            payload: payload.into(),
            status: status.into(),
        }
    }

    /// Create a success response
    pub const fn success(payload: Bytes) -> Self {
        Self {
            payload,
            status: status::common::SUCCESS,
        }
    }

    /// Create an error response from a status word
    pub fn error(status: impl Into<StatusWord>) -> Self {
        Self {
            payload: Bytes::new(),
            status: status.into(),
        }
    }

    /// Parse response from raw bytes (including status word)
    pub fn from_bytes(data: &[u8]) -> Result<Self, ResponseError> {
        let len = data.len();
        if len < 2 {
            return Err(ResponseError::Incomplete(len));
        }

        let status = StatusWord::new(data[len - 2], data[len - 1]);
        let payload = Bytes::copy_from_slice(&data[..len - 2]);

        trace!(
            sw1 = format_args!("{:#04x}", status.sw1),
            sw2 = format_args!("{:#04x}", status.sw2),
            payload_len = payload.len(),
            "Parsed APDU response"
        );

        Ok(Self { payload, status })
    }

    /// Get the response payload data
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Get the status word
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Check if the response indicates success
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Classify the response by its status word
    pub fn classify(self) -> ResponseClass {
        if self.is_success() {
            ResponseClass::Success(self.payload)
        } else {
            ResponseClass::Failure(self.status)
        }
    }

    /// Convert to a payload result
    pub fn into_result(self) -> Result<Bytes, StatusError> {
        match self.classify() {
            ResponseClass::Success(payload) => Ok(payload),
            ResponseClass::Failure(status) => Err(StatusError::from(status)),
        }
    }
}

impl TryFrom<&[u8]> for Response {
    type Error = ResponseError;

    fn try_from(data: &[u8]) -> Result<Self, ResponseError> {
        Self::from_bytes(data)
    }
}

impl TryFrom<Bytes> for Response {
    type Error = ResponseError;

    fn try_from(data: Bytes) -> Result<Self, ResponseError> {
        Self::from_bytes(&data)
    }
}

impl From<Response> for Bytes {
    fn from(response: Response) -> Self {
        let mut buf = BytesMut::with_capacity(response.payload.len() + 2);
        buf.put_slice(&response.payload);
        buf.put_u8(response.status.sw1);
        buf.put_u8(response.status.sw2);
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_response_from_bytes() {
        let resp = Response::from_bytes(&hex!("0102039000")).unwrap();
        assert_eq!(resp.payload().as_ref(), &[0x01, 0x02, 0x03]);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
        assert!(resp.is_success());

        let resp = Response::from_bytes(&hex!("9000")).unwrap();
        assert!(resp.payload().is_empty());
        assert!(resp.is_success());

        assert_eq!(
            Response::from_bytes(&[0x90]).unwrap_err(),
            ResponseError::Incomplete(1)
        );
        assert_eq!(
            Response::from_bytes(&[]).unwrap_err(),
            ResponseError::Incomplete(0)
        );
    }

    #[test]
    fn test_classify_only_9000_is_success() {
        let resp = Response::from_bytes(&hex!("AABB9000")).unwrap();
        assert_eq!(
            resp.classify(),
            ResponseClass::Success(Bytes::from_static(&hex!("AABB")))
        );

        for trailer in [
            hex!("6A82"),
            hex!("9001"),
            hex!("6282"),
            hex!("0090"),
            hex!("6100"),
        ] {
            let mut raw = vec![0x90, 0x00];
            raw.extend_from_slice(&trailer);
            let resp = Response::from_bytes(&raw).unwrap();
            assert_eq!(
                resp.classify(),
                ResponseClass::Failure(StatusWord::new(trailer[0], trailer[1]))
            );
        }
    }

    #[test]
    fn test_response_into_result() {
        let success = Response::success(Bytes::from_static(&[0x01, 0x02, 0x03]));
        assert_eq!(success.into_result().unwrap().as_ref(), &[0x01, 0x02, 0x03]);

        let error = Response::error((0x6A, 0x82));
        assert_eq!(error.into_result().unwrap_err().status.to_u16(), 0x6A82);
    }

    #[test]
    fn test_response_round_trips_to_bytes() {
        let raw = hex!("DEADBEEF6A82");
        let resp = Response::from_bytes(&raw).unwrap();
        let bytes: Bytes = resp.into();
        assert_eq!(bytes.as_ref(), &raw);
    }
}
