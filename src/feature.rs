//! Feature descriptors: a named action together with its typed request and
//! response payload shapes.
//!
//! Payload types are resolved once at registration time into decode
//! functions keyed by the action name. Incoming frames pick the decoder by
//! tag lookup; there is no runtime type probing on the decode path. Handler
//! code that needs the concrete type downcasts through [`Request::as_any`] /
//! [`Response::as_any`].

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// An outgoing or incoming request payload.
///
/// Implementors are plain `serde` structs carrying `validator` constraints:
///
/// ```ignore
/// #[derive(Debug, Serialize, Deserialize, Validate)]
/// #[serde(rename_all = "camelCase")]
/// struct BootNotificationRequest {
///     #[validate(length(min = 1, max = 20))]
///     charge_point_vendor: String,
/// }
///
/// impl Request for BootNotificationRequest {
///     fn feature_name(&self) -> &'static str { "BootNotification" }
///     fn to_payload(&self) -> Result<Value, serde_json::Error> { serde_json::to_value(self) }
///     fn validate_payload(&self) -> Result<(), ValidationErrors> { self.validate() }
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
pub trait Request: fmt::Debug + Send + Sync {
    /// Action name of the feature this payload belongs to.
    fn feature_name(&self) -> &'static str;

    /// Serialize the payload to the JSON value placed in the wire frame.
    fn to_payload(&self) -> Result<Value, serde_json::Error>;

    /// Run the feature-specific field constraints.
    fn validate_payload(&self) -> Result<(), validator::ValidationErrors>;

    /// Downcast hook for handler code.
    fn as_any(&self) -> &dyn Any;
}

/// A response payload, mirror of [`Request`].
pub trait Response: fmt::Debug + Send + Sync {
    fn feature_name(&self) -> &'static str;
    fn to_payload(&self) -> Result<Value, serde_json::Error>;
    fn validate_payload(&self) -> Result<(), validator::ValidationErrors>;
    fn as_any(&self) -> &dyn Any;
}

type RequestDecoder = fn(Value) -> Result<Box<dyn Request>, serde_json::Error>;
type ResponseDecoder = fn(Value) -> Result<Box<dyn Response>, serde_json::Error>;

/// Immutable descriptor of one protocol feature.
///
/// Holds the action name and the decoders for its request/response
/// prototypes. Built once via [`Feature::new`] and registered into a
/// [`Profile`](crate::profile::Profile).
pub struct Feature {
    name: String,
    decode_request: RequestDecoder,
    decode_response: ResponseDecoder,
}

impl Feature {
    /// Create a descriptor for action `name` with payload types `Req`/`Resp`.
    pub fn new<Req, Resp>(name: impl Into<String>) -> Self
    where
        Req: Request + DeserializeOwned + 'static,
        Resp: Response + DeserializeOwned + 'static,
    {
        Self {
            name: name.into(),
            decode_request: |value| {
                serde_json::from_value::<Req>(value).map(|r| Box::new(r) as Box<dyn Request>)
            },
            decode_response: |value| {
                serde_json::from_value::<Resp>(value).map(|r| Box::new(r) as Box<dyn Response>)
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decode a request payload into this feature's concrete request type.
    pub fn decode_request(&self, payload: Value) -> Result<Box<dyn Request>, serde_json::Error> {
        (self.decode_request)(payload)
    }

    /// Decode a response payload into this feature's concrete response type.
    pub fn decode_response(&self, payload: Value) -> Result<Box<dyn Response>, serde_json::Error> {
        (self.decode_response)(payload)
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockRequest, MockResponse, MOCK_FEATURE_NAME};

    fn mock_feature() -> Feature {
        Feature::new::<MockRequest, MockResponse>(MOCK_FEATURE_NAME)
    }

    #[test]
    fn decode_request_yields_concrete_type() {
        let feature = mock_feature();
        let decoded = feature
            .decode_request(serde_json::json!({"mockValue": "someValue"}))
            .unwrap();
        let request = decoded.as_any().downcast_ref::<MockRequest>().unwrap();
        assert_eq!(request.mock_value, "someValue");
        assert_eq!(decoded.feature_name(), MOCK_FEATURE_NAME);
    }

    #[test]
    fn decode_response_yields_concrete_type() {
        let feature = mock_feature();
        let decoded = feature
            .decode_response(serde_json::json!({"mockValue": "someResp"}))
            .unwrap();
        let response = decoded.as_any().downcast_ref::<MockResponse>().unwrap();
        assert_eq!(response.mock_value, "someResp");
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        let feature = mock_feature();
        assert!(feature.decode_request(serde_json::json!([1, 2, 3])).is_err());
        assert!(feature
            .decode_request(serde_json::json!({"mockValue": 42}))
            .is_err());
    }
}
