use serde::Deserialize;

use super::error::ApiError;

/// Uniform response envelope used by every backend endpoint.
///
/// `success: false` is an application-level error regardless of the HTTP
/// status, so a 200 carrying `{"success":false,"error":"..."}` still fails.
#[derive(Deserialize, Debug)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// Unwraps the payload of a successful envelope.
    pub fn into_result(self, status: u16) -> Result<T, ApiError> {
        if !self.success {
            return Err(self.failure(status));
        }
        self.data
            .ok_or_else(|| ApiError::Parse("response envelope carried no data".to_string()))
    }

    /// For endpoints that acknowledge without a payload: checks `success`
    /// and discards any data.
    pub fn into_ack(self, status: u16) -> Result<(), ApiError> {
        if !self.success {
            return Err(self.failure(status));
        }
        Ok(())
    }

    fn failure(self, status: u16) -> ApiError {
        ApiError::Api {
            status,
            message: self.error.unwrap_or_else(|| "request failed".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_envelope_yields_data() {
        let envelope: ApiEnvelope<String> =
            serde_json::from_str(r#"{"success":true,"data":"payload"}"#).unwrap();
        assert_eq!(envelope.into_result(200).unwrap(), "payload");
    }

    #[test]
    fn test_success_false_is_an_error_even_on_http_200() {
        let envelope: ApiEnvelope<String> =
            serde_json::from_str(r#"{"success":false,"error":"bad credentials"}"#).unwrap();
        let err = envelope.into_result(200).unwrap_err();
        assert!(
            matches!(err, ApiError::Api { status: 200, ref message } if message == "bad credentials")
        );
    }

    #[test]
    fn test_missing_success_field_defaults_to_failure() {
        let envelope: ApiEnvelope<String> = serde_json::from_str(r#"{"data":"x"}"#).unwrap();
        assert!(envelope.into_result(200).is_err());
    }

    #[test]
    fn test_successful_envelope_without_data_is_a_parse_error() {
        let envelope: ApiEnvelope<String> =
            serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(envelope.into_result(200), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_ack_ignores_data() {
        let envelope: ApiEnvelope<serde_json::Value> =
            serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(envelope.into_ack(200).is_ok());
    }
}
