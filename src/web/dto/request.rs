//! Request DTOs for Web API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Query string of `DELETE /api/delete`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteQuery {
    /// ID of the file record to delete.
    #[serde(rename = "fileId")]
    pub file_id: Option<String>,
}

/// Link a remote storage account.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRequest {
    /// OAuth access token for the caller's Drive account.
    #[validate(length(max = 4096))]
    pub access_token: String,
    /// OAuth refresh token, if one was issued.
    #[validate(length(max = 4096))]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    #[validate(range(min = 1, max = 315_360_000))]
    pub expires_in: Option<i64>,
}

/// Multipart body of `POST /api/upload`.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// File content.
    #[schema(format = Binary)]
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_request_camel_case() {
        let req: CredentialsRequest = serde_json::from_str(
            r#"{"accessToken":"a","refreshToken":"r","expiresIn":3600}"#,
        )
        .unwrap();
        assert_eq!(req.access_token, "a");
        assert_eq!(req.refresh_token.as_deref(), Some("r"));
        assert_eq!(req.expires_in, Some(3600));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_credentials_request_rejects_oversized_token() {
        let body = serde_json::json!({ "accessToken": "a".repeat(5000) });
        let req: CredentialsRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_credentials_request_requires_access_token_field() {
        assert!(serde_json::from_str::<CredentialsRequest>(r#"{"refreshToken":"r"}"#).is_err());
    }

    #[test]
    fn test_credentials_request_rejects_huge_lifetime() {
        let req: CredentialsRequest = serde_json::from_str(
            r#"{"accessToken":"a","expiresIn":9223372036854775807}"#,
        )
        .unwrap();
        assert!(req.validate().is_err());

        let req: CredentialsRequest =
            serde_json::from_str(r#"{"accessToken":"a","expiresIn":315360000}"#).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_credentials_request_rejects_non_positive_lifetime() {
        let req: CredentialsRequest =
            serde_json::from_str(r#"{"accessToken":"a","expiresIn":0}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
