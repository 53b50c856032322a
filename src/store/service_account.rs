use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

use crate::store::StoreError;

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECONDS: i64 = 3600;

/// Claims of the self-signed assertion exchanged for an access token.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// OAuth2 JWT-bearer flow for a Google service account.
pub struct ServiceAccountAuthenticator {
    http_client: Client,
    token_url: String,
    service_account_email: String,
    private_key: Secret<String>,
}

impl ServiceAccountAuthenticator {
    pub fn new(
        http_client: Client,
        token_url: String,
        service_account_email: String,
        private_key: Secret<String>,
    ) -> ServiceAccountAuthenticator {
        ServiceAccountAuthenticator {
            http_client,
            token_url,
            service_account_email,
            private_key,
        }
    }

    pub fn sign_assertion(&self) -> Result<String, StoreError> {
        let issued_at = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.service_account_email.clone(),
            scope: String::from(SPREADSHEETS_SCOPE),
            aud: self.token_url.clone(),
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECONDS,
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|err| StoreError::Auth(format!("invalid private key: {}", err)))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|err| StoreError::Auth(format!("failed to sign assertion: {}", err)))
    }

    /// Fetches a fresh bearer token. Tokens are not cached between requests.
    #[tracing::instrument(
        name = "Request a service account access token",
        skip(self),
        fields(service_account = %self.service_account_email)
    )]
    pub async fn access_token(&self) -> Result<Secret<String>, StoreError> {
        let assertion = self.sign_assertion()?;

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT_TYPE),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StoreError::Auth(format!(
                "token endpoint answered {}",
                response.status()
            )));
        }

        let token = response.json::<TokenResponse>().await?;

        Ok(Secret::new(token.access_token))
    }
}
