//! OIDC ID-token verification with lazy, retryable provider discovery.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use console_core::Claims;
use jsonwebtoken::jwk::{AlgorithmParameters, JwkSet, KeyAlgorithm};
use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Errors during verifier initialization; callers receive `UNAVAILABLE`.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to fetch OIDC discovery document: {0}")]
    Discovery(#[source] reqwest::Error),

    #[error("discovery endpoint returned status {status}")]
    DiscoveryStatus { status: u16 },

    #[error("discovery document names issuer {actual:?}, expected {expected:?}")]
    IssuerMismatch { expected: String, actual: String },

    #[error("failed to fetch JWKS: {0}")]
    Jwks(#[source] reqwest::Error),

    #[error("JWKS endpoint returned status {status}")]
    JwksStatus { status: u16 },

    #[error("JWKS contains no usable signing keys")]
    NoUsableKeys,
}

/// Errors verifying a presented token; callers receive `UNAUTHENTICATED`.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("the token header is malformed: {0}")]
    InvalidHeader(#[source] jsonwebtoken::errors::Error),

    #[error("the token header does not specify a `kid`")]
    MissingKeyId,

    #[error("token uses the unknown key {0:?}")]
    UnknownKeyId(String),

    #[error("the token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// A verification failure, split by which wire code it maps to.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(#[from] InitError),

    #[error("token verification failed: {0}")]
    Unauthenticated(#[from] TokenError),
}

/// Verifier settings.
#[derive(Clone)]
pub struct VerifierConfig {
    /// Expected issuer; discovery is rooted here.
    pub issuer: String,
    /// Expected audience of presented tokens.
    pub client_id: String,
    /// Wire claim the `roles` field is populated from.
    pub roles_claim: String,
    /// Client used for discovery and JWKS fetches. Certificate verification
    /// is always enforced; an extra root CA may be configured on the client.
    pub http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    issuer: String,
    jwks_uri: String,
}

struct KeySetEntry {
    decoding: DecodingKey,
    validation: Validation,
}

struct KeySet {
    keys: HashMap<String, KeySetEntry>,
}

/// Validates bearer tokens against the configured issuer.
///
/// Initialization is lazy and once-successful: the first request performs
/// discovery while holding the cache lock, concurrent requests wait on the
/// lock for the first result, and a failure leaves the cache empty so the
/// next request retries.
pub struct Verifier {
    config: VerifierConfig,
    keys: Mutex<Option<Arc<KeySet>>>,
}

impl Verifier {
    /// Creates a verifier; no network traffic happens until the first
    /// [`verify`](Self::verify).
    #[must_use]
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            keys: Mutex::new(None),
        }
    }

    /// Verifies a token and extracts its claims.
    pub async fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let keys = self.keyset().await?;
        let claims = keys.validate(token, &self.config.roles_claim)?;
        Ok(claims)
    }

    async fn keyset(&self) -> Result<Arc<KeySet>, InitError> {
        let mut guard = self.keys.lock().await;
        if let Some(keys) = guard.as_ref() {
            return Ok(keys.clone());
        }
        let keys = Arc::new(self.discover().await?);
        *guard = Some(keys.clone());
        Ok(keys)
    }

    async fn discover(&self) -> Result<KeySet, InitError> {
        let issuer = self.config.issuer.trim_end_matches('/');
        let url = format!("{issuer}/.well-known/openid-configuration");
        debug!(%url, "Fetching OIDC discovery document");

        let response = self
            .config
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(InitError::Discovery)?;
        if !response.status().is_success() {
            return Err(InitError::DiscoveryStatus {
                status: response.status().as_u16(),
            });
        }
        let doc: DiscoveryDocument = response.json().await.map_err(InitError::Discovery)?;
        if doc.issuer.trim_end_matches('/') != issuer {
            return Err(InitError::IssuerMismatch {
                expected: self.config.issuer.clone(),
                actual: doc.issuer,
            });
        }

        let response = self
            .config
            .http_client
            .get(&doc.jwks_uri)
            .send()
            .await
            .map_err(InitError::Jwks)?;
        if !response.status().is_success() {
            return Err(InitError::JwksStatus {
                status: response.status().as_u16(),
            });
        }
        let jwks: JwkSet = response.json().await.map_err(InitError::Jwks)?;

        self.build_keyset(jwks)
    }

    fn build_keyset(&self, jwks: JwkSet) -> Result<KeySet, InitError> {
        let to_supported_alg = |key_algorithm: Option<KeyAlgorithm>| match key_algorithm {
            Some(key_alg) => jsonwebtoken::Algorithm::from_str(key_alg.to_string().as_str()).ok(),
            _ => None,
        };

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            let Some(key_alg) = to_supported_alg(jwk.common.key_algorithm) else {
                warn!(
                    "JWK key algorithm {:?} is not supported. Tokens signed by that key will not be accepted.",
                    jwk.common.key_algorithm
                );
                continue;
            };
            let Some(kid) = jwk.common.key_id else {
                warn!("JWK is missing the `kid` attribute, skipping");
                continue;
            };

            let decoding = match &jwk.algorithm {
                AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e),
                AlgorithmParameters::EllipticCurve(ec) => {
                    DecodingKey::from_ec_components(&ec.x, &ec.y)
                }
                other => {
                    warn!(key_id = %kid, "JWK uses the unsupported key type {other:?}, skipping");
                    continue;
                }
            };
            let decoding = match decoding {
                Ok(decoding) => decoding,
                Err(error) => {
                    warn!(key_id = %kid, %error, "Could not construct a decoding key, skipping");
                    continue;
                }
            };

            // OIDC Core 3.1.3.7: signature, exp, iss, aud. Not nonce,
            // at_hash, or iat.
            let mut validation = Validation::new(key_alg);
            validation.set_audience(std::slice::from_ref(&self.config.client_id));
            validation.set_issuer(std::slice::from_ref(&self.config.issuer));
            validation.validate_nbf = false;

            keys.insert(kid, KeySetEntry { decoding, validation });
        }

        if keys.is_empty() {
            return Err(InitError::NoUsableKeys);
        }
        Ok(KeySet { keys })
    }
}

impl KeySet {
    fn validate(&self, token: &str, roles_claim: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token).map_err(|error| {
            debug!(?error, "Received token with invalid header");
            TokenError::InvalidHeader(error)
        })?;
        let kid = header.kid.ok_or(TokenError::MissingKeyId)?;
        let entry = self
            .keys
            .get(&kid)
            .ok_or_else(|| TokenError::UnknownKeyId(kid.clone()))?;

        let decoded = decode::<Map<String, Value>>(token, &entry.decoding, &entry.validation)
            .map_err(|error| {
                debug!(?error, "Token is malformed or does not pass validation");
                TokenError::Invalid(error)
            })?;

        Ok(claims_from_map(&decoded.claims, roles_claim))
    }
}

fn claims_from_map(map: &Map<String, Value>, roles_claim: &str) -> Claims {
    let string_claim = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    // Non-string entries in the roles claim are silently skipped; a missing
    // claim yields no roles.
    let roles = map
        .get(roles_claim)
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    Claims {
        sub: string_claim("sub"),
        email: string_claim("email"),
        email_verified: map
            .get("email_verified")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        name: string_claim("name"),
        roles,
    }
}
