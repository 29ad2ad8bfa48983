//! Bearer token verification against the external auth provider's JWKS
//! endpoint (§6 Auth). No user database is maintained here beyond the
//! external-user foreign key — `sub` is trusted as the user id once the
//! signature checks out.
//!
//! The JWKS cache is the other legitimate process-global named in §9,
//! alongside the broadcaster's connection map. It's TTL-refreshed and
//! serves stale entries on refresh failure rather than failing open or
//! blocking every request on a network round trip.

use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

const JWKS_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
}

struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Process-global JWKS cache with TTL refresh and stale-on-failure fallback.
pub struct JwksCache {
    http: reqwest::Client,
    jwks_url: String,
    cached: Arc<RwLock<Option<CachedJwks>>>,
}

impl JwksCache {
    pub fn new(jwks_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            jwks_url: jwks_url.into(),
            cached: Arc::new(RwLock::new(None)),
        }
    }

    async fn fetch(&self) -> Result<JwkSet, String> {
        self.http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .json::<JwkSet>()
            .await
            .map_err(|e| e.to_string())
    }

    async fn keys(&self) -> Result<JwkSet, String> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.fetched_at.elapsed() < JWKS_TTL {
                    return Ok(entry.keys.clone());
                }
            }
        }
        match self.fetch().await {
            Ok(keys) => {
                let mut cached = self.cached.write().await;
                *cached = Some(CachedJwks {
                    keys: keys.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(keys)
            }
            Err(err) => {
                let cached = self.cached.read().await;
                if let Some(entry) = cached.as_ref() {
                    log::warn!("JWKS refresh failed ({err}), serving stale cache");
                    Ok(entry.keys.clone())
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Verify a bearer token's signature and return its subject (user id).
    ///
    /// The expected algorithm is pinned to `RS256` rather than taken from the
    /// token header — trusting an attacker-controlled `alg` field is the
    /// classic JWT algorithm-confusion hole (e.g. swapping in `HS256` and
    /// signing with the public RSA key as an HMAC secret). A token whose
    /// header names a different algorithm is rejected outright.
    pub async fn verify(&self, token: &str) -> Result<Uuid, String> {
        let header = decode_header(token).map_err(|e| e.to_string())?;
        if header.alg != EXPECTED_ALGORITHM {
            return Err(format!("unexpected token algorithm {:?}", header.alg));
        }
        let kid = header.kid.ok_or_else(|| "token missing kid".to_string())?;
        let jwks = self.keys().await?;
        let jwk = jwks
            .find(&kid)
            .ok_or_else(|| "no matching key in jwks".to_string())?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| e.to_string())?;
        let mut validation = Validation::new(EXPECTED_ALGORITHM);
        validation.validate_exp = true;
        let data = decode::<Claims>(token, &key, &validation).map_err(|e| e.to_string())?;
        Ok(data.claims.sub)
    }
}

/// The only algorithm this provider's JWKS keys are issued under.
const EXPECTED_ALGORITHM: Algorithm = Algorithm::RS256;
