//! HMAC-signed bearer tokens.
//!
//! Token layout: `base64url(user_id) "." expiry "." base64url(tag)` where
//! `expiry` is Unix seconds and `tag = HMAC-SHA256(secret, first two fields)`.
//! Verification checks the tag in constant time before looking at anything
//! else, then expiry, then the user directory.

use std::{collections::HashSet, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    env::Environment,
    identity::{AuthError, Credential, IdentityResolver, UserId},
};

type HmacSha256 = Hmac<Sha256>;

/// [`IdentityResolver`] for HMAC-signed bearer tokens and a fixed user
/// directory.
pub struct HmacTokenResolver<E: Environment> {
    env: E,
    secret: Zeroizing<Vec<u8>>,
    directory: HashSet<UserId>,
}

impl<E: Environment> HmacTokenResolver<E> {
    /// Create a resolver signing with `secret` and recognising `users`.
    pub fn new(
        env: E,
        secret: impl Into<Vec<u8>>,
        users: impl IntoIterator<Item = UserId>,
    ) -> Self {
        Self {
            env,
            secret: Zeroizing::new(secret.into()),
            directory: users.into_iter().collect(),
        }
    }

    /// Whether `user` is in the directory.
    pub fn knows(&self, user: &UserId) -> bool {
        self.directory.contains(user)
    }

    /// Issue a token for `user` valid for `ttl`.
    ///
    /// # Errors
    ///
    /// - `UnknownUser`: `user` is not in the directory
    pub fn issue(&self, user: &UserId, ttl: Duration) -> Result<Credential, AuthError> {
        if !self.knows(user) {
            return Err(AuthError::UnknownUser(user.clone()));
        }

        let expiry = self.env.wall_clock_secs().saturating_add(ttl.as_secs());
        let signed = format!("{}.{expiry}", URL_SAFE_NO_PAD.encode(user.as_str()));
        let tag = self.mac(signed.as_bytes())?.finalize().into_bytes();

        Ok(Credential::new(format!("{signed}.{}", URL_SAFE_NO_PAD.encode(tag))))
    }

    fn mac(&self, signed: &[u8]) -> Result<HmacSha256, AuthError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| AuthError::Invalid { reason: e.to_string() })?;
        mac.update(signed);
        Ok(mac)
    }
}

impl<E: Environment> IdentityResolver for HmacTokenResolver<E> {
    fn resolve(&self, credential: &Credential) -> Result<UserId, AuthError> {
        let token = credential.as_str();

        let Some((signed, tag)) = token.rsplit_once('.') else {
            return Err(AuthError::Invalid { reason: "malformed token".to_string() });
        };
        let Some((user_b64, expiry)) = signed.split_once('.') else {
            return Err(AuthError::Invalid { reason: "malformed token".to_string() });
        };

        let tag = URL_SAFE_NO_PAD
            .decode(tag)
            .map_err(|_| AuthError::Invalid { reason: "malformed signature".to_string() })?;
        self.mac(signed.as_bytes())?
            .verify_slice(&tag)
            .map_err(|_| AuthError::Invalid { reason: "bad signature".to_string() })?;

        let expiry: u64 = expiry
            .parse()
            .map_err(|_| AuthError::Invalid { reason: "malformed expiry".to_string() })?;
        if self.env.wall_clock_secs() >= expiry {
            return Err(AuthError::Expired);
        }

        let user_bytes = URL_SAFE_NO_PAD
            .decode(user_b64)
            .map_err(|_| AuthError::Invalid { reason: "malformed user id".to_string() })?;
        let user = String::from_utf8(user_bytes)
            .ok()
            .and_then(|id| UserId::new(id).ok())
            .ok_or_else(|| AuthError::Invalid { reason: "malformed user id".to_string() })?;

        if !self.knows(&user) {
            return Err(AuthError::UnknownUser(user));
        }

        Ok(user)
    }
}
