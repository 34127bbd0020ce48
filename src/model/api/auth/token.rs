use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
#[cfg(test)]
use rocket::{
    http::{Cookie, SameSite},
    time::Duration,
};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::{
    common::account::{Account, AccountKind},
    mongodb::Id,
};
use crate::store::SharedStore;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

/// An authentication token for one account.
///
/// Tokens are issued by the login system, which is not part of this crate;
/// [`AuthToken::issue`] is the contract it signs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub id: Id,
    #[serde(rename = "knd")]
    pub kind: AccountKind,
}

impl AuthToken {
    pub fn new(account: Account) -> Self {
        Self {
            id: account.id(),
            kind: account.kind(),
        }
    }

    /// The account this token was issued for.
    pub fn account(&self) -> Account {
        Account::new(self.kind, self.id)
    }

    /// Sign this token into a JWT, valid for the configured lifetime.
    pub fn issue(self, config: &Config) -> Result<String, JwtError> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )
    }

    /// Sign this token into an auth cookie.
    #[cfg(test)]
    pub fn into_cookie(self, config: &Config) -> Result<Cookie<'static>, JwtError> {
        let token = self.issue(config)?;
        Ok(Cookie::build(AUTH_TOKEN_COOKIE, token)
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .finish())
    }

    /// Verify and decode a signed token.
    pub fn decode(token: &str, config: &Config) -> Result<Self, JwtError> {
        jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| claims.claims.token)
    }
}

/// JWT claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    token: AuthToken,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// The raw token, from the auth cookie or else a bearer `Authorization` header.
fn raw_token(req: &Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get_one("Authorization")
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Account {
    type Error = Error;

    /// Resolve the caller's account from their token. Voter tokens must
    /// still refer to a registered voter.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(config) => config,
            None => {
                let err = Error::Unauthorized("Authentication is not configured".to_string());
                return Outcome::Failure((Status::InternalServerError, err));
            }
        };

        let raw = match raw_token(req) {
            Some(raw) => raw,
            None => {
                let err = Error::Unauthorized("Authentication required".to_string());
                return Outcome::Failure((Status::Unauthorized, err));
            }
        };
        let token = match AuthToken::decode(&raw, config) {
            Ok(token) => token,
            Err(e) => return Outcome::Failure((Status::Unauthorized, e.into())),
        };

        let account = token.account();
        if let Account::Voter(id) = account {
            let store = match req.rocket().state::<SharedStore>() {
                Some(store) => store,
                None => {
                    let err = Error::Unauthorized("Voter lookup is not configured".to_string());
                    return Outcome::Failure((Status::InternalServerError, err));
                }
            };
            match store.voter(id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    let err = Error::Unauthorized("Unknown voter".to_string());
                    return Outcome::Failure((Status::Unauthorized, err));
                }
                Err(e) => return Outcome::Failure((Status::InternalServerError, e.into())),
            }
        }
        Outcome::Success(account)
    }
}
