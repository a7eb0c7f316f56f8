//! HTTP Basic-auth guard for the administrative routes.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::HeaderMap,
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::error::Error;

/// Credentials accepted for the admin routes.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Verify Basic credentials in `headers` against `config`.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  if username != config.username {
    return Err(Error::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(())
}

/// Middleware that rejects the request with 401 unless it carries valid
/// admin credentials.
pub async fn require_admin(
  State(auth): State<Arc<AuthConfig>>,
  req: Request,
  next: Next,
) -> Result<Response, Error> {
  if let Err(e) = verify_auth(req.headers(), &auth) {
    tracing::warn!(path = %req.uri().path(), "rejected admin request");
    return Err(e);
  }
  Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{Request, header};

  fn config(password: &str) -> AuthConfig {
    use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
    use rand_core::OsRng;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "admin".to_string(), password_hash: hash }
  }

  fn headers(value: Option<&str>) -> HeaderMap {
    let mut builder = Request::builder();
    if let Some(v) = value {
      builder = builder.header(header::AUTHORIZATION, v);
    }
    builder.body(()).unwrap().into_parts().0.headers
  }

  fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  #[test]
  fn correct_credentials() {
    let cfg = config("secret");
    assert!(verify_auth(&headers(Some(&basic("admin", "secret"))), &cfg).is_ok());
  }

  #[test]
  fn wrong_password() {
    let cfg = config("secret");
    assert!(matches!(
      verify_auth(&headers(Some(&basic("admin", "wrong"))), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn wrong_username() {
    let cfg = config("secret");
    assert!(matches!(
      verify_auth(&headers(Some(&basic("editor", "secret"))), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    let cfg = config("secret");
    assert!(matches!(verify_auth(&headers(None), &cfg), Err(Error::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let cfg = config("secret");
    assert!(matches!(
      verify_auth(&headers(Some("Basic !!!not-base64!!!")), &cfg),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn bearer_scheme_rejected() {
    let cfg = config("secret");
    assert!(matches!(
      verify_auth(&headers(Some("Bearer abc")), &cfg),
      Err(Error::Unauthorized)
    ));
  }
}
