//! Authentication header injection.

use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderName, AUTHORIZATION};

use crate::config::AuthSpec;

/// Header carrying the key for `api_key` auth.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The single header an auth scheme adds to every request.
pub fn auth_header(auth: &AuthSpec) -> (HeaderName, String) {
    match auth {
        AuthSpec::Bearer { token } => (AUTHORIZATION, format!("Bearer {token}")),
        AuthSpec::ApiKey { key } => (HeaderName::from_static(API_KEY_HEADER), key.clone()),
        AuthSpec::Basic { username, password } => {
            let encoded = STANDARD.encode(format!("{username}:{password}"));
            (AUTHORIZATION, format!("Basic {encoded}"))
        }
        AuthSpec::OAuth { token } => (AUTHORIZATION, format!("OAuth {token}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer() {
        let (name, value) = auth_header(&AuthSpec::Bearer { token: "t0k".into() });
        assert_eq!(name, AUTHORIZATION);
        assert_eq!(value, "Bearer t0k");
    }

    #[test]
    fn test_api_key() {
        let (name, value) = auth_header(&AuthSpec::ApiKey { key: "k3y".into() });
        assert_eq!(name.as_str(), "x-api-key");
        assert_eq!(value, "k3y");
    }

    #[test]
    fn test_basic_is_base64_of_user_colon_pass() {
        let (name, value) = auth_header(&AuthSpec::Basic {
            username: "Aladdin".into(),
            password: "open sesame".into(),
        });
        assert_eq!(name, AUTHORIZATION);
        assert_eq!(value, "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
    }

    #[test]
    fn test_oauth() {
        let (_, value) = auth_header(&AuthSpec::OAuth { token: "abc".into() });
        assert_eq!(value, "OAuth abc");
    }
}
