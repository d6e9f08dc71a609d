//! Authenticated HTTP session against a Solid pod

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LINK};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::acl::AclDocument;
use super::container::contained_resources;
use super::jsonld::resolve;
use super::PodClient;
use crate::error::{PodNotifyError, Result};
use crate::types::{Credentials, LD_JSON};

/// Pod session logged in with client credentials
///
/// Requests carry the access token as a bearer token. No request timeout is
/// configured; a stalled pod stalls only the call waiting on it.
pub struct SolidSession {
    http: Client,
    access_token: String,
    web_id: String,
}

impl std::fmt::Debug for SolidSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolidSession")
            .field("web_id", &self.web_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct ProviderConfiguration {
    token_endpoint: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl SolidSession {
    /// Log in against the credentials' OIDC issuer
    pub async fn login(credentials: &Credentials) -> Result<Self> {
        if credentials.client_id.trim().is_empty() || credentials.client_secret.trim().is_empty()
        {
            return Err(PodNotifyError::Auth(
                "client id and secret are required".to_string(),
            ));
        }

        let http = Client::new();
        let discovery = format!(
            "{}/.well-known/openid-configuration",
            credentials.oidc_issuer.trim_end_matches('/')
        );
        let response = http.get(&discovery).send().await?;
        if !response.status().is_success() {
            return Err(PodNotifyError::Auth(format!(
                "OIDC discovery at {} failed ({})",
                discovery,
                response.status()
            )));
        }
        let provider: ProviderConfiguration = response.json().await?;

        let response = http
            .post(&provider.token_endpoint)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", "webid")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PodNotifyError::Auth(format!(
                "Authentication failed ({}), check credentials",
                response.status()
            )));
        }
        let token: TokenResponse = response.json().await?;
        let web_id = decode_web_id(&token.access_token)?;

        tracing::info!("Logged in as {}", web_id);
        Ok(Self {
            http,
            access_token: token.access_token,
            web_id,
        })
    }

    /// Look up the ACL URL a resource advertises in its `Link` header
    async fn acl_url(&self, resource_url: &str) -> Result<String> {
        let response = self
            .http
            .head(resource_url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PodNotifyError::Pod {
                status: response.status().as_u16(),
                url: resource_url.to_string(),
            });
        }

        response
            .headers()
            .get_all(LINK)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| parse_link_header(value, "acl"))
            .map(|target| resolve(resource_url, &target))
            .ok_or_else(|| PodNotifyError::Acl(format!("{} advertises no ACL", resource_url)))
    }
}

#[async_trait]
impl PodClient for SolidSession {
    fn web_id(&self) -> &str {
        &self.web_id
    }

    async fn fetch_container_listing(&self, container_url: &str) -> Result<Vec<String>> {
        let response = self
            .http
            .get(container_url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, LD_JSON)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PodNotifyError::Pod {
                status: response.status().as_u16(),
                url: container_url.to_string(),
            });
        }
        let doc: Value = response.json().await?;
        Ok(contained_resources(container_url, &doc))
    }

    async fn fetch_acl(&self, resource_url: &str) -> Result<AclDocument> {
        let acl_url = self.acl_url(resource_url).await?;
        let response = self
            .http
            .get(&acl_url)
            .bearer_auth(&self.access_token)
            .header(ACCEPT, LD_JSON)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!("No ACL at {}, starting a fresh one", acl_url);
                Ok(AclDocument::for_owner(acl_url, resource_url, &self.web_id))
            }
            status if status.is_success() => {
                let doc: Value = response.json().await?;
                AclDocument::from_json_ld(&acl_url, resource_url, &doc)
            }
            status => Err(PodNotifyError::Pod {
                status: status.as_u16(),
                url: acl_url,
            }),
        }
    }

    async fn save_acl(&self, acl: &AclDocument) -> Result<()> {
        let response = self
            .http
            .put(&acl.acl_url)
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, "text/turtle")
            .body(acl.to_turtle()?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PodNotifyError::Pod {
                status: response.status().as_u16(),
                url: acl.acl_url.clone(),
            });
        }
        Ok(())
    }

    async fn overwrite_file(
        &self,
        url: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<()> {
        let response = self
            .http
            .put(url)
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(PodNotifyError::Pod {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(())
    }

    async fn post_json_ld(&self, url: &str, body: &Value) -> Result<u16> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .header(CONTENT_TYPE, LD_JSON)
            .body(serde_json::to_vec(body)?)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<(u16, String)> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok((status, text))
    }
}

/// Extract the `webid` claim from a JWT access token
///
/// The signature is not checked; the token came straight from the issuer
/// over TLS and the pod verifies it on every request.
pub fn decode_web_id(token: &str) -> Result<String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| PodNotifyError::Auth("access token is not a JWT".to_string()))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| PodNotifyError::Auth(format!("malformed access token: {}", e)))?;
    let claims: Value = serde_json::from_slice(&bytes)?;

    claims
        .get("webid")
        .and_then(Value::as_str)
        .or_else(|| {
            claims
                .get("sub")
                .and_then(Value::as_str)
                .filter(|sub| sub.starts_with("http"))
        })
        .map(str::to_string)
        .ok_or_else(|| PodNotifyError::Auth("access token carries no WebID".to_string()))
}

/// Find the target of the first link with relation `rel` in a `Link` header
pub fn parse_link_header(header: &str, rel: &str) -> Option<String> {
    for link in header.split(',') {
        let link = link.trim();
        let (Some(start), Some(end)) = (link.find('<'), link.find('>')) else {
            continue;
        };
        if end < start {
            continue;
        }
        let target = &link[start + 1..end];
        let matches = link[end + 1..].split(';').any(|param| {
            let Some((key, value)) = param.split_once('=') else {
                return false;
            };
            key.trim().eq_ignore_ascii_case("rel")
                && value
                    .trim()
                    .trim_matches('"')
                    .split_whitespace()
                    .any(|r| r == rel)
        });
        if matches {
            return Some(target.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt(claims: Value) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            engine.encode(br#"{"alg":"ES256"}"#),
            engine.encode(serde_json::to_vec(&claims).unwrap())
        )
    }

    #[test]
    fn test_decode_web_id_claim() {
        let token = jwt(serde_json::json!({
            "webid": "https://server.example/profile#me",
            "sub": "client-123"
        }));
        assert_eq!(
            decode_web_id(&token).unwrap(),
            "https://server.example/profile#me"
        );
    }

    #[test]
    fn test_decode_web_id_falls_back_to_url_sub() {
        let token = jwt(serde_json::json!({"sub": "https://a.example/card#me"}));
        assert_eq!(decode_web_id(&token).unwrap(), "https://a.example/card#me");

        let token = jwt(serde_json::json!({"sub": "opaque"}));
        assert!(matches!(decode_web_id(&token), Err(PodNotifyError::Auth(_))));
    }

    #[test]
    fn test_decode_web_id_rejects_garbage() {
        assert!(decode_web_id("not-a-token").is_err());
    }

    #[test]
    fn test_parse_link_header() {
        let header = r#"<http://www.w3.org/ns/ldp#BasicContainer>; rel="type", <.acl>; rel="acl""#;
        assert_eq!(parse_link_header(header, "acl"), Some(".acl".to_string()));
        assert_eq!(
            parse_link_header(header, "type"),
            Some("http://www.w3.org/ns/ldp#BasicContainer".to_string())
        );
        assert_eq!(parse_link_header(header, "describedby"), None);
    }

    #[test]
    fn test_parse_link_header_multi_rel() {
        let header = r#"<inbox.acl>; rel="acl describedby""#;
        assert_eq!(parse_link_header(header, "acl"), Some("inbox.acl".to_string()));
    }

    #[tokio::test]
    async fn test_login_requires_credentials() {
        let creds = Credentials::new("", "", "https://issuer.example");
        let err = SolidSession::login(&creds).await.unwrap_err();
        assert!(matches!(err, PodNotifyError::Auth(_)));
    }
}
