/// Cloudflare R2 presigned GET URLs
///
/// R2 speaks the S3 API, so URLs are presigned with AWS Signature Version 4
/// in query-string form: region `auto`, service `s3`, only the `host` header
/// signed, unsigned payload. Signing is a local HMAC computation and never
/// touches the network.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::{ObjectUrlSigner, SignerError};
use crate::config::StorageConfig;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const R2_REGION: &str = "auto";
const SERVICE: &str = "s3";
/// SigV4 refuses presigned URLs valid for longer than seven days
const MAX_EXPIRES_SECS: u64 = 7 * 24 * 3600;

/// Credential scope and secret for one signing identity.
struct SigV4<'a> {
    access_key_id: &'a str,
    secret_access_key: &'a str,
    region: &'a str,
    service: &'a str,
}

impl SigV4<'_> {
    /// Signed query string for a GET of `canonical_path` on `host`.
    ///
    /// `canonical_path` must already be URI-encoded.
    fn presign_query(
        &self,
        host: &str,
        canonical_path: &str,
        now: DateTime<Utc>,
        expires_secs: u64,
    ) -> Result<String, SignerError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{}/{}/{}/aws4_request", date, self.region, self.service);
        let credential = format!("{}/{}", self.access_key_id, scope);

        // Parameters are already in byte order
        let query = format!(
            "X-Amz-Algorithm={}&X-Amz-Credential={}&X-Amz-Date={}&X-Amz-Expires={}&X-Amz-SignedHeaders=host",
            ALGORITHM,
            urlencoding::encode(&credential),
            amz_date,
            expires_secs,
        );

        let canonical_request = format!(
            "GET\n{}\n{}\nhost:{}\n\nhost\nUNSIGNED-PAYLOAD",
            canonical_path, query, host
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            scope,
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let k_date = hmac(format!("AWS4{}", self.secret_access_key).as_bytes(), &date)?;
        let k_region = hmac(&k_date, self.region)?;
        let k_service = hmac(&k_region, self.service)?;
        let k_signing = hmac(&k_service, "aws4_request")?;
        let signature = hex::encode(hmac(&k_signing, &string_to_sign)?);

        Ok(format!("{}&X-Amz-Signature={}", query, signature))
    }
}

fn hmac(key: &[u8], data: &str) -> Result<Vec<u8>, SignerError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| SignerError::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Percent-encode an object key one segment at a time, keeping `/` separators.
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

/// Presigns GET requests for objects in one R2 bucket (path-style addressing).
pub struct R2UrlSigner {
    access_key_id: String,
    secret_access_key: String,
    bucket: String,
    scheme: String,
    /// Host header value, including a non-default port
    host: String,
    expires_secs: u64,
}

impl std::fmt::Debug for R2UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2UrlSigner")
            .field("access_key_id", &self.access_key_id)
            .field("bucket", &self.bucket)
            .field("host", &self.host)
            .field("expires_secs", &self.expires_secs)
            .finish_non_exhaustive()
    }
}

impl R2UrlSigner {
    /// Build a signer from storage settings.
    ///
    /// # Errors
    /// Returns `SignerError::NotConfigured` if a credential or the bucket is
    /// missing, the endpoint is not an absolute URL, or the TTL is outside
    /// 1..=604800 seconds.
    pub fn new(config: &StorageConfig) -> Result<Self, SignerError> {
        let access_key_id = required(&config.access_key_id, "storage.access_key_id")?;
        let secret_access_key = required(&config.secret_access_key, "storage.secret_access_key")?;
        let bucket = required(&config.bucket, "storage.bucket")?;

        let endpoint = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                let account_id = required(&config.account_id, "storage.account_id")?;
                format!("https://{}.r2.cloudflarestorage.com", account_id)
            }
        };
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| SignerError::NotConfigured(format!("Invalid storage endpoint '{}': {}", endpoint, e)))?;
        let host_name = url
            .host_str()
            .ok_or_else(|| SignerError::NotConfigured(format!("Storage endpoint '{}' has no host", endpoint)))?;
        let host = match url.port() {
            Some(port) => format!("{}:{}", host_name, port),
            None => host_name.to_string(),
        };

        if config.url_ttl_secs == 0 || config.url_ttl_secs > MAX_EXPIRES_SECS {
            return Err(SignerError::NotConfigured(format!(
                "storage.url_ttl_secs must be within 1..={}",
                MAX_EXPIRES_SECS
            )));
        }

        Ok(R2UrlSigner {
            access_key_id,
            secret_access_key,
            bucket,
            scheme: url.scheme().to_string(),
            host,
            expires_secs: config.url_ttl_secs,
        })
    }

    /// Presign `object_ref` as of `now`.
    pub fn presign_at(&self, object_ref: &str, now: DateTime<Utc>) -> Result<String, SignerError> {
        if object_ref.trim().is_empty() {
            return Err(SignerError::InvalidReference("empty object reference".to_string()));
        }

        let path = format!(
            "/{}/{}",
            urlencoding::encode(&self.bucket),
            encode_key(object_ref)
        );
        let signer = SigV4 {
            access_key_id: &self.access_key_id,
            secret_access_key: &self.secret_access_key,
            region: R2_REGION,
            service: SERVICE,
        };
        let query = signer.presign_query(&self.host, &path, now, self.expires_secs)?;

        Ok(format!("{}://{}{}?{}", self.scheme, self.host, path, query))
    }
}

fn required(value: &Option<String>, name: &str) -> Result<String, SignerError> {
    value
        .clone()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| SignerError::NotConfigured(format!("{} is required to presign image URLs", name)))
}

#[async_trait]
impl ObjectUrlSigner for R2UrlSigner {
    async fn sign(&self, object_ref: &str) -> Result<String, SignerError> {
        self.presign_at(object_ref, Utc::now())
    }
}
