use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{TablePullError, TablePullResult};

const STORAGE_API_VERSION: &str = "2021-08-06";

// Azurite defaults behind UseDevelopmentStorage=true.
const DEV_STORAGE_ACCOUNT: &str = "devstoreaccount1";
const DEV_STORAGE_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_STORAGE_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

type HmacSha256 = Hmac<Sha256>;

/// Account identity, blob endpoint, and credential parsed from an Azure
/// storage connection string.
#[derive(Debug, Clone)]
pub struct StorageAccount {
    name: String,
    /// Blob endpoint without a trailing slash; may carry a path for
    /// path-style endpoints such as Azurite.
    endpoint: String,
    credential: StorageCredential,
}

#[derive(Debug, Clone)]
enum StorageCredential {
    /// Decoded account key for Shared Key request signing.
    SharedKey { key: Vec<u8> },
    /// Pre-signed SAS token appended to the query string, without the
    /// leading question mark.
    Sas { token: String },
}

impl StorageAccount {
    pub fn from_connection_string(connection_string: &str) -> TablePullResult<Self> {
        let mut parts: HashMap<&str, &str> = HashMap::new();
        for segment in connection_string.split(';') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                TablePullError::configuration(format!(
                    "Malformed connection string segment: '{}'",
                    segment
                ))
            })?;
            parts.insert(key, value);
        }

        if parts.get("UseDevelopmentStorage") == Some(&"true") {
            let key = BASE64.decode(DEV_STORAGE_KEY).map_err(|e| {
                TablePullError::configuration(format!("Development storage key is invalid: {}", e))
            })?;
            return Ok(Self {
                name: DEV_STORAGE_ACCOUNT.to_string(),
                endpoint: DEV_STORAGE_BLOB_ENDPOINT.to_string(),
                credential: StorageCredential::SharedKey { key },
            });
        }

        let name = parts.get("AccountName").map(|n| n.to_string());

        let endpoint = if let Some(blob_endpoint) = parts.get("BlobEndpoint") {
            blob_endpoint.trim_end_matches('/').to_string()
        } else if let Some(name) = &name {
            let protocol = parts
                .get("DefaultEndpointsProtocol")
                .copied()
                .unwrap_or("https");
            let suffix = parts.get("EndpointSuffix").copied().unwrap_or("core.windows.net");
            format!("{}://{}.blob.{}", protocol, name, suffix)
        } else {
            return Err(TablePullError::configuration(
                "Connection string has neither AccountName nor BlobEndpoint",
            ));
        };

        if let Some(token) = parts.get("SharedAccessSignature") {
            return Ok(Self {
                name: name.unwrap_or_default(),
                endpoint,
                credential: StorageCredential::Sas {
                    token: token.trim_start_matches('?').to_string(),
                },
            });
        }

        let account_key = parts.get("AccountKey").ok_or_else(|| {
            TablePullError::configuration(
                "Connection string has no AccountKey or SharedAccessSignature",
            )
        })?;
        let name = name.ok_or_else(|| {
            TablePullError::configuration("Connection string has AccountKey but no AccountName")
        })?;
        let key = BASE64.decode(account_key).map_err(|e| {
            TablePullError::configuration(format!("AccountKey is not valid base64: {}", e))
        })?;

        Ok(Self {
            name,
            endpoint,
            credential: StorageCredential::SharedKey { key },
        })
    }

    fn blob_url(&self, container: &str, blob: &str) -> String {
        format!("{}{}", self.endpoint, blob_path(container, blob))
    }

    /// Canonicalized resource for Shared Key signing: the account name
    /// followed by the URL path exactly as sent, escaped segments included.
    /// Path-style endpoints contribute their own path segment.
    fn canonical_resource(&self, container: &str, blob: &str) -> String {
        format!(
            "/{}{}{}",
            self.name,
            endpoint_path(&self.endpoint),
            blob_path(container, blob)
        )
    }

    /// The Blob service string-to-sign for a bare GET: the verb, eleven
    /// empty standard-header slots, the canonicalized x-ms headers, then the
    /// canonicalized resource.
    fn string_to_sign(&self, date: &str, container: &str, blob: &str) -> String {
        format!(
            "GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{}\nx-ms-version:{}\n{}",
            date,
            STORAGE_API_VERSION,
            self.canonical_resource(container, blob)
        )
    }
}

/// Container-and-blob path below the endpoint. Each blob segment is
/// percent-escaped; slashes separating virtual directories survive. Both the
/// request URL and the canonicalized resource are built from this, so the
/// signature always covers the path as sent.
fn blob_path(container: &str, blob: &str) -> String {
    let escaped: Vec<String> = blob
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("/{}/{}", container, escaped.join("/"))
}

/// Path portion of an endpoint URL, empty for host-only endpoints.
fn endpoint_path(endpoint: &str) -> &str {
    let rest = match endpoint.find("://") {
        Some(idx) => &endpoint[idx + 3..],
        None => endpoint,
    };
    match rest.find('/') {
        Some(slash) => &rest[slash..],
        None => "",
    }
}

fn sign(key: &[u8], string_to_sign: &str) -> TablePullResult<String> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| {
        TablePullError::configuration(format!("Account key rejected by HMAC: {}", e))
    })?;
    mac.update(string_to_sign.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Downloads blobs over the storage REST interface. One attempt per call,
/// no retry.
pub struct BlobStore {
    http: reqwest::Client,
    account: StorageAccount,
    container: String,
}

impl BlobStore {
    pub fn new(storage: &StorageConfig, timeout: Duration) -> TablePullResult<Self> {
        let account = StorageAccount::from_connection_string(&storage.connection_string)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            http,
            account,
            container: storage.container.clone(),
        })
    }

    pub async fn download(&self, blob: &str) -> TablePullResult<Vec<u8>> {
        let url = self.account.blob_url(&self.container, blob);
        debug!("Blob request: {}", url);

        let request = match &self.account.credential {
            StorageCredential::SharedKey { key } => {
                let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
                let string_to_sign = self.account.string_to_sign(&date, &self.container, blob);
                let signature = sign(key, &string_to_sign)?;

                self.http
                    .get(&url)
                    .header("x-ms-date", date)
                    .header("x-ms-version", STORAGE_API_VERSION)
                    .header(
                        "Authorization",
                        format!("SharedKey {}:{}", self.account.name, signature),
                    )
            }
            StorageCredential::Sas { token } => self.http.get(format!("{}?{}", url, token)),
        };

        let response = request.send().await.map_err(|e| {
            TablePullError::connectivity(
                format!("Blob request to {} failed", self.account.endpoint),
                e,
            )
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TablePullError::BlobNotFound {
                container: self.container.clone(),
                blob: blob.to_string(),
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(TablePullError::blob_storage(format!(
                "Storage API error ({}): {}",
                status, text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TablePullError::connectivity("Blob body read failed", e))?;

        info!("📄 Downloaded '{}' ({} bytes)", blob, bytes.len());
        Ok(bytes.to_vec())
    }
}
