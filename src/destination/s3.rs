//! S3 destination (spec.md §4.D): single-part `PUT` over HTTPS, signed with
//! the hand-rolled SigV4 in [`super::sigv4`]. `ListObjectsV2`/`DELETE` cover
//! the retention sweeper's and orchestrator's needs without pulling in the
//! full AWS SDK for what is, here, three HTTP verbs.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::blocking::Client;

use crate::error::BackupError;
use crate::model::BackupArtifact;

use super::sigv4::{self, SignedHeader};
use super::{with_retry, Destination, DestinationEntry};

pub struct S3Destination {
    name: String,
    bucket: String,
    prefix: String,
    region: String,
    access_key: String,
    secret_key: String,
    client: Client,
}

impl S3Destination {
    pub fn new(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        region: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            name: "s3".to_string(),
            bucket: bucket.into(),
            prefix: prefix.into(),
            region: region.into(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("reqwest client builds with default TLS backend"),
        }
    }

    fn host(&self) -> String {
        format!("{}.s3.{}.amazonaws.com", self.bucket, self.region)
    }

    fn object_key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), name)
        }
    }

    fn now_stamps() -> (String, String) {
        let now = Utc::now();
        (now.format("%Y%m%dT%H%M%SZ").to_string(), now.format("%Y%m%d").to_string())
    }

    fn authorization(
        &self,
        method: &str,
        key: &str,
        query: &str,
        payload_hash: &str,
        amz_date: &str,
        date_stamp: &str,
    ) -> (String, Vec<(String, String)>) {
        let host = self.host();
        let headers = vec![
            SignedHeader { name: "host", value: &host },
            SignedHeader { name: "x-amz-content-sha256", value: payload_hash },
            SignedHeader { name: "x-amz-date", value: amz_date },
        ];
        let uri = sigv4::uri_encode_path(&format!("/{key}"));
        let auth = sigv4::sign(
            method,
            &uri,
            query,
            &headers,
            payload_hash,
            &self.access_key,
            &self.secret_key,
            &self.region,
            "s3",
            amz_date,
            date_stamp,
        );
        let out_headers = vec![
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), amz_date.to_string()),
            ("Authorization".to_string(), auth),
        ];
        (uri, out_headers)
    }

    fn is_retryable(err: &BackupError) -> bool {
        match err {
            BackupError::DeliveryFailed { message, .. } => {
                !message.contains("400") && !message.contains("403") && !message.contains("404")
            }
            _ => true,
        }
    }
}

static KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Key>([^<]*)</Key>").unwrap());
static SIZE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<Size>(\d+)</Size>").unwrap());
static MODIFIED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<LastModified>([^<]*)</LastModified>").unwrap());
static CONTENTS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<Contents>(.*?)</Contents>").unwrap());

impl Destination for S3Destination {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, local_path: &Path) -> Result<BackupArtifact, BackupError> {
        let body = std::fs::read(local_path).map_err(BackupError::WriteFailed)?;
        let payload_hash = {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(&body);
            hex::encode(hasher.finalize())
        };

        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact.sql")
            .to_string();
        let key = self.object_key(&file_name);

        with_retry(
            |_attempt| {
                let (amz_date, date_stamp) = Self::now_stamps();
                let (uri, headers) =
                    self.authorization("PUT", &key, "", &payload_hash, &amz_date, &date_stamp);
                let url = format!("https://{}{uri}", self.host());

                let mut request = self.client.put(&url).body(body.clone());
                for (name, value) in &headers {
                    request = request.header(name.as_str(), value.as_str());
                }
                let response = request.send().map_err(|e| BackupError::DeliveryFailed {
                    destination: self.name.clone(),
                    message: e.to_string(),
                })?;

                if !response.status().is_success() {
                    return Err(BackupError::DeliveryFailed {
                        destination: self.name.clone(),
                        message: format!("S3 PUT returned {}", response.status()),
                    });
                }
                Ok(())
            },
            Self::is_retryable,
        )?;

        Ok(BackupArtifact {
            path: local_path.to_path_buf(),
            byte_size: body.len() as u64,
            checksum: None,
            destination: self.name.clone(),
            created_at: Utc::now(),
        })
    }

    fn list(&self) -> Result<Vec<DestinationEntry>, BackupError> {
        let empty_hash = {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(b"");
            hex::encode(hasher.finalize())
        };

        let query = format!("list-type=2&prefix={}", self.prefix);
        let (amz_date, date_stamp) = Self::now_stamps();
        let headers = {
            let host = self.host();
            vec![
                SignedHeader { name: "host", value: &host },
                SignedHeader { name: "x-amz-content-sha256", value: &empty_hash },
                SignedHeader { name: "x-amz-date", value: &amz_date },
            ]
        };
        let auth = sigv4::sign(
            "GET",
            "/",
            &query,
            &headers,
            &empty_hash,
            &self.access_key,
            &self.secret_key,
            &self.region,
            "s3",
            &amz_date,
            &date_stamp,
        );

        let url = format!("https://{}/?{query}", self.host());
        let response = self
            .client
            .get(&url)
            .header("x-amz-content-sha256", &empty_hash)
            .header("x-amz-date", &amz_date)
            .header("Authorization", &auth)
            .send()
            .map_err(|e| BackupError::DeliveryFailed {
                destination: self.name.clone(),
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(BackupError::DeliveryFailed {
                destination: self.name.clone(),
                message: format!("S3 ListObjectsV2 returned {}", response.status()),
            });
        }

        let body = response.text().map_err(|e| BackupError::DeliveryFailed {
            destination: self.name.clone(),
            message: e.to_string(),
        })?;

        Ok(parse_list_objects(&body))
    }

    fn delete(&self, name: &str) -> Result<(), BackupError> {
        let key = self.object_key(name);
        let payload_hash = {
            use sha2::{Digest, Sha256};
            let mut hasher = Sha256::new();
            hasher.update(b"");
            hex::encode(hasher.finalize())
        };
        let (amz_date, date_stamp) = Self::now_stamps();
        let (uri, headers) =
            self.authorization("DELETE", &key, "", &payload_hash, &amz_date, &date_stamp);
        let url = format!("https://{}{uri}", self.host());

        let mut request = self.client.delete(&url);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send().map_err(|e| BackupError::DeliveryFailed {
            destination: self.name.clone(),
            message: e.to_string(),
        })?;

        if !response.status().is_success() && response.status().as_u16() != 404 {
            return Err(BackupError::DeliveryFailed {
                destination: self.name.clone(),
                message: format!("S3 DELETE returned {}", response.status()),
            });
        }
        Ok(())
    }
}

fn parse_list_objects(xml: &str) -> Vec<DestinationEntry> {
    CONTENTS_RE
        .captures_iter(xml)
        .filter_map(|block| {
            let block = block.get(1)?.as_str();
            let key = KEY_RE.captures(block)?.get(1)?.as_str().to_string();
            let size: u64 = SIZE_RE
                .captures(block)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0);
            let modified_at = MODIFIED_RE
                .captures(block)
                .and_then(|c| c.get(1))
                .and_then(|m| DateTime::parse_from_rfc3339(m.as_str()).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            let name = key.rsplit('/').next().unwrap_or(&key).to_string();
            Some(DestinationEntry {
                name,
                modified_at,
                size,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_joins_prefix_and_name() {
        let dest = S3Destination::new("bucket", "backups", "us-east-1", "key", "secret");
        assert_eq!(dest.object_key("app_20260101.sql"), "backups/app_20260101.sql");
    }

    #[test]
    fn object_key_with_empty_prefix_is_bare_name() {
        let dest = S3Destination::new("bucket", "", "us-east-1", "key", "secret");
        assert_eq!(dest.object_key("app_20260101.sql"), "app_20260101.sql");
    }

    #[test]
    fn parses_list_objects_xml() {
        let xml = r#"
            <ListBucketResult>
              <Contents>
                <Key>backups/app_20260101.sql</Key>
                <Size>1024</Size>
                <LastModified>2026-01-01T00:00:00.000Z</LastModified>
              </Contents>
              <Contents>
                <Key>backups/app_20260102.sql.gz</Key>
                <Size>512</Size>
                <LastModified>2026-01-02T00:00:00.000Z</LastModified>
              </Contents>
            </ListBucketResult>
        "#;
        let entries = parse_list_objects(xml);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "app_20260101.sql");
        assert_eq!(entries[0].size, 1024);
    }
}
