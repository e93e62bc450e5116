//! Hand-rolled AWS Signature Version 4 for the narrow case this crate
//! needs: a single-part `PUT` of one object (spec.md §4.D). The full AWS
//! SDK pulls in an entire service-model code generator for that; `reqwest`
//! plus this module covers the one request shape actually used.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

fn hmac(key: &[u8], data: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// `URI-encode` a path segment per AWS's rules: unreserved characters and
/// `/` pass through, everything else is percent-encoded.
pub fn uri_encode_path(path: &str) -> String {
    path.split('/')
        .map(uri_encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn uri_encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// A single signed header, already lowercased by the caller.
pub struct SignedHeader<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

/// Build the canonical request string (AWS SigV4 step 1).
pub fn canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    headers: &[SignedHeader],
    payload_hash: &str,
) -> (String, String) {
    let mut sorted = headers.iter().collect::<Vec<_>>();
    sorted.sort_by(|a, b| a.name.cmp(b.name));

    let canonical_headers: String = sorted
        .iter()
        .map(|h| format!("{}:{}\n", h.name, h.value.trim()))
        .collect();
    let signed_headers = sorted
        .iter()
        .map(|h| h.name)
        .collect::<Vec<_>>()
        .join(";");

    let canonical = format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers}\n{signed_headers}\n{payload_hash}"
    );
    (canonical, signed_headers)
}

/// Derive the signing key via the HMAC chain
/// `HMAC(HMAC(HMAC(HMAC("AWS4"+secret, date), region), service), "aws4_request")`.
fn signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret_key}").as_bytes(), date_stamp);
    let k_region = hmac(&k_date, region);
    let k_service = hmac(&k_region, service);
    hmac(&k_service, "aws4_request")
}

/// Full AWS SigV4 signature for one request. `amz_date` is the
/// `YYYYMMDDTHHMMSSZ` timestamp also sent as the `x-amz-date` header;
/// `date_stamp` is its leading `YYYYMMDD` portion (AWS treats these as
/// separate values even though one is a prefix of the other).
#[allow(clippy::too_many_arguments)]
pub fn sign(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    headers: &[SignedHeader],
    payload_hash: &str,
    access_key: &str,
    secret_key: &str,
    region: &str,
    service: &str,
    amz_date: &str,
    date_stamp: &str,
) -> String {
    let (canonical, signed_headers) =
        canonical_request(method, canonical_uri, canonical_query, headers, payload_hash);
    let canonical_hash = sha256_hex(canonical.as_bytes());

    let credential_scope = format!("{date_stamp}/{region}/{service}/aws4_request");
    let string_to_sign =
        format!("AWS4-HMAC-SHA256\n{amz_date}\n{credential_scope}\n{canonical_hash}");

    let key = signing_key(secret_key, date_stamp, region, service);
    let signature = hex::encode(hmac(&key, &string_to_sign));

    format!(
        "AWS4-HMAC-SHA256 Credential={access_key}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Matches AWS's published worked example (IAM `ListUsers`, region
    /// `us-east-1`, date `20150830T123600Z`) byte-for-byte.
    #[test]
    fn reference_vector_matches_published_signature() {
        let headers = vec![
            SignedHeader {
                name: "content-type",
                value: "application/x-www-form-urlencoded; charset=utf-8",
            },
            SignedHeader {
                name: "host",
                value: "iam.amazonaws.com",
            },
            SignedHeader {
                name: "x-amz-date",
                value: "20150830T123600Z",
            },
        ];
        let payload_hash = sha256_hex(b"");

        let (canonical, signed_headers) = canonical_request(
            "GET",
            "/",
            "Action=ListUsers&Version=2010-05-08",
            &headers,
            &payload_hash,
        );
        assert_eq!(signed_headers, "content-type;host;x-amz-date");
        assert_eq!(
            sha256_hex(canonical.as_bytes()),
            "f536975d06c0309214f805bb90ccff089219ecd68b2577efef23edd43b7e1a59b"
        );

        let auth = sign(
            "GET",
            "/",
            "Action=ListUsers&Version=2010-05-08",
            &headers,
            &payload_hash,
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
            "us-east-1",
            "iam",
            "20150830T123600Z",
            "20150830",
        );
        assert!(auth.contains("Signature=5d672d79c15b13162d9279b0855cfba6789a8edb4c82c400e06b5924a6f2b5d2"));
    }

    #[test]
    fn path_encoding_preserves_slashes_and_escapes_specials() {
        assert_eq!(uri_encode_path("/a b/c"), "/a%20b/c");
        assert_eq!(uri_encode_path("/already-safe_chars.~"), "/already-safe_chars.~");
    }
}
