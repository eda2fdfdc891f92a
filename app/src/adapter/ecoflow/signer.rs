use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::core::time::DateTime;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub access_key: String,
    pub nonce: String,
    pub timestamp: String,
    pub sign: String,
}

impl SignedHeaders {
    pub fn as_pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("accessKey", self.access_key.as_str()),
            ("nonce", self.nonce.as_str()),
            ("timestamp", self.timestamp.as_str()),
            ("sign", self.sign.as_str()),
        ]
    }
}

#[derive(Clone)]
pub struct Signer {
    access_key: String,
    secret_key: String,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

impl Signer {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    //fresh nonce and timestamp per request
    pub fn sign_request(&self, params: &[(&str, &str)]) -> Result<SignedHeaders, InvalidLength> {
        let nonce = rand::thread_rng().gen_range(100_000..=999_999).to_string();
        self.sign_with(params, &nonce, DateTime::now().timestamp_millis())
    }

    pub fn sign_with(
        &self,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp_millis: i64,
    ) -> Result<SignedHeaders, InvalidLength> {
        let timestamp = timestamp_millis.to_string();
        let auth = [
            ("accessKey", self.access_key.as_str()),
            ("nonce", nonce),
            ("timestamp", timestamp.as_str()),
        ];

        let sign = sign(&canonical_string(params, &auth), &self.secret_key)?;

        Ok(SignedHeaders {
            access_key: self.access_key.clone(),
            nonce: nonce.to_owned(),
            timestamp,
            sign,
        })
    }
}

pub fn query_string(params: &[(&str, &str)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|(a, _), (b, _)| a.cmp(b));

    sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

//request parameters first, then the auth headers. Each part is sorted by key.
pub fn canonical_string(params: &[(&str, &str)], auth: &[(&str, &str)]) -> String {
    if params.is_empty() {
        query_string(auth)
    } else {
        format!("{}&{}", query_string(params), query_string(auth))
    }
}

pub fn sign(canonical: &str, secret: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;

    mac.update(canonical.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
