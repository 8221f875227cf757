//! Addressing schemes of the object store and identifier classification.
//!
//! The backend exposes one object under several URL shapes:
//!
//! - public: `{base}/{public_path}/{bucket}/{key}`
//! - signed: `{base}/{sign_path}/{bucket}/{key}?token=...`
//!
//! Keys are kept percent-encoded once they enter this module so that rebuilding
//! a URL from a parsed one never double-encodes.

use url::Url;

use super::error::DomainError;

const DEFAULT_PUBLIC_PATH: &str = "storage/v1/object/public";
const DEFAULT_SIGN_PATH: &str = "storage/v1/object/sign";

/// Object location inside the store, independent of URL shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAddress {
    /// Scheme, host and any mount prefix, without trailing slash.
    pub base: String,
    pub bucket: String,
    /// Percent-encoded key path, `/`-separated.
    pub key: String,
}

/// What an identifier string turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierKind {
    Empty,
    /// `data:` URI; already renderable.
    Inline(String),
    /// Public-form URL of this store.
    Public { url: String, address: ObjectAddress },
    /// Signed-form URL of this store; the token may have expired.
    Signed { url: String, address: ObjectAddress },
    /// Any other absolute http(s) URL.
    External(String),
    /// Raw storage key such as `covers/2024/spring.jpg`.
    StorageKey { path: String, address: ObjectAddress },
}

/// Declared URL layout of the object store.
///
/// Alternate bases and buckets are the only extra hosts the candidate
/// generator will ever probe; nothing outside this list is guessed.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    base: String,
    bucket: String,
    public_path: String,
    sign_path: String,
    alternate_bases: Vec<String>,
    alternate_buckets: Vec<String>,
}

impl StorageLayout {
    pub fn new(base: &str, bucket: &str) -> Result<Self, DomainError> {
        let base = normalize_base(base, "storage.public_base_url")?;
        let bucket = bucket.trim().trim_matches('/').to_string();
        if bucket.is_empty() {
            return Err(DomainError::invalid_layout(
                "storage.bucket",
                "bucket must not be empty",
            ));
        }

        Ok(Self {
            base,
            bucket,
            public_path: DEFAULT_PUBLIC_PATH.to_string(),
            sign_path: DEFAULT_SIGN_PATH.to_string(),
            alternate_bases: Vec::new(),
            alternate_buckets: Vec::new(),
        })
    }

    pub fn with_paths(mut self, public_path: &str, sign_path: &str) -> Result<Self, DomainError> {
        let public_path = public_path.trim().trim_matches('/');
        let sign_path = sign_path.trim().trim_matches('/');
        if public_path.is_empty() || sign_path.is_empty() {
            return Err(DomainError::invalid_layout(
                "storage.public_path",
                "object paths must not be empty",
            ));
        }
        if public_path == sign_path {
            return Err(DomainError::invalid_layout(
                "storage.sign_path",
                "public and signed paths must differ",
            ));
        }
        self.public_path = public_path.to_string();
        self.sign_path = sign_path.to_string();
        Ok(self)
    }

    pub fn with_alternates(
        mut self,
        bases: &[String],
        buckets: &[String],
    ) -> Result<Self, DomainError> {
        for base in bases {
            let normalized = normalize_base(base, "storage.alternate_bases")?;
            if normalized != self.base && !self.alternate_bases.contains(&normalized) {
                self.alternate_bases.push(normalized);
            }
        }
        for bucket in buckets {
            let bucket = bucket.trim().trim_matches('/');
            if !bucket.is_empty()
                && bucket != self.bucket
                && !self.alternate_buckets.iter().any(|known| known == bucket)
            {
                self.alternate_buckets.push(bucket.to_string());
            }
        }
        Ok(self)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn alternate_bases(&self) -> &[String] {
        &self.alternate_bases
    }

    pub fn alternate_buckets(&self) -> &[String] {
        &self.alternate_buckets
    }

    pub fn public_url(&self, address: &ObjectAddress) -> String {
        join_url(&address.base, &self.public_path, &address.bucket, &address.key)
    }

    /// Token-less signed form, kept for objects only reachable through old links.
    pub fn legacy_signed_url(&self, address: &ObjectAddress) -> String {
        join_url(&address.base, &self.sign_path, &address.bucket, &address.key)
    }

    /// Address of a raw key in the primary base and bucket.
    pub fn address_for_key(&self, path: &str) -> ObjectAddress {
        let trimmed = path.trim().trim_start_matches('/');
        let without_bucket = trimmed
            .strip_prefix(self.bucket.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(trimmed);

        ObjectAddress {
            base: self.base.clone(),
            bucket: self.bucket.clone(),
            key: encode_key(without_bucket),
        }
    }

    pub fn classify(&self, identifier: &str) -> IdentifierKind {
        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            return IdentifierKind::Empty;
        }
        if trimmed.starts_with("data:") {
            return IdentifierKind::Inline(trimmed.to_string());
        }

        let lowered = trimmed.to_ascii_lowercase();
        if !(lowered.starts_with("http://") || lowered.starts_with("https://")) {
            let address = self.address_for_key(trimmed);
            if address.key.is_empty() {
                return IdentifierKind::Empty;
            }
            return IdentifierKind::StorageKey {
                path: decode_free_path(trimmed, &self.bucket),
                address,
            };
        }

        let Ok(parsed) = Url::parse(trimmed) else {
            return IdentifierKind::External(trimmed.to_string());
        };

        if let Some(address) = split_object_path(&parsed, &self.sign_path) {
            return IdentifierKind::Signed {
                url: trimmed.to_string(),
                address,
            };
        }
        if let Some(address) = split_object_path(&parsed, &self.public_path) {
            return IdentifierKind::Public {
                url: trimmed.to_string(),
                address,
            };
        }
        IdentifierKind::External(trimmed.to_string())
    }
}

/// Swap `http` and `https`; `None` for any other scheme.
pub fn swap_protocol(url: &str) -> Option<String> {
    if let Some(rest) = url.strip_prefix("https://") {
        Some(format!("http://{rest}"))
    } else {
        url.strip_prefix("http://")
            .map(|rest| format!("https://{rest}"))
    }
}

/// Plausible spellings of a key whose extension does not pin the format down.
///
/// `jpg`/`jpeg` swap, upper-case extensions gain a lower-case variant, and
/// keys without an extension try the common web formats.
pub fn extension_variants(key: &str) -> Vec<String> {
    let (dir, file) = match key.rfind('/') {
        Some(index) => (&key[..=index], &key[index + 1..]),
        None => ("", key),
    };
    if file.is_empty() {
        return Vec::new();
    }

    let Some(dot) = file.rfind('.').filter(|index| *index > 0) else {
        return ["jpg", "png", "webp"]
            .iter()
            .map(|ext| format!("{dir}{file}.{ext}"))
            .collect();
    };

    let stem = &file[..dot];
    let extension = &file[dot + 1..];
    let lowered = extension.to_ascii_lowercase();
    let mut variants = Vec::new();

    if lowered != extension {
        variants.push(format!("{dir}{stem}.{lowered}"));
    }
    match lowered.as_str() {
        "jpg" => variants.push(format!("{dir}{stem}.jpeg")),
        "jpeg" => variants.push(format!("{dir}{stem}.jpg")),
        _ => {}
    }
    variants
}

fn normalize_base(raw: &str, field: &'static str) -> Result<String, DomainError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|err| DomainError::invalid_layout(field, format!("`{trimmed}`: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DomainError::invalid_layout(
            field,
            format!("`{trimmed}` must use http or https"),
        ));
    }
    if parsed.host_str().is_none() {
        return Err(DomainError::invalid_layout(
            field,
            format!("`{trimmed}` has no host"),
        ));
    }
    Ok(trimmed.to_string())
}

fn join_url(base: &str, object_path: &str, bucket: &str, key: &str) -> String {
    format!("{base}/{object_path}/{bucket}/{key}")
}

fn split_object_path(url: &Url, object_path: &str) -> Option<ObjectAddress> {
    let marker = format!("/{object_path}/");
    let path = url.path();
    let index = path.find(&marker)?;
    let (bucket, key) = path[index + marker.len()..].split_once('/')?;
    if bucket.is_empty() || key.is_empty() {
        return None;
    }

    let mut base = format!("{}://{}", url.scheme(), url.host_str()?);
    if let Some(port) = url.port() {
        base.push_str(&format!(":{port}"));
    }
    base.push_str(&path[..index]);

    Some(ObjectAddress {
        base,
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}

fn decode_free_path(raw: &str, bucket: &str) -> String {
    let trimmed = raw.trim_start_matches('/');
    trimmed
        .strip_prefix(bucket)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(trimmed)
        .to_string()
}

/// Percent-encode each path segment of a raw key.
pub fn encode_key(raw: &str) -> String {
    raw.split('/')
        .filter(|segment| !segment.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}
