//! Identity, endpoint, and pool-keying types (spec §3).

use std::fmt;
use std::sync::Arc;

/// A callback invoked during interactive device-code acquisition.
///
/// The core never inspects the credential itself; it only needs a stable name to key pools
/// against and a way to surface the device-code prompt to whatever UI the caller has.
pub type DeviceCodeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// A named credential bundle, opaque to the core beyond its stable name.
#[derive(Clone)]
pub struct Identity {
    name: String,
    on_device_code: Option<DeviceCodeCallback>,
}

impl Identity {
    /// Creates an identity with no interactive callback.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            on_device_code: None,
        }
    }

    /// Attaches a device-code presentation callback.
    pub fn with_device_code_callback(mut self, callback: DeviceCodeCallback) -> Self {
        self.on_device_code = Some(callback);
        self
    }

    /// The identity's stable name, used for pool keying and cooldown tracking.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invokes the device-code callback, if one is registered.
    pub fn present_device_code(&self, message: &str) {
        if let Some(callback) = &self.on_device_code {
            callback(message);
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity").field("name", &self.name).finish()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Identity {}

/// The URL of one backend environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    url: String,
}

impl Endpoint {
    /// Builds an endpoint, normalizing the URL (lower-cased host, no trailing slash) so that
    /// two textually distinct but equivalent URLs key to the same pool.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: normalize_endpoint_url(&url.into()),
        }
    }

    /// The normalized URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn normalize_endpoint_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// The normalized key a [`CachedPoolRegistry`](crate) keys pool entries on: sorted identity
/// names plus a normalized endpoint (spec §3 `CachedPoolEntry`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    identity_names: Vec<String>,
    endpoint: Endpoint,
}

impl PoolKey {
    /// Builds a pool key from an identity set and endpoint, sorting identity names so that
    /// equivalent sets presented in any order key identically.
    pub fn new(identities: &[Identity], endpoint: Endpoint) -> Self {
        let mut identity_names: Vec<String> =
            identities.iter().map(|i| i.name().to_string()).collect();
        identity_names.sort();
        Self {
            identity_names,
            endpoint,
        }
    }

    /// The sorted identity names composing this key.
    pub fn identity_names(&self) -> &[String] {
        &self.identity_names
    }

    /// The normalized endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// True if `name` is one of the identities composing this key, used by
    /// `InvalidateIdentity` to find affected keys.
    pub fn contains_identity(&self, name: &str) -> bool {
        self.identity_names.iter().any(|n| n == name)
    }
}
