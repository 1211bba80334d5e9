//! Discovery contracts for advertised extensions.
//!
//! # Responsibility
//! - Define what a discovery source hands to the registrar: a name, a
//!   human-readable entry descriptor, and a deferred loader.
//! - Provide an in-memory source for hosts that register extensions at
//!   compile time.
//!
//! # Invariants
//! - Each `discover` call yields fresh entries; loaders are consumed once.
//! - Entry order is the order the source returns; the registrar never sorts.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Opaque identifier of one discovery namespace, e.g. `explainers`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExtensionKey(String);

impl ExtensionKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ExtensionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExtensionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ExtensionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Failure while resolving an advertised extension to its entity.
#[derive(Debug)]
pub struct ResolutionError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

impl ResolutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps a lower-level failure; its `source()` chain is kept for reports.
    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync + 'static>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ResolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ResolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn Error + 'static))
    }
}

/// Deferred resolution step for one advertised extension.
pub type Loader<T> = Box<dyn FnOnce() -> Result<T, ResolutionError>>;

/// One extension advertised under a key.
pub struct AdvertisedExtension<T> {
    name: String,
    descriptor: String,
    loader: Loader<T>,
}

impl<T> AdvertisedExtension<T> {
    /// Creates an entry whose descriptor is its name.
    pub fn new(
        name: impl Into<String>,
        loader: impl FnOnce() -> Result<T, ResolutionError> + 'static,
    ) -> Self {
        let name = name.into();
        Self {
            descriptor: name.clone(),
            name,
            loader: Box::new(loader),
        }
    }

    /// Replaces the descriptor used to identify this entry in diagnostics.
    pub fn with_descriptor(mut self, descriptor: impl Into<String>) -> Self {
        self.descriptor = descriptor.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    /// Runs the loader, consuming the entry.
    pub fn load(self) -> Result<T, ResolutionError> {
        (self.loader)()
    }
}

impl<T> Debug for AdvertisedExtension<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvertisedExtension")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Enumerates the extensions advertised under one key.
pub trait DiscoverySource<T> {
    fn discover(&self, key: &ExtensionKey) -> Vec<AdvertisedExtension<T>>;
}

impl<T, S> DiscoverySource<T> for &S
where
    S: DiscoverySource<T> + ?Sized,
{
    fn discover(&self, key: &ExtensionKey) -> Vec<AdvertisedExtension<T>> {
        (**self).discover(key)
    }
}

type Factory<T> = Arc<dyn Fn() -> Result<T, ResolutionError> + Send + Sync>;

struct StaticEntry<T> {
    name: String,
    factory: Factory<T>,
}

/// In-memory discovery source keyed by extension key.
///
/// Entries keep their insertion order within a key. Duplicated names are
/// kept as-is; collisions are the registrar's concern.
pub struct StaticDiscovery<T> {
    groups: BTreeMap<ExtensionKey, Vec<StaticEntry<T>>>,
}

impl<T> Default for StaticDiscovery<T> {
    fn default() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }
}

impl<T: 'static> StaticDiscovery<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises one extension under `key`.
    pub fn advertise(
        &mut self,
        key: impl Into<ExtensionKey>,
        name: impl Into<String>,
        factory: impl Fn() -> Result<T, ResolutionError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.groups
            .entry(key.into())
            .or_default()
            .push(StaticEntry {
                name: name.into(),
                factory: Arc::new(factory),
            });
        self
    }

    /// Number of entries advertised under `key`.
    pub fn count(&self, key: &ExtensionKey) -> usize {
        self.groups.get(key).map_or(0, Vec::len)
    }
}

impl<T: 'static> DiscoverySource<T> for StaticDiscovery<T> {
    fn discover(&self, key: &ExtensionKey) -> Vec<AdvertisedExtension<T>> {
        let Some(entries) = self.groups.get(key) else {
            return vec![];
        };
        entries
            .iter()
            .map(|entry| {
                let factory = Arc::clone(&entry.factory);
                AdvertisedExtension::new(entry.name.clone(), move || factory())
            })
            .collect()
    }
}
