//! Extension registration pass.
//!
//! # Responsibility
//! - Walk every extension advertised under one key and bind accepted ones
//!   into a host namespace.
//! - Turn every per-entry failure into one warning: logged at WARN and
//!   returned in the pass report.
//!
//! # Invariants
//! - One failing entry never stops the pass.
//! - The namespace changes only on a successful bind; failed entries leave
//!   no key behind.
//! - Existing bindings are never overwritten.
//! - Panics raised by loaders or predicates are caught per entry and reported
//!   as resolution failures.
//! - Failure messages are single-line; extension-provided text cannot start a
//!   new log record.

use crate::extension::discovery::{
    AdvertisedExtension, DiscoverySource, ExtensionKey, ResolutionError,
};
use crate::extension::namespace::Namespace;
use crate::extension::naming::{validate_extension_name, InvalidNameError};
use crate::logging::{panic_payload_text, sanitize_message};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};

const MAX_FAILURE_MESSAGE_CHARS: usize = 4096;
const MAX_LOG_FIELD_CHARS: usize = 256;

/// Per-entry processing stage.
///
/// Entries move `Resolving -> ValidatingName -> ValidatingShape ->
/// CheckingCollision -> Bound`. A failure is tagged with the stage it hit, so
/// warnings never carry `Bound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStage {
    Resolving,
    ValidatingName,
    ValidatingShape,
    CheckingCollision,
    Bound,
}

impl EntryStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::ValidatingName => "validating_name",
            Self::ValidatingShape => "validating_shape",
            Self::CheckingCollision => "checking_collision",
            Self::Bound => "bound",
        }
    }
}

impl Display for EntryStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of one advertised extension.
#[derive(Debug)]
pub enum ExtensionError {
    InvalidName(InvalidNameError),
    ValidationFailed { name: String },
    Collision { name: String, namespace: String },
    Resolution(ResolutionError),
}

impl Display for ExtensionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "{err}"),
            Self::ValidationFailed { name } => write!(f, "extension `{name}` failed validation"),
            Self::Collision { name, namespace } => write!(
                f,
                "extension name `{name}` already exists in namespace `{namespace}`"
            ),
            Self::Resolution(err) => write!(f, "extension could not be resolved: {err}"),
        }
    }
}

impl Error for ExtensionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(_) | Self::ValidationFailed { .. } | Self::Collision { .. } => None,
            // Display already renders the resolution message; continue below it.
            Self::Resolution(err) => err.source(),
        }
    }
}

/// One failed entry, as surfaced to the host.
#[derive(Debug)]
pub struct ExtensionWarning {
    pub key: ExtensionKey,
    pub name: String,
    /// Entry identifier from the discovery source.
    pub entry: String,
    pub stage: EntryStage,
    pub error: ExtensionError,
    /// Same single-line text as the WARN log line.
    pub message: String,
}

impl Display for ExtensionWarning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of one registration pass.
#[derive(Debug)]
pub struct RegistrationReport {
    pub key: ExtensionKey,
    /// Names bound during this pass, in discovery order.
    pub bound: Vec<String>,
    /// One warning per failed entry, in discovery order.
    pub warnings: Vec<ExtensionWarning>,
}

impl RegistrationReport {
    fn new(key: ExtensionKey) -> Self {
        Self {
            key,
            bound: vec![],
            warnings: vec![],
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn failed_names(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .map(|warning| warning.name.as_str())
            .collect()
    }
}

/// Binds extensions from one discovery source into host namespaces.
#[derive(Debug, Clone)]
pub struct ExtensionRegistrar<S> {
    source: S,
}

impl<S> ExtensionRegistrar<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Registers every extension advertised under `key` into `namespace`.
    ///
    /// `predicate` decides whether a resolved entity has the expected shape.
    /// Never fails as a whole: per-entry failures are logged at WARN and
    /// returned in [`RegistrationReport::warnings`].
    pub fn register<T, P>(
        &self,
        namespace: &mut Namespace<T>,
        key: &ExtensionKey,
        predicate: P,
    ) -> RegistrationReport
    where
        S: DiscoverySource<T>,
        P: Fn(&T) -> bool,
    {
        let entries = self.source.discover(key);
        debug!(
            "event=extension_discover module=registrar status=ok key={} entries={}",
            key,
            entries.len()
        );

        let mut report = RegistrationReport::new(key.clone());
        for entry in entries {
            let name = entry.name().to_string();
            let descriptor = entry.descriptor().to_string();
            let log_name = sanitize_message(&name, MAX_LOG_FIELD_CHARS);
            debug!(
                "event=extension_process module=registrar key={} entry={}",
                key,
                sanitize_message(&descriptor, MAX_LOG_FIELD_CHARS)
            );

            match bind_entry(namespace, entry, &predicate) {
                Ok(()) => {
                    debug!(
                        "event=extension_bound module=registrar status=ok key={} name={} stage={} namespace={}",
                        key,
                        log_name,
                        EntryStage::Bound,
                        namespace.label()
                    );
                    report.bound.push(name);
                }
                Err((stage, error)) => {
                    let message = failure_message(key, &descriptor, stage, &error);
                    warn!(
                        "event=extension_failed module=registrar status=error key={} name={} stage={} message={}",
                        key, log_name, stage, message
                    );
                    report.warnings.push(ExtensionWarning {
                        key: key.clone(),
                        name,
                        entry: descriptor,
                        stage,
                        error,
                        message,
                    });
                }
            }
        }

        info!(
            "event=extension_register module=registrar status=ok key={} namespace={} bound={} failed={}",
            key,
            namespace.label(),
            report.bound.len(),
            report.warnings.len()
        );
        report
    }
}

fn bind_entry<T, P>(
    namespace: &mut Namespace<T>,
    entry: AdvertisedExtension<T>,
    predicate: &P,
) -> Result<(), (EntryStage, ExtensionError)>
where
    P: Fn(&T) -> bool,
{
    let name = entry.name().to_string();

    let entity = guard(|| entry.load())
        .and_then(|loaded| loaded)
        .map_err(|err| (EntryStage::Resolving, ExtensionError::Resolution(err)))?;
    debug!(
        "event=extension_loaded module=registrar status=ok name={}",
        sanitize_message(&name, MAX_LOG_FIELD_CHARS)
    );

    validate_extension_name(&name)
        .map_err(|err| (EntryStage::ValidatingName, ExtensionError::InvalidName(err)))?;

    let accepted = guard(|| predicate(&entity))
        .map_err(|err| (EntryStage::ValidatingShape, ExtensionError::Resolution(err)))?;
    if !accepted {
        return Err((
            EntryStage::ValidatingShape,
            ExtensionError::ValidationFailed { name },
        ));
    }

    if namespace.bind(name.as_str(), entity).is_err() {
        return Err((
            EntryStage::CheckingCollision,
            ExtensionError::Collision {
                name,
                namespace: namespace.label().to_string(),
            },
        ));
    }
    Ok(())
}

/// Runs extension-provided code, converting a panic into a resolution error.
fn guard<R>(f: impl FnOnce() -> R) -> Result<R, ResolutionError> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        ResolutionError::new(format!(
            "extension code panicked: {}",
            panic_payload_text(payload.as_ref())
        ))
    })
}

fn failure_message(
    key: &ExtensionKey,
    descriptor: &str,
    stage: EntryStage,
    error: &ExtensionError,
) -> String {
    let mut message = format!(
        "Failure while loading {key}. Failed to load entry point {descriptor} during {stage}: {error}"
    );
    let mut cause = error.source();
    while let Some(err) = cause {
        message.push_str("; caused by: ");
        message.push_str(&err.to_string());
        cause = err.source();
    }
    sanitize_message(&message, MAX_FAILURE_MESSAGE_CHARS)
}
