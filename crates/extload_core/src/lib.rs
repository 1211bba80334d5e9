//! Extension discovery and registration core.
//! Binds externally advertised extensions into host namespaces by name.

pub mod extension;
pub mod logging;

pub use extension::discovery::{
    AdvertisedExtension, DiscoverySource, ExtensionKey, Loader, ResolutionError, StaticDiscovery,
};
pub use extension::entry_points::{
    EntryPoint, EntryPointDiscovery, EntryPointParseError, EntryPointTable, EntryTarget,
    SymbolTable,
};
pub use extension::namespace::Namespace;
pub use extension::naming::{is_valid_extension_name, validate_extension_name, InvalidNameError};
pub use extension::registrar::{
    EntryStage, ExtensionError, ExtensionRegistrar, ExtensionWarning, RegistrationReport,
};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
