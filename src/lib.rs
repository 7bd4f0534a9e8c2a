//! typthon-bind - native binding core for the Typthon runtime
//!
//! Lets native code expose functions, classes and overload sets to the host
//! interpreter:
//! - `capability`: per-type protocol slots, shared substructures, trampolines
//! - `function`: overload chains and dispatch
//! - `class` / `module`: registration front-end
//! - `object`: the host object boundary

// Core modules
pub mod capability;
pub mod class;
pub mod config;
pub mod error;
pub mod function;
pub mod logging;
pub mod module;
pub mod object;

// Re-export commonly used items
pub use capability::{Capability, CapabilitySet, DefaultHooks, InstanceHooks};
pub use class::ClassBuilder;
pub use config::Config;
pub use error::{ExceptionKind, PyErr, PyResult};
pub use function::{
    add_to_namespace, argument, extract, keyword, CallError, FromPyObject, FunctionObject,
    IntoPyObject, Overload,
};
pub use module::{Module, ModuleBuilder};
pub use object::{KwArgs, PyObject, TypeObject};

/// Initialize logging and the process-wide configuration
///
/// Reads `typthon-bind.toml` (walking up from the working directory) unless a
/// configuration was installed already. Safe to call more than once.
pub fn init() -> &'static Config {
    let _ = config::install(Config::discover());
    let config = config::global();
    if std::env::var_os("TYPTHON_BIND_LOG_LEVEL").is_some() {
        logging::init();
    } else {
        logging::init_with_config(logging::LogConfig::from_settings(&config.logging));
    }
    logging::debug!(?config, "binding layer initialized");
    config
}
