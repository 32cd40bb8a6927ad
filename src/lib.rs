pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::{ContainerConfig, ResolvePolicy};
pub use crate::core::facade::{Di, Filter, FilterLookup, DI, FILTER};
pub use crate::core::module::{filter_name, parse_param, Module};
pub use crate::core::registry::{BootstrapReport, Container, Phase};
pub use domain::model::{Args, Dep, Factory, Instance, Invocation, Key, Param, ParamItem, Resolved};
pub use domain::ports::Provider;
pub use utils::error::{DiError, Result};
pub use utils::text::{match_delimited, split_top_level};
