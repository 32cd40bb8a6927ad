pub mod facade;
pub mod module;
pub mod registry;

pub use crate::domain::model::{Args, Dep, Instance, Invocation, Key, Param, Resolved};
pub use crate::domain::ports::Provider;
pub use crate::utils::error::Result;
