use crate::domain::model::Param;

/// A two-stage object: constructed once during the config phase, then asked
/// for the recipe of the run-phase object registered under its base name.
///
/// Providers are shared while config code mutates them, so any state they
/// carry should sit behind `Cell`/`RefCell`.
pub trait Provider {
    /// The designated get-factory method: dependency names followed by the function.
    fn get(&self) -> Param;
}
