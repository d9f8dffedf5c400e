use crate::Result;

/// Local key-value persistence medium.
///
/// Implementations hold whole serialized documents under string keys. Errors
/// are reported, but callers such as the article store are free to degrade
/// them to "empty" / "no-op".
pub trait KeyValueStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Read the value stored under `key`, `None` if nothing was ever written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
