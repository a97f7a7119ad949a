use anyhow::Result;

/// String key/value storage backing the session and favorites stores
///
/// Calls are synchronous; callers decide whether a failure is fatal.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}
