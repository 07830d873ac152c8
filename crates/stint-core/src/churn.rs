use std::collections::HashMap;

use crate::Result;

/// Source of historical commit counts per file.
///
/// Implemented by the git collaborator; the scorer treats any error as a
/// churn of zero.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use stint_core::ChurnSource;
///
/// let mut counts = HashMap::new();
/// counts.insert("src/lib.rs".to_string(), 12);
/// assert_eq!(counts.file_churn("src/lib.rs").unwrap(), 12);
/// assert_eq!(counts.file_churn("src/other.rs").unwrap(), 0);
/// ```
pub trait ChurnSource {
    /// Number of commits that touched `path`.
    fn file_churn(&self, path: &str) -> Result<u32>;
}

/// A churn source that reports zero for every file.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoChurn;

impl ChurnSource for NoChurn {
    fn file_churn(&self, _path: &str) -> Result<u32> {
        Ok(0)
    }
}

impl ChurnSource for HashMap<String, u32> {
    fn file_churn(&self, path: &str) -> Result<u32> {
        Ok(self.get(path).copied().unwrap_or(0))
    }
}

impl<T: ChurnSource + ?Sized> ChurnSource for &T {
    fn file_churn(&self, path: &str) -> Result<u32> {
        (**self).file_churn(path)
    }
}
