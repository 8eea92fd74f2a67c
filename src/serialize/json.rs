//! JSON serializer

use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use super::{RemoteFunction, SerializeError, SerializedJob, Serializer};

/// Serializes callables and inputs as JSON
///
/// Modules whose file stem matches a capability pre-installed on the runtime
/// are left out of the package.
#[derive(Debug, Clone, Default)]
pub struct JsonSerializer {
    preinstalls: HashSet<String>,
}

impl JsonSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializer that skips the given pre-installed modules
    pub fn with_preinstalls<I, S>(preinstalls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            preinstalls: preinstalls.into_iter().map(Into::into).collect(),
        }
    }

    fn is_preinstalled(&self, path: &Path) -> bool {
        path.file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| self.preinstalls.contains(stem))
    }
}

impl Serializer for JsonSerializer {
    fn serialize(
        &self,
        func: &RemoteFunction,
        data: &[Value],
        capture_modules: bool,
    ) -> Result<SerializedJob, SerializeError> {
        let func_bytes = serde_json::to_vec(&func.callable)?;
        let data = data
            .iter()
            .map(serde_json::to_vec)
            .collect::<Result<Vec<_>, _>>()?;

        let module_paths = if capture_modules {
            func.modules
                .iter()
                .filter(|path| {
                    let skip = self.is_preinstalled(path);
                    if skip {
                        debug!("Skipping pre-installed module {}", path.display());
                    }
                    !skip
                })
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        Ok(SerializedJob {
            func: func_bytes,
            data,
            module_paths,
        })
    }
}
