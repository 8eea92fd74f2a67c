//! Module dependency handling and the function package format

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;

use super::SerializeError;

/// Serialized callable plus the module files it depends on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPackage {
    pub func: Vec<u8>,
    pub module_data: BTreeMap<String, Vec<u8>>,
}

impl FunctionPackage {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SerializeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializeError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Drop every module path containing one of `excludes`
pub fn exclude_modules(paths: Vec<PathBuf>, excludes: &[String]) -> Vec<PathBuf> {
    if excludes.is_empty() {
        return paths;
    }
    paths
        .into_iter()
        .filter(|path| {
            let path = path.to_string_lossy();
            !excludes.iter().any(|module| path.contains(module.as_str()))
        })
        .collect()
}

/// Read every module file into a path-keyed map
pub async fn create_module_data(
    paths: &[PathBuf],
) -> Result<BTreeMap<String, Vec<u8>>, SerializeError> {
    let mut module_data = BTreeMap::new();
    for path in paths {
        let bytes = fs::read(path)
            .await
            .map_err(|source| SerializeError::ModuleRead {
                path: path.clone(),
                source,
            })?;
        module_data.insert(path.to_string_lossy().into_owned(), bytes);
    }
    Ok(module_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exclude_modules_matches_substrings() {
        let paths = vec![
            PathBuf::from("/deps/numeric/core.bin"),
            PathBuf::from("/deps/plotting/render.bin"),
            PathBuf::from("/deps/numeric/linalg.bin"),
        ];

        let kept = exclude_modules(paths.clone(), &["numeric".to_string()]);
        assert_eq!(kept, vec![PathBuf::from("/deps/plotting/render.bin")]);

        assert_eq!(exclude_modules(paths.clone(), &[]), paths);
    }

    #[tokio::test]
    async fn test_create_module_data_reads_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("helpers.bin");
        std::fs::write(&path, b"module bytes").unwrap();

        let data = create_module_data(std::slice::from_ref(&path)).await.unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[&path.to_string_lossy().into_owned()], b"module bytes");
    }

    #[tokio::test]
    async fn test_create_module_data_missing_file() {
        let err = create_module_data(&[PathBuf::from("/definitely/not/here.bin")])
            .await
            .unwrap_err();
        assert!(matches!(err, SerializeError::ModuleRead { .. }));
    }

    #[test]
    fn test_package_bytes_roundtrip() {
        let mut package = FunctionPackage {
            func: b"{\"kind\":\"registered\",\"name\":\"sum\"}".to_vec(),
            ..Default::default()
        };
        package.module_data.insert("m".to_string(), vec![1, 2]);

        let bytes = package.to_bytes().unwrap();
        assert_eq!(FunctionPackage::from_bytes(&bytes).unwrap(), package);
    }
}
