//! Function package production and upload

use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

use super::{Executor, HostJobMetadata, MapOptions};
use crate::error::{FanoutError, Result};
use crate::serialize::{create_module_data, exclude_modules, FunctionPackage, RemoteFunction};
use crate::storage::keys;

/// Per-input payloads plus the key the remote units load the function from
pub(crate) struct PackagedJob {
    pub func_key: String,
    pub data: Vec<Vec<u8>>,
}

impl Executor {
    /// Serialize `func` and `values`, uploading the package unless it is cached
    pub(crate) async fn package_job(
        &self,
        func: &RemoteFunction,
        values: &[Value],
        callset_id: &str,
        opts: &MapOptions,
        host_job_meta: &mut HostJobMetadata,
    ) -> Result<PackagedJob> {
        let prefix = self.store.prefix();

        if let Some(hint) = &opts.module_dependencies_key {
            let job = self.serializer.serialize(func, values, false)?;
            let func_key = keys::create_mod_key(prefix, hint);
            info!(
                "map {} using cached module dependencies {}",
                callset_id, func_key
            );
            return Ok(PackagedJob {
                func_key,
                data: job.data,
            });
        }

        let job = self.serializer.serialize(func, values, true)?;
        let func_key = keys::create_func_key(prefix, callset_id);
        let package = build_package(job.func, job.module_paths, &opts.exclude_modules).await?;
        self.upload_package(&func_key, &package, host_job_meta).await?;
        info!("map {} func upload complete {}", callset_id, func_key);

        Ok(PackagedJob {
            func_key,
            data: job.data,
        })
    }

    async fn upload_package(
        &self,
        key: &str,
        package: &FunctionPackage,
        host_job_meta: &mut HostJobMetadata,
    ) -> Result<()> {
        let bytes = package.to_bytes()?;
        host_job_meta.func_module_bytes = bytes.len();

        let start = Instant::now();
        self.store.put(key, bytes).await?;
        host_job_meta.record_func_upload(start.elapsed());
        Ok(())
    }

    /// Prepare a reusable package for `func` under `hint`
    ///
    /// Returns the key to pass as
    /// [`MapOptions::module_dependencies_key`](super::MapOptions). With
    /// `from_shared` the package is assumed to exist already. Without
    /// `sync_to_shared` the package is built (so unreadable modules surface
    /// here) but not uploaded.
    pub async fn parse_module_dependencies(
        &self,
        func: &RemoteFunction,
        hint: &str,
        from_shared: bool,
        sync_to_shared: bool,
    ) -> Result<String> {
        if from_shared && sync_to_shared {
            return Err(FanoutError::ConflictingPackageModes);
        }

        let key = keys::create_mod_key(self.store.prefix(), hint);
        if from_shared {
            return Ok(key);
        }

        let start = Instant::now();
        let job = self.serializer.serialize(func, &[], true)?;
        let package = build_package(job.func, job.module_paths, &[]).await?;
        debug!(
            "function {} serialize time: {:.3}s",
            hint,
            start.elapsed().as_secs_f64()
        );

        if sync_to_shared {
            let mut host_job_meta = HostJobMetadata::default();
            self.upload_package(&key, &package, &mut host_job_meta).await?;
            info!("module dependencies for {} synced to {}", hint, key);
        }
        Ok(key)
    }
}

async fn build_package(
    func: Vec<u8>,
    module_paths: Vec<PathBuf>,
    excludes: &[String],
) -> Result<FunctionPackage> {
    let paths = exclude_modules(module_paths, excludes);
    let module_data = create_module_data(&paths).await?;
    Ok(FunctionPackage { func, module_data })
}
