//! Key scheme for callsets and calls
//!
//! Every key is a pure function of the storage prefix, the callset id and (for
//! per-call keys) the call id. Callset ids are UUIDs, so two callsets never
//! share a key.

use uuid::Uuid;

const FUNC_OBJECT: &str = "func.json";
const AGG_DATA_OBJECT: &str = "aggdata.bin";
const DATA_OBJECT: &str = "data.bin";
const OUTPUT_OBJECT: &str = "output.json";
const STATUS_OBJECT: &str = "status.json";
const CANCEL_OBJECT: &str = "cancel";
const MODULE_DEPENDENCIES_DIR: &str = "module_dependencies";

/// Width of the zero-padded call id
pub const CALL_ID_WIDTH: usize = 5;

/// Most calls a callset can hold while call ids stay fixed width
pub const MAX_CALLS_PER_CALLSET: usize = 100_000;

/// The four keys owned by one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallKeys {
    pub data_key: String,
    pub output_key: String,
    pub status_key: String,
    pub cancel_key: String,
}

/// Generate a fresh callset id
pub fn create_callset_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Call id for the `index`-th input of a callset
pub fn create_call_id(index: usize) -> String {
    format!("{:0width$}", index, width = CALL_ID_WIDTH)
}

fn join(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Key of the function package uploaded for a callset
pub fn create_func_key(prefix: &str, callset_id: &str) -> String {
    join(&[prefix, callset_id, FUNC_OBJECT])
}

/// Key of the aggregated data blob of a callset
pub fn create_agg_data_key(prefix: &str, callset_id: &str) -> String {
    join(&[prefix, callset_id, AGG_DATA_OBJECT])
}

/// Key of a function package cached under a caller supplied hint
pub fn create_mod_key(prefix: &str, hint: &str) -> String {
    join(&[prefix, MODULE_DEPENDENCIES_DIR, hint])
}

/// Keys owned by a single call
pub fn create_keys(prefix: &str, callset_id: &str, call_id: &str) -> CallKeys {
    CallKeys {
        data_key: join(&[prefix, callset_id, call_id, DATA_OBJECT]),
        output_key: join(&[prefix, callset_id, call_id, OUTPUT_OBJECT]),
        status_key: join(&[prefix, callset_id, call_id, STATUS_OBJECT]),
        cancel_key: join(&[prefix, callset_id, call_id, CANCEL_OBJECT]),
    }
}
