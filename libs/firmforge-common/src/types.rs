use serde::{Deserialize, Serialize};

/// Body of a `POST /compile` request.
///
/// Both fields are optional on purpose: a missing field must produce the
/// service's own "Missing code parameter" / "Missing fqbn parameter"
/// rejection, not a framework-level deserialization error.
#[derive(Debug, Clone, Deserialize)]
pub struct CompileRequest {
    pub code: Option<String>,
    pub fqbn: Option<String>,
}

/// Memory usage reported by the toolchain for a successful build.
///
/// Either field is `None` when the toolchain output did not contain the
/// corresponding usage line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeMetrics {
    pub flash: Option<u64>,
    pub ram: Option<u64>,
}
