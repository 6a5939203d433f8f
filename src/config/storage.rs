use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the session entries live. Differentiated via a "type" tag in the YAML.
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// Entries only live as long as the process.
    #[serde(rename = "memory")]
    #[default]
    Memory,
    /// Entries are written through to a JSON file.
    #[serde(rename = "file")]
    File(FileStorageConfig),
}

#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct FileStorageConfig {
    pub path: String,
}
