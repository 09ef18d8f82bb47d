use crate::credentials::DEFAULT_BCRYPT_COST;
use crate::store::{CorruptPolicy, DEFAULT_DATA_FILE};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "uniapp.json";

/// Per-workspace settings read from `uniapp.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    pub data_file: String,
    pub on_corrupt: CorruptPolicy,
    pub bcrypt_cost: u32,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            data_file: DEFAULT_DATA_FILE.to_string(),
            on_corrupt: CorruptPolicy::default(),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

impl WorkspaceConfig {
    pub fn load(workspace: &Path) -> anyhow::Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("{} is not valid config", path.to_string_lossy()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let name = Path::new(&self.data_file);
        // The data file must live directly inside the workspace.
        if self.data_file.trim().is_empty() || name.components().count() != 1 || name.is_absolute() {
            return Err(anyhow!("dataFile must be a plain file name: {:?}", self.data_file));
        }
        Ok(())
    }

    pub fn data_path(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.data_file)
    }
}

pub fn parse_corrupt_policy(raw: &str) -> Option<CorruptPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "reset" => Some(CorruptPolicy::Reset),
        "fail" => Some(CorruptPolicy::Fail),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = temp_dir("uniapp-cfg-default");
        let cfg = WorkspaceConfig::load(&dir).expect("load");
        assert_eq!(cfg, WorkspaceConfig::default());
        assert_eq!(cfg.data_path(&dir), dir.join("students.data"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn partial_file_overrides_some_fields() {
        let dir = temp_dir("uniapp-cfg-partial");
        std::fs::write(dir.join(CONFIG_FILE), r#"{ "onCorrupt": "fail", "bcryptCost": 4 }"#)
            .expect("write cfg");
        let cfg = WorkspaceConfig::load(&dir).expect("load");
        assert_eq!(cfg.on_corrupt, CorruptPolicy::Fail);
        assert_eq!(cfg.bcrypt_cost, 4);
        assert_eq!(cfg.data_file, "students.data");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn bad_values_are_rejected() {
        let dir = temp_dir("uniapp-cfg-bad");
        std::fs::write(dir.join(CONFIG_FILE), r#"{ "dataFile": "../escape.data" }"#)
            .expect("write cfg");
        assert!(WorkspaceConfig::load(&dir).is_err());
        std::fs::write(dir.join(CONFIG_FILE), r#"{ "onCorrupt": "explode" }"#).expect("write cfg");
        assert!(WorkspaceConfig::load(&dir).is_err());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_policy_parsing() {
        assert_eq!(parse_corrupt_policy("FAIL"), Some(CorruptPolicy::Fail));
        assert_eq!(parse_corrupt_policy(" reset "), Some(CorruptPolicy::Reset));
        assert_eq!(parse_corrupt_policy("maybe"), None);
    }
}
