//! Types for use when configuring trackfetch modules.

use crate::*;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> TfResult<D> {
    serde_json::from_str(
        &serde_json::to_string(s)
            .map_err(|e| TfError::other_src("encode", e))?,
    )
    .map_err(|e| TfError::other_src("decode", e))
}

/// Denotes a type used to configure a specific trackfetch module.
///
/// A module config serializes to a json object with a single top-level key
/// naming the module, e.g. `{"coreConsumer": {...}}`. Module configs
/// should set `#[serde(default)]` so that hand-edited files with missing
/// properties still load.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

/// Trackfetch configuration, a json map of module configs.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    /// Parse a config from json text, e.g. the contents of a config file.
    pub fn from_json(json: &str) -> TfResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| TfError::other_src("parse config", e))
    }

    /// Render this config as pretty json.
    pub fn to_json(&self) -> TfResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TfError::other_src("render config", e))
    }

    /// Merge a module config into this config, replacing any previous
    /// value under the same module key.
    pub fn set_module_config<M: ModConfig>(&mut self, m: &M) -> TfResult<()> {
        let map: serde_json::Map<String, serde_json::Value> = tc(m)?;
        for (k, v) in map {
            self.0.insert(k, v);
        }
        Ok(())
    }

    /// Like [Config::set_module_config] but refuses to overwrite a module
    /// key that is already present. Used when generating default configs.
    pub fn add_default_module_config<M: ModConfig>(
        &mut self,
        m: &M,
    ) -> TfResult<()> {
        let map: serde_json::Map<String, serde_json::Value> = tc(m)?;
        for k in map.keys() {
            if self.0.contains_key(k) {
                return Err(TfError::other(format!(
                    "Refusing to overwrite conflicting module name: {k}"
                )));
            }
        }
        self.0.extend(map);
        Ok(())
    }

    /// Extract a module config. Keys belonging to other modules are
    /// ignored, missing keys take their defaults.
    pub fn get_module_config<M: ModConfig>(&self) -> TfResult<M> {
        tc(&self.0)
    }
}
