//! Types for use when configuring flightdeck modules.

use crate::*;

/// helper transcode function
fn tc<S: serde::Serialize, D: serde::de::DeserializeOwned>(
    s: &S,
) -> FdResult<D> {
    serde_json::from_str(
        &serde_json::to_string(s)
            .map_err(|e| FdError::other_src("encode", e))?,
    )
    .map_err(|e| FdError::other_src("decode", e))
}

/// Denotes a type used to configure a specific flightdeck module.
///
/// The types implementing this trait hold configuration that cannot be
/// changed at runtime, the likes of which might be found in a configuration
/// file. Per-request behaviour is controlled by [crate::RequestOptions].
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

/// Flightdeck configuration, a map of module name to module config.
#[derive(Debug, Default, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    /// Load a config from a json string, such as the contents of a
    /// configuration file. Unknown modules are kept as-is and ignored.
    pub fn from_json(json: &str) -> FdResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| FdError::other_src("invalid config json", e))
    }

    /// Modules call this when the builder is generating a default
    /// configuration, to add their default parameters under their name.
    pub fn add_default_module_config<M: ModConfig>(
        &mut self,
        module_name: String,
    ) -> FdResult<()> {
        if self.0.contains_key(&module_name) {
            return Err(FdError::other(format!(
                "Refusing to overwrite conflicting module name: {module_name}"
            )));
        }
        let section = tc(&M::default())
            .map_err(|e| FdError::config(&module_name, e))?;
        self.0.insert(module_name, section);
        Ok(())
    }

    /// Extract a module config. This config may have been loaded from disk
    /// and edited by humans, so module configs should be tolerant to missing
    /// properties (`#[serde(default)]`). Unset modules get the default.
    pub fn get_module_config<M: ModConfig>(
        &self,
        module_name: &str,
    ) -> FdResult<M> {
        self.0
            .get(module_name)
            .map(|v| tc(v).map_err(|e| FdError::config(module_name, e)))
            .unwrap_or_else(|| Ok(M::default()))
    }

    /// Replace a module config, for example after the defaults have been
    /// generated and a caller wants to adjust some parameters.
    pub fn set_module_config<M: ModConfig>(
        &mut self,
        module_name: String,
        config: &M,
    ) -> FdResult<()> {
        let section =
            tc(config).map_err(|e| FdError::config(&module_name, e))?;
        self.0.insert(module_name, section);
        Ok(())
    }
}
