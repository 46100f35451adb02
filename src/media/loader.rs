use std::path::{Path, PathBuf};

use crate::{
    error::ConfigError,
    media::types::StreamDescriptor,
    param::{ParamError, ParamStore},
};

/// Stream keys the operator asked to leave out of the run.
#[derive(Clone, Debug, Default)]
pub struct OmitSet {
    keys: Vec<String>,
}

impl OmitSet {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for key in keys {
            let key = key.into();
            if !set.keys.contains(&key) {
                set.keys.push(key);
            }
        }
        set
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

/// Outcome of loading a camera's streams.
#[derive(Debug)]
pub struct StreamSet {
    /// In configuration order.
    pub descriptors: Vec<StreamDescriptor>,
    /// Omitted keys that name no stream of the camera.
    pub unrecognized_omits: Vec<String>,
    /// Streams dropped because a field did not resolve.
    pub rejected: Vec<(String, ConfigError)>,
}

pub fn streams_path(camera: &str) -> String {
    format!("cameras.{}.streams", camera)
}

/// Load the descriptors of `camera`, skipping omitted keys and entries
/// without sub-entries. A stream with a bad field is dropped on its own;
/// the load only fails when the streams path is missing or nothing is left.
pub fn load_streams(
    param: &dyn ParamStore,
    camera: &str,
    omit: &OmitSet,
) -> Result<StreamSet, ConfigError> {
    let path = streams_path(camera);
    let keys = param
        .subkeys(&path)
        .ok_or_else(|| ConfigError::MissingStreams(path.clone()))?;

    let mut unrecognized_omits = Vec::new();
    for key in omit.iter() {
        if keys.iter().any(|k| k == key) {
            log::info!("Omitting stream {}", key);
        } else {
            log::warn!("Unrecognized key: {}", key);
            unrecognized_omits.push(key.to_string());
        }
    }

    let mut descriptors = Vec::new();
    let mut rejected = Vec::new();
    for key in keys.iter().filter(|k| !omit.contains(k)) {
        let stream_path = format!("{}.{}", path, key);
        if param.num_subkeys(&stream_path) == 0 {
            continue;
        }
        match StreamDescriptor::from_param(param, &stream_path, key) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) => {
                log::warn!("{}", e);
                rejected.push((key.clone(), e));
            }
        }
    }

    if descriptors.is_empty() {
        return Err(ConfigError::NoStreams(camera.to_string()));
    }

    Ok(StreamSet {
        descriptors,
        unrecognized_omits,
        rejected,
    })
}

/// Location of the chain description for `camera`, resolved against the
/// configuration directory.
pub fn chain_file(
    param: &dyn ParamStore,
    camera: &str,
    simulated: bool,
    config_dir: &Path,
) -> Result<PathBuf, ConfigError> {
    let entry = if simulated { "cam_units_sim" } else { "cam_units" };
    let key = format!("{}.{}", streams_path(camera), entry);
    let file = param.get_str(&key).map_err(|e| match e {
        ParamError::NotFound(path) => ConfigError::MissingField {
            path,
            stream: camera.to_string(),
        },
        other => other.into(),
    })?;
    Ok(config_dir.join(file))
}

/// Read the chain description once. An unreadable file is a configuration
/// error, not something to wait out.
pub fn read_chain_description(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ChainFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
