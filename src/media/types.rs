use std::fmt::{Display, Formatter};

use crate::{
    error::ConfigError,
    param::{ParamError, ParamStore},
};

pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Validated configuration of one output stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDescriptor {
    key: String,
    channel: String,
    hz: u32,
    width: u32,
    height: u32,
    jpeg_quality: u8,
}

impl StreamDescriptor {
    pub fn new(
        key: &str,
        channel: &str,
        hz: u32,
        width: u32,
        height: u32,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            key: key.to_string(),
            channel: channel.to_string(),
            hz,
            width,
            height,
            jpeg_quality,
        }
    }

    /// Read the stream stored under `path` (`cameras.<cam>.streams.<key>`).
    /// Either every required field resolves or no descriptor is produced.
    pub fn from_param(param: &dyn ParamStore, path: &str, key: &str) -> Result<Self, ConfigError> {
        log::debug!("Creating new stream with key \"{}\"", key);

        let hz = positive(param, path, key, "hz")?;
        let width = positive(param, path, key, "width")?;
        let height = positive(param, path, key, "height")?;

        let quality_path = format!("{}.jpeg_quality", path);
        let jpeg_quality = match param.get_int(&quality_path) {
            Ok(q) if (0..=100).contains(&q) => q as u8,
            Ok(q) => {
                return Err(ConfigError::InvalidField {
                    path: quality_path,
                    value: q,
                    expected: "0..=100",
                });
            }
            Err(ParamError::NotFound(_)) => {
                log::info!(
                    "Configuration {} not found. Using jpeg_quality of {}",
                    quality_path,
                    DEFAULT_JPEG_QUALITY
                );
                DEFAULT_JPEG_QUALITY
            }
            Err(e) => return Err(e.into()),
        };

        // strings last
        let channel_path = format!("{}.channel", path);
        let channel = match param.get_str(&channel_path) {
            Ok(c) if !c.is_empty() => c,
            Ok(_) | Err(ParamError::NotFound(_)) => {
                return Err(ConfigError::MissingField {
                    path: channel_path,
                    stream: key.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self::new(key, &channel, hz, width, height, jpeg_quality))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn hz(&self) -> u32 {
        self.hz
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}

fn positive(
    param: &dyn ParamStore,
    path: &str,
    key: &str,
    field: &str,
) -> Result<u32, ConfigError> {
    let field_path = format!("{}.{}", path, field);
    match param.get_int(&field_path) {
        Ok(v) if v > 0 && v <= u32::MAX as i64 => Ok(v as u32),
        Ok(v) => Err(ConfigError::InvalidField {
            path: field_path,
            value: v,
            expected: "a positive integer",
        }),
        Err(ParamError::NotFound(_)) => Err(ConfigError::MissingField {
            path: field_path,
            stream: key.to_string(),
        }),
        Err(e) => Err(e.into()),
    }
}

impl Display for StreamDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "\"{}\" stream publishing ({},{})@{}Hz with {} quality on \"{}\"",
            self.key, self.width, self.height, self.hz, self.jpeg_quality, self.channel
        )
    }
}
