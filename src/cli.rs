use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;

/// Publish camera images to transport channels.
#[derive(Debug, Parser)]
#[command(name = "cam-publish", version)]
pub struct Cli {
    /// Connect to the named camera. See the camera's streams for resizing,
    /// rate and channel.
    #[arg(short = 'c', long = "camera", value_name = "CAM_NAME", conflicts_with = "sim_cam")]
    pub camera: Option<String>,
    /// Start a simulation of the named camera (not supported yet).
    #[arg(short = 's', long = "sim-cam", value_name = "CAM_NAME")]
    pub sim_cam: Option<String>,
    /// Omit the streams with these keys. Unknown keys produce a warning.
    #[arg(short = 'o', long = "omit", value_name = "CSV", value_delimiter = ',')]
    pub omit: Vec<String>,
    /// Run verbosely.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
    /// Configuration directory (defaults to $CAM_CONFIG_PATH).
    #[arg(long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
    /// Configuration store file (defaults to <config dir>/camera.json).
    #[arg(long = "param", value_name = "FILE")]
    pub param: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Mode {
    Camera(String),
    Simulated(String),
}

impl Cli {
    pub fn mode(&self) -> Result<Mode, ConfigError> {
        match (&self.camera, &self.sim_cam) {
            (Some(name), _) => Ok(Mode::Camera(name.clone())),
            (None, Some(name)) => Ok(Mode::Simulated(name.clone())),
            (None, None) => Err(ConfigError::NoCamera),
        }
    }

    pub fn omitted(&self) -> impl Iterator<Item = &str> {
        self.omit
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camera_and_omit_list() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["cam-publish", "-c", "west", "-o", "narrow,wide", "-v"])?;
        assert_eq!(cli.mode()?, Mode::Camera("west".to_string()));
        assert_eq!(cli.omitted().collect::<Vec<_>>(), vec!["narrow", "wide"]);
        assert!(cli.verbose);
        Ok(())
    }

    #[test]
    fn test_repeated_omit_accumulates() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["cam-publish", "--camera=west", "-o", "a", "--omit", "b,"])?;
        assert_eq!(cli.omitted().collect::<Vec<_>>(), vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn test_sim_mode_and_missing_camera() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["cam-publish", "-s", "west"])?;
        assert_eq!(cli.mode()?, Mode::Simulated("west".to_string()));

        let cli = Cli::try_parse_from(["cam-publish", "-v"])?;
        assert!(matches!(cli.mode(), Err(ConfigError::NoCamera)));
        Ok(())
    }

    #[test]
    fn test_camera_conflicts_with_sim() {
        assert!(Cli::try_parse_from(["cam-publish", "-c", "a", "-s", "b"]).is_err());
    }
}
