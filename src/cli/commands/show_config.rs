use anyhow::Result;
use std::path::PathBuf;

use super::load_config;

pub struct ConfigShowCommand {
    pub config_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl ConfigShowCommand {
    pub async fn execute(&self) -> Result<()> {
        let config = load_config(self.config_path.as_deref())?;
        match &self.output {
            Some(path) => {
                config.save_to_file(path)?;
                println!("✅ Wrote configuration to {}", path.display());
            }
            None => print!("{}", config.to_toml()?),
        }
        Ok(())
    }
}
