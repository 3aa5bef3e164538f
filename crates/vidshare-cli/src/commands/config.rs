//! Config command implementation.

use anyhow::Result;

use vidshare_core::config::Config;

use super::{ConfigAction, ConfigArgs};

/// Run the config command.
pub async fn run(args: ConfigArgs) -> Result<()> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => {
            let config = super::load_config();
            println!("# {}", Config::config_path().display());
            println!("{}", config.to_toml().map_err(super::explain)?);
        }
        ConfigAction::Path => println!("{}", Config::config_path().display()),
        ConfigAction::Reset => {
            Config::default().save().map_err(super::explain)?;
            println!("  Configuration reset to defaults");
            println!("  {}", Config::config_path().display());
        }
    }
    Ok(())
}
