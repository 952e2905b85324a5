//! `conductor config` — Configuration management commands.

use conductor_config::AppConfig;

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            let mut warnings = Vec::new();

            if !config.debug.enabled && !config.debug.breakpoints.is_empty() {
                warnings.push("Breakpoints are listed but debug.enabled is false");
            }

            if config.tool_timeout_secs.is_none() {
                warnings.push("No tool timeout set; a hung tool stalls its whole turn");
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Model:        {}", config.model);
            println!("   Iterations:   {}", config.max_iterations);
            println!(
                "   Debugging:    {} ({} named breakpoints)",
                if config.debug.enabled { "on" } else { "off" },
                config.debug.breakpoints.len()
            );
            println!(
                "   Behavior log: {}",
                if config.behavior_log.enabled {
                    config.behavior_log.resolved_path().display().to_string()
                } else {
                    "off".to_string()
                }
            );
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    std::fs::create_dir_all(AppConfig::config_dir())?;
    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Wrote default config to {}", config_path.display());
    Ok(())
}
