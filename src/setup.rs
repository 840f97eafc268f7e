//! Interactive first-run setup wizard (`image-chat setup`)

use std::path::PathBuf;

use dialoguer::{Confirm, Input};

use crate::config::file::{ConfigFile, GeminiFileConfig, ServerFileConfig};
use crate::config::{DEFAULT_API_URL, DEFAULT_PORT};

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Image Chat Setup\n");

    // Load existing config if present
    let existing = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("~/.config/image-chat/config.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. API key
    let existing_key = existing.gemini.api_key.as_deref();
    let prompt = existing_key.map_or_else(
        || "API key (GEMINI_API_KEY)".to_string(),
        |k| format!("API key (current: {}, leave blank to keep)", mask_key(k)),
    );

    let api_key_input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    let api_key = if api_key_input.is_empty() {
        existing_key.map(str::to_string)
    } else {
        Some(api_key_input)
    };

    // 2. Endpoint
    let api_url: String = Input::new()
        .with_prompt("generateContent endpoint URL")
        .default(
            existing
                .gemini
                .api_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )
        .interact_text()?;

    // 3. Gateway
    let port: u16 = Input::new()
        .with_prompt("Gateway port")
        .default(existing.server.port.unwrap_or(DEFAULT_PORT))
        .interact_text()?;

    let serve_ui = Confirm::new()
        .with_prompt("Serve a web UI from a static directory?")
        .default(existing.server.static_dir.is_some())
        .interact()?;

    let static_dir = if serve_ui {
        let dir: String = Input::new()
            .with_prompt("Static directory")
            .default(
                existing
                    .server
                    .static_dir
                    .clone()
                    .unwrap_or_else(|| "client/dist".to_string()),
            )
            .interact_text()?;
        Some(dir)
    } else {
        None
    };

    // 4. Build and write config
    let config_file = ConfigFile {
        gemini: GeminiFileConfig {
            api_key,
            api_url: (api_url != DEFAULT_API_URL).then_some(api_url),
        },
        server: ServerFileConfig {
            port: Some(port),
            static_dir,
        },
    };

    crate::config::file::write_config_file(&config_path, &config_file)?;
    println!("\nConfig written to {}", config_path.display());

    println!("\nSetup complete! Run `image-chat serve` to start the gateway.");

    Ok(())
}

/// Show only the first and last four characters of a key
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
