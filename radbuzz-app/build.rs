//! Build script for radbuzz-app
//!
//! Validates the compiled-in radbuzz.toml so a broken default never ships.

use std::fs;
use std::path::Path;

fn main() {
    validate_config();
}

/// Validate radbuzz.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=radbuzz.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let config_path = Path::new("radbuzz.toml");

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read radbuzz.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in radbuzz.toml                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    let mut errors = Vec::new();
    validate_sections(&config, &mut errors);
    validate_tiles(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in radbuzz.toml                    ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            format_error_lines(&errors.join("\n"))
        );
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.chars().count() > 64 {
                format!("{}...", line.chars().take(61).collect::<String>())
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Known sections must be tables
fn validate_sections(config: &toml::Value, errors: &mut Vec<String>) {
    for section in ["tiles", "speedometer", "buzzer", "simulator"] {
        match config.get(section) {
            None | Some(toml::Value::Table(_)) => {}
            Some(_) => errors.push(format!("[{}] must be a table", section)),
        }
    }
}

fn validate_tiles(config: &toml::Value, errors: &mut Vec<String>) {
    let Some(tiles) = config.get("tiles").and_then(|t| t.as_table()) else {
        return;
    };

    if let Some(zoom) = tiles.get("zoom").and_then(|z| z.as_integer()) {
        if !(0..=20).contains(&zoom) {
            errors.push("[tiles] zoom must be 0-20".to_string());
        }
    }

    if let Some(factor) = tiles.get("city_tile_factor").and_then(|f| f.as_integer()) {
        if !(1..=8).contains(&factor) {
            errors.push("[tiles] city_tile_factor must be 1-8".to_string());
        }
    }

    if let Some(template) = tiles.get("url_template").and_then(|t| t.as_str()) {
        if !template.contains("{x}") || !template.contains("{y}") {
            errors.push("[tiles] url_template needs {x} and {y}".to_string());
        }
    }
}
