//! World template loading.

use std::path::{Path, PathBuf};

use faramita_domain::WorldTemplate;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Failed to read world template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid world template {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read and parse a template file.
pub async fn load_template(path: &Path) -> Result<WorldTemplate, TemplateError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| TemplateError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let template: WorldTemplate =
        serde_json::from_str(&raw).map_err(|source| TemplateError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::info!(
        path = %path.display(),
        world = %template.world_meta.name,
        settings = template.entries.setting_cards.len(),
        chapters = template.entries.chapter_cards.len(),
        characters = template.entries.character_cards.len(),
        "Loaded world template"
    );
    Ok(template)
}

/// Load the configured template, or the built-in world when none is set.
pub async fn load_or_default(path: Option<&Path>) -> Result<WorldTemplate, TemplateError> {
    match path {
        Some(path) => load_template(path).await,
        None => {
            tracing::info!("No WORLD_TEMPLATE configured, using built-in world");
            Ok(WorldTemplate::oort())
        }
    }
}
