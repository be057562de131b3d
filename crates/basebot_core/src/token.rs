use tracing::info;

use crate::config::{ConfigStore, GENERAL, TOKEN};
use crate::error::{CoreError, Result};

/// Make sure `GENERAL.TOKEN` is set and return it
///
/// A configured token wins. Otherwise `provided` is used, and only when that
/// is missing too does `prompt` get asked. A new token is saved right away.
pub fn ensure_token<P>(store: &mut ConfigStore, provided: Option<String>, prompt: P) -> Result<String>
where
    P: FnOnce() -> Result<String>,
{
    let configured = store
        .value(GENERAL, TOKEN)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    if let Some(token) = configured {
        return Ok(token);
    }

    let token = match provided.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(token) => token,
        None => prompt()?.trim().to_string(),
    };
    if token.is_empty() {
        return Err(CoreError::MissingToken);
    }

    store.ensure_category(GENERAL)?.set(TOKEN, token.as_str())?;
    store.save()?;
    info!("Saved bot token to {} config", GENERAL);
    Ok(token)
}
