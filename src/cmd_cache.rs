//! `cache`, `token` and `resume` subcommand handlers.

use std::path::Path;

use tracing::info;

use jobfill_protocols::ResumeStore;

use crate::app::{App, AppResult};
use crate::cli::{CacheAction, ResumeAction, TokenAction};

pub(crate) async fn handle_cache_command(app: &App, action: CacheAction) -> AppResult<()> {
    match action {
        CacheAction::Stats => {
            let stats = app.cache.stats().await?;
            println!("Durable entries:  {}", stats.durable_entries);
            println!("  still fresh:    {}", stats.durable_fresh);
            println!("Session entries:  {}", stats.session_entries);
        }
        CacheAction::Clear => {
            app.cache.clear().await?;
            app.context.invalidate().await?;
            info!("Cleared fingerprint cache and stored autofill context");
            println!("Cache cleared.");
        }
    }
    Ok(())
}

pub(crate) async fn handle_token_command(app: &App, action: TokenAction) -> AppResult<()> {
    match action {
        TokenAction::Set { token } => {
            let token = token.trim();
            if token.is_empty() {
                return Err("token must not be empty".into());
            }
            app.coordinator.set_token(token).await?;
            println!("Token stored ({} chars).", token.len());
        }
        TokenAction::Show => match app.coordinator.current_token().await {
            Some(token) => println!("Token stored: {}", mask(&token)),
            None => println!("No token stored."),
        },
        TokenAction::Clear => {
            app.coordinator.clear_token().await?;
            println!("Token cleared.");
        }
    }
    Ok(())
}

pub(crate) async fn handle_resume_command(app: &App, action: ResumeAction) -> AppResult<()> {
    match action {
        ResumeAction::Set { file } => {
            let bytes = tokio::fs::read(&file).await?;
            let name = file_name(&file);
            app.vault.save_resume(&name, &bytes).await?;
            println!("Stored {} ({} bytes).", name, bytes.len());
        }
        ResumeAction::Show => match app.vault.load_resume().await? {
            Some(resume) => println!(
                "{} ({} bytes base64)",
                resume.name,
                resume.buffer.len()
            ),
            None => println!("No résumé stored."),
        },
    }
    Ok(())
}

/// Never print a whole token.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{} ({} chars)", "*".repeat(8), tail, chars.len())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "resume.pdf".to_string())
}
