//! Account commands and the saved CLI session
//!
//! The session token is kept in a small file so that later invocations are
//! signed in without asking for the password again.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use nudge_core::auth::LocalAuth;
use nudge_core::db::Database;

/// Default location of the saved session token
pub fn session_path() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|d| d.join("nudge").join("session"))
        .context("Could not determine the data directory for the session file")
}

fn save_token(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    // `mode` only applies to new files; tighten an existing one before writing
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(token.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn read_token(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn clear_token(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Use the --password value, or ask for one on stdin
pub fn password_or_prompt(password: Option<String>) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Restore the saved session, failing if nobody is signed in
pub fn require_auth(db: &Database, session_file: &Path) -> Result<LocalAuth> {
    let auth = LocalAuth::new(db.clone());
    let Some(token) = read_token(session_file) else {
        bail!("Not signed in. Run 'nudge login --email <address>' first.");
    };
    if auth.restore(&token)?.is_none() {
        clear_token(session_file)?;
        bail!("Your session has expired. Run 'nudge login --email <address>' again.");
    }
    Ok(auth)
}

pub fn cmd_signup(db: &Database, session_file: &Path, email: &str, password: &str) -> Result<()> {
    let auth = LocalAuth::new(db.clone());
    let session = auth.sign_up(email, password)?;
    save_token(session_file, &session.token)?;

    println!("✅ Welcome, {}! Your account is ready.", session.display_name());
    println!("   Next: nudge decide");
    Ok(())
}

pub fn cmd_login(db: &Database, session_file: &Path, email: &str, password: &str) -> Result<()> {
    let auth = LocalAuth::new(db.clone());
    let session = auth.sign_in(email, password)?;
    save_token(session_file, &session.token)?;

    println!("✅ Signed in as {}", session.email);
    Ok(())
}

pub fn cmd_logout(db: &Database, session_file: &Path) -> Result<()> {
    let auth = LocalAuth::new(db.clone());
    match read_token(session_file) {
        Some(token) => {
            auth.revoke(&token)?;
            clear_token(session_file)?;
            println!("👋 Signed out");
        }
        None => println!("Not signed in."),
    }
    Ok(())
}

pub fn cmd_whoami(db: &Database, session_file: &Path) -> Result<()> {
    let auth = LocalAuth::new(db.clone());
    let session = match read_token(session_file) {
        Some(token) => auth.restore(&token)?,
        None => None,
    };
    match session {
        Some(s) => println!("{} (user #{})", s.email, s.user_id),
        None => println!("Not signed in."),
    }
    Ok(())
}
