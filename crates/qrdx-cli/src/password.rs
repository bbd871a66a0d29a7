use anyhow::{bail, Context, Result};
use secrecy::{ExposeSecret, SecretString};

/// Accepted password length, in characters.
pub const MIN_PASSWORD_CHARS: usize = 1;
pub const MAX_PASSWORD_CHARS: usize = 20;

pub fn validate(password: &SecretString) -> Result<()> {
    let len = password.expose_secret().chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        bail!(
            "password must be {MIN_PASSWORD_CHARS}-{MAX_PASSWORD_CHARS} characters (got {len})"
        );
    }
    Ok(())
}

/// Use the password given on the command line (or via `QRDX_PASSWORD`),
/// otherwise prompt on the terminal. `confirm` asks twice.
pub fn resolve(given: Option<String>, confirm: bool) -> Result<SecretString> {
    let password = match given {
        Some(p) => SecretString::from(p),
        None => prompt(confirm)?,
    };
    validate(&password)?;
    Ok(password)
}

fn prompt(confirm: bool) -> Result<SecretString> {
    let first = SecretString::from(
        rpassword::prompt_password("Password: ").context("reading password")?,
    );
    if confirm {
        let second = SecretString::from(
            rpassword::prompt_password("Confirm password: ").context("reading password")?,
        );
        if first.expose_secret() != second.expose_secret() {
            bail!("passwords do not match");
        }
    }
    Ok(first)
}
