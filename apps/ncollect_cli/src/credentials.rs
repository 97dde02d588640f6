use anyhow::{bail, Context, Result};
use ncollect_model::Credentials;
use std::io;

const USER_VARS: [&str; 4] = ["LOGNAME", "USER", "LNAME", "USERNAME"];

/// Login name of the invoking user, taken from the usual environment variables.
pub fn current_user() -> Option<String> {
    user_from(|var| std::env::var(var).ok())
}

fn user_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    USER_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// Reads the password from the terminal without echo.
pub fn tty_prompt(prompt: &str) -> io::Result<String> {
    rpassword::prompt_password(prompt)
}

/// Settles the username, then asks for the password exactly once.
pub fn resolve<P>(username: Option<String>, prompt: P) -> Result<Credentials>
where
    P: FnOnce(&str) -> io::Result<String>,
{
    let username = match username.or_else(current_user) {
        Some(name) => name,
        None => bail!("cannot determine the current user; pass -u/--username"),
    };
    let password = prompt(&format!("Password for {username}: "))
        .with_context(|| format!("reading password for {username}"))?;
    Ok(Credentials::new(username, password))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn user_lookup_follows_variable_precedence() {
        let found = user_from(|var| match var {
            "LOGNAME" => Some("  ".into()),
            "USER" => Some("netops".into()),
            "USERNAME" => Some("other".into()),
            _ => None,
        });
        assert_eq!(found.as_deref(), Some("netops"));
        assert_eq!(user_from(|_| None), None);
    }

    #[test]
    fn explicit_username_wins_and_prompt_runs_once() {
        let calls = Cell::new(0);
        let creds = resolve(Some("admin".into()), |prompt| {
            calls.set(calls.get() + 1);
            assert_eq!(prompt, "Password for admin: ");
            Ok("secret".into())
        })
        .unwrap();
        assert_eq!(creds.username, "admin");
        assert_eq!(creds.password, "secret");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn prompt_failure_is_reported() {
        let err = resolve(Some("admin".into()), |_| {
            Err(io::Error::new(io::ErrorKind::NotFound, "no tty"))
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("no tty"));
    }
}
