use std::{collections::HashMap, fmt, str::FromStr};

use anyhow::Context;
use axum::http::{HeaderMap, Method, header::AUTHORIZATION};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use subtle::ConstantTimeEq;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            other => anyhow::bail!("unknown role {other:?}"),
        }
    }
}

/// A configured login. The password never appears in `Debug` output.
#[derive(Clone)]
pub struct Account {
    pub username: String,
    password: String,
    pub role: Role,
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self { username: username.into(), password: password.into(), role }
    }

    /// Parses `name:password:ROLE` entries separated by commas.
    pub fn parse_list(raw: &str) -> anyhow::Result<Vec<Account>> {
        let mut accounts = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((username, (password, role))) =
                entry.split_once(':').and_then(|(user, rest)| Some((user, rest.rsplit_once(':')?)))
            else {
                anyhow::bail!("expected name:password:ROLE, got {entry:?}");
            };
            if username.is_empty() {
                anyhow::bail!("empty username in {entry:?}");
            }
            let role = role.parse().with_context(|| format!("account {username}"))?;
            accounts.push(Account::new(username, password, role));
        }

        if accounts.is_empty() {
            anyhow::bail!("no accounts configured");
        }
        Ok(accounts)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub role: Role,
}

#[derive(Clone, Debug)]
pub struct Accounts {
    by_name: HashMap<String, Account>,
}

impl Accounts {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self { by_name: accounts.into_iter().map(|a| (a.username.clone(), a)).collect() }
    }

    pub fn verify(&self, username: &str, password: &str) -> Option<Principal> {
        let account = self.by_name.get(username)?;
        let matches: bool = account.password.as_bytes().ct_eq(password.as_bytes()).into();
        matches.then(|| Principal { username: account.username.clone(), role: account.role })
    }
}

/// Decodes `Authorization: Basic base64(user:password)`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = String::from_utf8(BASE64.decode(encoded.trim()).ok()?).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// What a caller needs before a request is let through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    AnyOf(&'static [Role]),
}

impl Access {
    pub fn permits(self, role: Role) -> bool {
        match self {
            Access::Public => true,
            Access::AnyOf(roles) => roles.contains(&role),
        }
    }
}

const READERS: &[Role] = &[Role::User, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

/// Access rules, first match wins:
/// welcome and logout are open, reads under `/releases` need any role, everything else needs
/// `ADMIN`.
pub fn required_access(method: &Method, path: &str) -> Access {
    match path {
        "/releases/welcome" | "/logout" => Access::Public,
        _ if *method == Method::GET && is_under(path, "/releases") => Access::AnyOf(READERS),
        _ => Access::AnyOf(ADMINS),
    }
}

pub fn is_under(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}
