//! Connection descriptor: `username:password@host:port[/databaseName]`

use std::fmt;

use crate::executor::{ReadError, ReadResult};

use super::options::CLIENT_URI;

/// Parsed connection descriptor.
///
/// `Debug` and `Display` never show the password.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    username: String,
    password: String,
    host: String,
    port: u16,
    database: Option<String>,
}

impl ConnectionDescriptor {
    /// Parses a descriptor.
    ///
    /// Exactly one `@` must separate `username:password` from `host:port`,
    /// each side splitting on `:` into exactly two non-empty tokens. The port
    /// may be followed by `/databaseName`.
    pub fn parse(value: &str) -> ReadResult<Self> {
        let parts: Vec<&str> = value.split('@').collect();
        if parts.len() != 2 {
            return Err(Self::invalid());
        }

        let credentials: Vec<&str> = parts[0].split(':').collect();
        let address: Vec<&str> = parts[1].split(':').collect();
        if credentials.len() != 2 || address.len() != 2 {
            return Err(Self::invalid());
        }

        let (port_text, database) = match address[1].split_once('/') {
            Some((port, database)) => (port, Some(database)),
            None => (address[1], None),
        };

        let port = port_text.parse::<u16>().map_err(|_| Self::invalid())?;
        if credentials.iter().any(|t| t.is_empty())
            || address[0].is_empty()
            || database.map_or(false, |db| db.is_empty() || db.contains('/'))
        {
            return Err(Self::invalid());
        }

        Ok(Self {
            username: credentials[0].to_string(),
            password: credentials[1].to_string(),
            host: address[0].to_string(),
            port,
            database: database.map(str::to_string),
        })
    }

    fn invalid() -> ReadError {
        ReadError::invalid_argument(format!(
            "Invalid value for {}; must be username:password@host:port",
            CLIENT_URI
        ))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Database selected by the `/databaseName` suffix
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)?;
        if let Some(database) = &self.database {
            write!(f, "/{}", database)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("username", &self.username)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_suffix() {
        let descriptor = ConnectionDescriptor::parse("admin:admin@localhost:8000/Documents").unwrap();
        assert_eq!(descriptor.port(), 8000);
        assert_eq!(descriptor.database(), Some("Documents"));
        assert_eq!(descriptor.to_string(), "admin@localhost:8000/Documents");
    }

    #[test]
    fn test_password_hidden() {
        let descriptor = ConnectionDescriptor::parse("admin:secret@localhost:8000").unwrap();
        assert!(!format!("{:?}", descriptor).contains("secret"));
        assert!(!descriptor.to_string().contains("secret"));
    }

    #[test]
    fn test_empty_tokens_rejected() {
        assert!(ConnectionDescriptor::parse(":pass@host:8000").is_err());
        assert!(ConnectionDescriptor::parse("user:pass@:8000").is_err());
        assert!(ConnectionDescriptor::parse("user:pass@host:8000/").is_err());
    }

    #[test]
    fn test_port_must_fit_u16() {
        assert!(ConnectionDescriptor::parse("user:pass@host:70000").is_err());
        assert!(ConnectionDescriptor::parse("user:pass@host:port").is_err());
    }
}
