//! Settings records produced by a configuration read.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Stand-in for a non-empty password in output.
const REDACTED: &str = "********";

/// Site-wide switches from the `[System]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemSettings {
    /// `SystemInstalled`; a host without configuration stays not-installed.
    pub installed: bool,
    /// `MaintenanceMode`
    pub maintenance_mode: bool,
    /// `DevelopmentMode`
    pub development_mode: bool,
    /// `UnderAttackMode`
    pub under_attack_mode: bool,
}

/// MySQL connection settings from the `[MySQL]` section.
///
/// The password is masked in `Debug` and serialized output.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSettings {
    pub server: String,
    pub ssl_mode: String,
    pub database: String,
    pub username: String,
    #[serde(serialize_with = "serialize_redacted")]
    pub password: String,
    pub protocol: String,
    pub port: u16,
    /// Prefix prepended to every table name.
    pub table_prefix: Option<String>,
    /// Extra connection options from `[MySQL.Other]`, values coerced to text.
    pub other: BTreeMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            ssl_mode: "preferred".to_string(),
            database: "netcorebb".to_string(),
            username: "root".to_string(),
            password: String::new(),
            protocol: "socket".to_string(),
            port: 3306,
            table_prefix: None,
            other: BTreeMap::new(),
        }
    }
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("server", &self.server)
            .field("ssl_mode", &self.ssl_mode)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("protocol", &self.protocol)
            .field("port", &self.port)
            .field("table_prefix", &self.table_prefix)
            .field("other", &self.other)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "" } else { REDACTED }
}

fn serialize_redacted<S: Serializer>(secret: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(redact(secret))
}

impl DatabaseSettings {
    /// Render a MySQL connection string for the table access layer.
    ///
    /// Named settings come first, followed by `other` entries in key order.
    pub fn connection_string(&self) -> String {
        let mut parts = vec![
            format!("Server={}", self.server),
            format!("Port={}", self.port),
            format!("Database={}", self.database),
            format!("Uid={}", self.username),
            format!("Pwd={}", self.password),
            format!("SslMode={}", self.ssl_mode),
            format!("Protocol={}", self.protocol),
        ];
        parts.extend(self.other.iter().map(|(k, v)| format!("{}={}", k, v)));

        let mut out = parts.join(";");
        out.push(';');
        out
    }

    /// Apply the configured table prefix to a bare table name.
    pub fn table_name(&self, table: &str) -> String {
        match self.table_prefix {
            Some(ref prefix) => format!("{}{}", prefix, table),
            None => table.to_string(),
        }
    }
}

/// The pair of records produced by one read; the unit of storage and publication.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigSnapshot {
    pub system: SystemSettings,
    pub database: DatabaseSettings,
}

impl ConfigSnapshot {
    /// Split into the two records.
    pub fn into_parts(self) -> (SystemSettings, DatabaseSettings) {
        (self.system, self.database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let snapshot = ConfigSnapshot::default();

        assert!(!snapshot.system.installed);
        assert!(!snapshot.system.maintenance_mode);
        assert!(!snapshot.system.development_mode);
        assert!(!snapshot.system.under_attack_mode);

        let db = snapshot.database;
        assert_eq!(db.server, "localhost");
        assert_eq!(db.ssl_mode, "preferred");
        assert_eq!(db.database, "netcorebb");
        assert_eq!(db.username, "root");
        assert_eq!(db.password, "");
        assert_eq!(db.protocol, "socket");
        assert_eq!(db.port, 3306);
        assert!(db.table_prefix.is_none());
        assert!(db.other.is_empty());
    }

    #[test]
    fn test_connection_string() {
        let mut db = DatabaseSettings::default();
        db.password = "secret".to_string();
        db.other.insert("Pooling".to_string(), "true".to_string());
        db.other.insert("CharSet".to_string(), "utf8mb4".to_string());

        assert_eq!(
            db.connection_string(),
            "Server=localhost;Port=3306;Database=netcorebb;Uid=root;Pwd=secret;\
             SslMode=preferred;Protocol=socket;CharSet=utf8mb4;Pooling=true;"
        );
    }

    #[test]
    fn test_password_is_masked_in_output() {
        let mut db = DatabaseSettings::default();
        db.password = "s3cret".to_string();

        let json = serde_json::to_value(&db).unwrap();
        assert_eq!(json["password"], "********");
        assert_eq!(json["username"], "root");

        let debug = format!("{:?}", db);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("********"));

        // The connection string still carries the real password.
        assert!(db.connection_string().contains("Pwd=s3cret;"));
    }

    #[test]
    fn test_empty_password_stays_empty_in_output() {
        let json = serde_json::to_value(DatabaseSettings::default()).unwrap();
        assert_eq!(json["password"], "");
    }

    #[test]
    fn test_table_name() {
        let mut db = DatabaseSettings::default();
        assert_eq!(db.table_name("users"), "users");

        db.table_prefix = Some("bb_".to_string());
        assert_eq!(db.table_name("users"), "bb_users");
    }

    #[test]
    fn test_other_equality_ignores_insertion_order() {
        let mut a = DatabaseSettings::default();
        a.other.insert("x".to_string(), "1".to_string());
        a.other.insert("y".to_string(), "2".to_string());

        let mut b = DatabaseSettings::default();
        b.other.insert("y".to_string(), "2".to_string());
        b.other.insert("x".to_string(), "1".to_string());

        assert_eq!(a, b);
    }
}
