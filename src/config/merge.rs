//! Field-by-field application of a parsed layer onto a snapshot.
//!
//! A recognized key overwrites its field only when present with the expected
//! type. Absent or mistyped keys leave the field untouched, and `[MySQL.Other]`
//! replaces the previous map wholesale rather than merging into it.

use super::layer::{OTHER_TABLE, ParsedDocument};
use super::types::{ConfigSnapshot, DatabaseSettings, SystemSettings};
use std::collections::BTreeMap;
use toml::{Table, Value};
use tracing::debug;

/// Apply `layer` on top of `current`, returning the merged copy.
pub fn apply_layer(current: &ConfigSnapshot, layer: &ParsedDocument) -> ConfigSnapshot {
    let mut next = current.clone();
    if let Some(section) = layer.system() {
        apply_system(&mut next.system, section);
    }
    if let Some(section) = layer.mysql() {
        apply_database(&mut next.database, section);
    }
    next
}

/// Apply several layers in order; later layers win.
pub fn apply_layers<'a>(
    base: ConfigSnapshot,
    layers: impl IntoIterator<Item = &'a ParsedDocument>,
) -> ConfigSnapshot {
    layers
        .into_iter()
        .fold(base, |acc, layer| apply_layer(&acc, layer))
}

fn apply_system(system: &mut SystemSettings, section: &Table) {
    set_bool(&mut system.installed, section, "SystemInstalled");
    set_bool(&mut system.maintenance_mode, section, "MaintenanceMode");
    set_bool(&mut system.development_mode, section, "DevelopmentMode");
    set_bool(&mut system.under_attack_mode, section, "UnderAttackMode");
}

fn apply_database(db: &mut DatabaseSettings, section: &Table) {
    set_string(&mut db.server, section, "Server");
    set_string(&mut db.ssl_mode, section, "SslMode");
    set_string(&mut db.database, section, "Database");
    set_string(&mut db.username, section, "Username");
    set_string(&mut db.password, section, "Password");
    set_string(&mut db.protocol, section, "Protocol");
    set_port(&mut db.port, section, "Port");

    if let Some(value) = section.get("TablePrefix") {
        match value.as_str() {
            Some(prefix) => db.table_prefix = Some(prefix.to_string()),
            None => skip("TablePrefix", value),
        }
    }

    if let Some(value) = section.get(OTHER_TABLE) {
        match value.as_table() {
            Some(table) => db.other = coerce_other(table),
            None => skip(OTHER_TABLE, value),
        }
    }
}

/// Coerce an `[MySQL.Other]` table into text values.
///
/// Booleans become `"true"`/`"false"`, integers their decimal form, strings
/// are kept verbatim and every other type becomes an empty string.
pub fn coerce_other(table: &Table) -> BTreeMap<String, String> {
    table
        .iter()
        .map(|(key, value)| (key.clone(), coerce_scalar(value)))
        .collect()
}

fn coerce_scalar(value: &Value) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::String(s) => s.clone(),
        _ => String::new(),
    }
}

fn set_bool(field: &mut bool, section: &Table, key: &str) {
    if let Some(value) = section.get(key) {
        match value.as_bool() {
            Some(b) => *field = b,
            None => skip(key, value),
        }
    }
}

fn set_string(field: &mut String, section: &Table, key: &str) {
    if let Some(value) = section.get(key) {
        match value.as_str() {
            Some(s) => *field = s.to_string(),
            None => skip(key, value),
        }
    }
}

fn set_port(field: &mut u16, section: &Table, key: &str) {
    if let Some(value) = section.get(key) {
        match value.as_integer().and_then(|i| u16::try_from(i).ok()) {
            Some(port) => *field = port,
            None => skip(key, value),
        }
    }
}

fn skip(key: &str, value: &Value) {
    debug!(
        "Ignoring config key '{}': unexpected {} value",
        key,
        value.type_str()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> ParsedDocument {
        ParsedDocument::parse(text).unwrap()
    }

    #[test]
    fn test_apply_system_flags() {
        let layer = doc("[System]\nSystemInstalled = true\nUnderAttackMode = true");
        let result = apply_layer(&ConfigSnapshot::default(), &layer);

        assert!(result.system.installed);
        assert!(result.system.under_attack_mode);
        assert!(!result.system.maintenance_mode);
        assert!(!result.system.development_mode);
        assert_eq!(result.database, DatabaseSettings::default());
    }

    #[test]
    fn test_apply_database_fields() {
        let layer = doc(
            r#"
[MySQL]
Server = "db.internal"
SslMode = "required"
Database = "forum"
Username = "bb"
Password = "hunter2"
Protocol = "tcp"
Port = 777
TablePrefix = "bb_"
"#,
        );
        let db = apply_layer(&ConfigSnapshot::default(), &layer).database;

        assert_eq!(db.server, "db.internal");
        assert_eq!(db.ssl_mode, "required");
        assert_eq!(db.database, "forum");
        assert_eq!(db.username, "bb");
        assert_eq!(db.password, "hunter2");
        assert_eq!(db.protocol, "tcp");
        assert_eq!(db.port, 777);
        assert_eq!(db.table_prefix.as_deref(), Some("bb_"));
    }

    #[test]
    fn test_mistyped_keys_keep_prior_values() {
        let layer = doc(
            r#"
[System]
SystemInstalled = "yes"
MaintenanceMode = true

[MySQL]
Port = "3307"
Server = 42
Database = "forum"
"#,
        );
        let result = apply_layer(&ConfigSnapshot::default(), &layer);

        assert!(!result.system.installed);
        assert!(result.system.maintenance_mode);
        assert_eq!(result.database.port, 3306);
        assert_eq!(result.database.server, "localhost");
        assert_eq!(result.database.database, "forum");
    }

    #[test]
    fn test_port_out_of_range_is_skipped() {
        let base = apply_layer(&ConfigSnapshot::default(), &doc("[MySQL]\nPort = 123"));

        let negative = apply_layer(&base, &doc("[MySQL]\nPort = -1"));
        assert_eq!(negative.database.port, 123);

        let too_big = apply_layer(&base, &doc("[MySQL]\nPort = 70000"));
        assert_eq!(too_big.database.port, 123);
    }

    #[test]
    fn test_other_coercion() {
        let layer = doc(
            r#"
[MySQL.Other]
g = "xxx"
h = 123
i = true
j = 1.5
k = [1, 2]
"#,
        );
        let other = apply_layer(&ConfigSnapshot::default(), &layer).database.other;

        assert_eq!(other["g"], "xxx");
        assert_eq!(other["h"], "123");
        assert_eq!(other["i"], "true");
        assert_eq!(other["j"], "");
        assert_eq!(other["k"], "");
        assert_eq!(other.len(), 5);
    }

    #[test]
    fn test_other_replaces_previous_map() {
        let first = apply_layer(
            &ConfigSnapshot::default(),
            &doc("[MySQL.Other]\na = \"1\"\nb = \"2\""),
        );
        let second = apply_layer(&first, &doc("[MySQL.Other]\nc = false"));

        assert_eq!(second.database.other.len(), 1);
        assert_eq!(second.database.other["c"], "false");
    }

    #[test]
    fn test_absent_other_keeps_previous_map() {
        let first = apply_layer(&ConfigSnapshot::default(), &doc("[MySQL.Other]\na = 1"));
        let second = apply_layer(&first, &doc("[MySQL]\nPort = 1"));
        assert_eq!(second.database.other["a"], "1");
    }

    #[test]
    fn test_other_of_wrong_type_is_skipped() {
        let first = apply_layer(&ConfigSnapshot::default(), &doc("[MySQL.Other]\na = 1"));
        let second = apply_layer(&first, &doc("[MySQL]\nOther = \"oops\""));
        assert_eq!(second.database.other["a"], "1");
    }

    #[test]
    fn test_unknown_keys_and_sections_ignored() {
        let layer = doc("[Mail]\nHost = \"smtp\"\n\n[System]\nColor = \"blue\"");
        assert_eq!(
            apply_layer(&ConfigSnapshot::default(), &layer),
            ConfigSnapshot::default()
        );
    }

    #[test]
    fn test_section_names_are_case_sensitive() {
        let layer = doc("[mysql]\nPort = 1\n[system]\nSystemInstalled = true");
        assert_eq!(
            apply_layer(&ConfigSnapshot::default(), &layer),
            ConfigSnapshot::default()
        );
    }

    #[test]
    fn test_apply_layers_precedence() {
        let main = doc("[MySQL]\nPort = 123\nServer = \"main\"");
        let user = doc("[MySQL]\nPort = 456");
        let dev = doc("[MySQL]\nPort = 789");

        let result = apply_layers(ConfigSnapshot::default(), [&main, &user, &dev]);
        assert_eq!(result.database.port, 789);
        assert_eq!(result.database.server, "main");
    }

    #[test]
    fn test_apply_layer_does_not_mutate_input() {
        let base = ConfigSnapshot::default();
        let _ = apply_layer(&base, &doc("[System]\nSystemInstalled = true"));
        assert_eq!(base, ConfigSnapshot::default());
    }
}
