//! The administrative author: generated on a fresh build, read back otherwise.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::manifest::Author;

/// Credential produced by a build. `password` is the plaintext and is only
/// present when this run generated it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministrativeCredential {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub token: String,
}

/// Random password of `length` characters from base64 of random bytes, `/` removed.
pub fn generate_password(length: usize) -> String {
    let mut password = String::with_capacity(length);
    while password.len() < length {
        let mut bytes = Vec::with_capacity(length * 2);
        while bytes.len() < length * 2 {
            bytes.extend_from_slice(Uuid::new_v4().as_bytes());
        }
        password.extend(STANDARD.encode(&bytes).chars().filter(|c| *c != '/'));
    }
    password.truncate(length);
    password
}

/// Salted SHA-256: `SSHA256|<salt>|<hex digest of salt + password>`.
pub fn hash_password(plain: &str) -> String {
    let salt: String = Uuid::new_v4().simple().to_string().chars().take(16).collect();
    let digest = Sha256::digest(format!("{}{}", salt, plain).as_bytes());
    format!("SSHA256|{}|{:x}", salt, digest)
}

/// First 8 hex characters of sha256(username + stored password).
pub fn auth_token(username: &str, stored_password: &str) -> String {
    let digest = Sha256::digest(format!("{}{}", username, stored_password).as_bytes());
    format!("{:x}", digest).chars().take(8).collect()
}

/// Escape a value for a single-quoted MySQL string literal.
pub fn sql_escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub fn author_insert_sql(table: &str, author: &Author, stored_password: &str) -> String {
    format!(
        "TRUNCATE TABLE `{table}`;\n\
         INSERT INTO `{table}` (`id`, `username`, `password`, `first_name`, `last_name`, `email`, `last_seen`, `user_type`, `primary`, `default_area`, `auth_token_active`, `language`)\n\
         VALUES (NULL,'{username}','{password}','Administration','User','{email}',NOW(),'developer','yes',NULL,'yes',NULL);\n",
        table = table,
        username = sql_escape(&author.username),
        password = sql_escape(stored_password),
        email = sql_escape(&author.email),
    )
}

/// Replace every author with a freshly generated primary author.
pub fn create(db: &Database, table: &str, author: &Author, length: usize) -> Result<AdministrativeCredential> {
    let plain = generate_password(length);
    let stored = hash_password(&plain);
    db.import_sql(&author_insert_sql(table, author, &stored))?;

    Ok(AdministrativeCredential {
        username: author.username.clone(),
        email: Some(author.email.clone()),
        token: auth_token(&author.username, &stored),
        password: Some(plain),
    })
}

/// Derive the token of the existing primary author (lowest id).
pub fn recover(db: &Database, table: &str) -> Result<AdministrativeCredential> {
    let sql = format!(
        "SELECT `username`, `password` FROM `{}` WHERE `primary` = 'yes' ORDER BY `id` ASC LIMIT 1;",
        table
    );
    let rows = db
        .query_rows(&sql)
        .map_err(|e| Error::author_unavailable(e.detail()))?;

    let row = rows.into_iter().next().ok_or_else(|| {
        Error::author_unavailable("Could not locate primary author. Are there any authors in the database?")
    })?;

    match row.as_slice() {
        [username, stored, ..] => Ok(AdministrativeCredential {
            username: username.clone(),
            email: None,
            password: None,
            token: auth_token(username, stored),
        }),
        _ => Err(Error::author_unavailable("Primary author row is incomplete")),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::rc::Rc;

    use super::*;
    use crate::confirm::ConfirmMode;
    use crate::context::testing::context;
    use crate::db::testing::credentials;
    use crate::error::ErrorCode;
    use crate::process::testing::ScriptedRunner;
    use crate::process::CapturedOutput;
    use crate::prompt::testing::ScriptedPrompter;

    fn author() -> Author {
        Author {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn password_shape() {
        for _ in 0..20 {
            let p = generate_password(12);
            assert_eq!(p.len(), 12);
            assert!(!p.contains('/'));
        }
        assert_ne!(generate_password(12), generate_password(12));
    }

    #[test]
    fn hash_is_salted() {
        let a = hash_password("secret");
        let b = hash_password("secret");
        assert!(a.starts_with("SSHA256|"));
        assert_eq!(a.split('|').count(), 3);
        assert_ne!(a, b);
    }

    #[test]
    fn token_is_stable() {
        let token = auth_token("admin", "SSHA256|abc|def");
        assert_eq!(token.len(), 8);
        assert_eq!(token, auth_token("admin", "SSHA256|abc|def"));
        assert_ne!(token, auth_token("root", "SSHA256|abc|def"));
    }

    #[test]
    fn insert_escapes_values() {
        let sneaky = Author {
            username: "o'brien".to_string(),
            email: "a\\b@example.com".to_string(),
        };
        let sql = author_insert_sql("tbl_authors", &sneaky, "SSHA256|s|h");
        assert!(sql.starts_with("TRUNCATE TABLE `tbl_authors`;"));
        assert!(sql.contains("'o\\'brien'"));
        assert!(sql.contains("'a\\\\b@example.com'"));
        assert!(sql.contains("'developer','yes',NULL,'yes',NULL"));
    }

    #[test]
    fn create_imports_author_row() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Rc::new(ScriptedRunner::with(|inv| {
            if let Some(path) = &inv.stdin_file {
                let sql = fs::read_to_string(path).unwrap();
                assert!(sql.contains("INSERT INTO `tbl_authors`"));
            }
            Ok(CapturedOutput::default())
        }));
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, Rc::clone(&runner), Rc::new(ScriptedPrompter::silent()));
        let db = Database::connect(&ctx, credentials()).unwrap();

        let credential = create(&db, "tbl_authors", &author(), 12).unwrap();
        assert_eq!(credential.username, "admin");
        assert_eq!(credential.password.as_ref().map(String::len), Some(12));
        assert_eq!(credential.token.len(), 8);
        assert!(runner.calls().last().unwrap().stdin_file.is_some());
    }

    #[test]
    fn recover_reads_primary_author() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Rc::new(ScriptedRunner::with(|inv| {
            let sql = inv.args.last().cloned().unwrap_or_default();
            if sql.starts_with("SELECT `username`") {
                Ok(CapturedOutput::new("admin\tSSHA256|abc|def", ""))
            } else {
                Ok(CapturedOutput::default())
            }
        }));
        let ctx = context(dir.path(), ConfirmMode::AssumeYes, runner, Rc::new(ScriptedPrompter::silent()));
        let db = Database::connect(&ctx, credentials()).unwrap();

        let credential = recover(&db, "tbl_authors").unwrap();
        assert_eq!(credential.username, "admin");
        assert_eq!(credential.password, None);
        assert_eq!(credential.token, auth_token("admin", "SSHA256|abc|def"));
    }

    #[test]
    fn recover_without_authors_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(
            dir.path(),
            ConfirmMode::AssumeYes,
            Rc::new(ScriptedRunner::ok()),
            Rc::new(ScriptedPrompter::silent()),
        );
        let db = Database::connect(&ctx, credentials()).unwrap();

        let err = recover(&db, "tbl_authors").unwrap_err();
        assert_eq!(err.code, ErrorCode::AuthorUnavailable);
    }
}
