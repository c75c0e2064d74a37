//! Transaction control statements.
//!
//! The protocol itself only carries an opaque transaction id in headers;
//! starting and ending a transaction happens through ordinary statements.
//! This module renders those statements and names the isolation levels.

/// Isolation level requested when a connection starts a transaction.
///
/// `Autocommit` is the connection default: every statement commits on its
/// own and no transaction id is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    Autocommit,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling of the level, or `None` for autocommit.
    pub fn as_sql(self) -> Option<&'static str> {
        match self {
            Self::Autocommit => None,
            Self::ReadUncommitted => Some("READ UNCOMMITTED"),
            Self::ReadCommitted => Some("READ COMMITTED"),
            Self::RepeatableRead => Some("REPEATABLE READ"),
            Self::Serializable => Some("SERIALIZABLE"),
        }
    }

    /// The `START TRANSACTION` statement for this level, or `None` for
    /// autocommit.
    pub fn start_statement(self) -> Option<String> {
        self.as_sql()
            .map(|level| format!("START TRANSACTION ISOLATION LEVEL {}", level))
    }
}

pub const COMMIT_STATEMENT: &str = "COMMIT";
pub const ROLLBACK_STATEMENT: &str = "ROLLBACK";
