//! SQLite-backed record store.
//!
//! # Responsibilities
//! - Create the `Employees` and `ReplicationLog` tables on open
//! - Enforce the store role before touching the database
//! - Serialize every operation through a single gate
//! - Write one change-log entry per primary mutation, in the same transaction

use std::path::Path;
use std::sync::Arc;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use crate::store::{ChangeLogEntry, Employee, NewEmployee, Operation, Role, StoreError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS Employees (
        Id INTEGER PRIMARY KEY AUTOINCREMENT,
        Name TEXT NOT NULL,
        Position TEXT NOT NULL,
        Salary REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS ReplicationLog (
        LogId INTEGER PRIMARY KEY AUTOINCREMENT,
        Operation TEXT NOT NULL,
        EmployeeId INTEGER,
        Timestamp INTEGER NOT NULL
    );";

/// A role-tagged employee store.
///
/// The gate is an async mutex that owns the connection; holding it is the
/// only way to reach the database, so operations on one store never overlap.
#[derive(Debug)]
pub struct RecordStore {
    role: Role,
    gate: Arc<Mutex<Connection>>,
}

impl RecordStore {
    /// Open (or create) the store file at `path`.
    pub fn open(path: impl AsRef<Path>, role: Role) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Task(format!("cannot create {}: {}", parent.display(), e)))?;
            }
        }

        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), role = %role, "Record store opened");
        Self::with_connection(conn, role)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory(role: Role) -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, role)
    }

    fn with_connection(conn: Connection, role: Role) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            role,
            gate: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Run `f` with exclusive access to the connection on the blocking pool.
    async fn with_gate<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = self.gate.clone().lock_owned().await;
        tokio::task::spawn_blocking(move || f(&mut *guard))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn require(&self, role: Role, operation: &'static str) -> Result<(), StoreError> {
        if self.role != role {
            return Err(StoreError::role_violation(self.role, operation));
        }
        Ok(())
    }

    // --- Reads (replica) ---

    pub async fn get_by_id(&self, id: i64) -> Result<Employee, StoreError> {
        self.require(Role::Replica, "read operations")?;
        self.with_gate(move |conn| {
            conn.query_row(
                "SELECT Id, Name, Position, Salary FROM Employees WHERE Id = ?1",
                params![id],
                employee_from_row,
            )
            .optional()?
            .ok_or(StoreError::NotFound(id))
        })
        .await
    }

    /// Records in insertion order, windowed by `offset` and `limit`.
    pub async fn get_all(&self, offset: u32, limit: u32) -> Result<Vec<Employee>, StoreError> {
        self.require(Role::Replica, "read operations")?;
        self.with_gate(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT Id, Name, Position, Salary FROM Employees ORDER BY Id LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt.query_map(params![limit, offset], employee_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    // --- Writes (primary) ---

    /// Insert a new employee and return its primary-assigned id.
    pub async fn add(&self, employee: &NewEmployee) -> Result<i64, StoreError> {
        self.require(Role::Primary, "write operations")?;
        employee.validate()?;
        let employee = employee.clone();

        self.with_gate(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO Employees (Name, Position, Salary) VALUES (?1, ?2, ?3)",
                params![employee.name, employee.position, employee.salary],
            )?;
            let id = tx.last_insert_rowid();
            append_log(&tx, Operation::Insert, id)?;
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    /// Overwrite name, position and salary for `employee.id`.
    ///
    /// An unknown id changes nothing but is still logged.
    pub async fn update(&self, employee: &Employee) -> Result<(), StoreError> {
        self.require(Role::Primary, "write operations")?;
        employee.validate()?;
        let employee = employee.clone();

        self.with_gate(move |conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE Employees SET Name = ?1, Position = ?2, Salary = ?3 WHERE Id = ?4",
                params![employee.name, employee.position, employee.salary, employee.id],
            )?;
            if changed == 0 {
                tracing::debug!(id = employee.id, "Update matched no employee");
            }
            append_log(&tx, Operation::Update, employee.id)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Remove the employee if present. The delete is logged either way.
    pub async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.require(Role::Primary, "write operations")?;

        self.with_gate(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM Employees WHERE Id = ?1", params![id])?;
            append_log(&tx, Operation::Delete, id)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    // --- Replication ---

    /// Full record set in id order. Role-exempt: this is what replicas pull.
    pub async fn snapshot(&self) -> Result<Vec<Employee>, StoreError> {
        self.with_gate(|conn| read_all(conn)).await
    }

    /// Replace every local row with `records`, keeping their ids.
    ///
    /// Runs under the gate and inside one transaction, so readers see either
    /// the previous set or the new one.
    pub(crate) async fn apply_snapshot(&self, records: Vec<Employee>) -> Result<usize, StoreError> {
        self.require(Role::Replica, "snapshot apply")?;

        self.with_gate(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM Employees", [])?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO Employees (Id, Name, Position, Salary) VALUES (?1, ?2, ?3, ?4)",
                )?;
                for e in &records {
                    insert.execute(params![e.id, e.name, e.position, e.salary])?;
                }
            }
            tx.commit()?;
            Ok(records.len())
        })
        .await
    }

    // --- Audit ---

    pub async fn change_log(&self) -> Result<Vec<ChangeLogEntry>, StoreError> {
        self.with_gate(|conn| {
            let mut stmt = conn.prepare(
                "SELECT LogId, Operation, EmployeeId, Timestamp FROM ReplicationLog ORDER BY LogId",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?;

            let mut entries = Vec::new();
            for row in rows {
                let (log_id, operation, employee_id, timestamp) = row?;
                entries.push(ChangeLogEntry {
                    log_id,
                    operation: operation.parse()?,
                    employee_id,
                    timestamp,
                });
            }
            Ok(entries)
        })
        .await
    }

    /// Number of stored employees.
    pub async fn count(&self) -> Result<u64, StoreError> {
        self.with_gate(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM Employees", [], |row| row.get(0))?;
            Ok(n as u64)
        })
        .await
    }
}

fn append_log(conn: &Connection, operation: Operation, employee_id: i64) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO ReplicationLog (Operation, EmployeeId, Timestamp) VALUES (?1, ?2, ?3)",
        params![operation.as_str(), employee_id, Utc::now().timestamp()],
    )?;
    Ok(())
}

pub(crate) fn employee_from_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
        salary: row.get(3)?,
    })
}

pub(crate) fn read_all(conn: &Connection) -> Result<Vec<Employee>, StoreError> {
    let mut stmt = conn.prepare("SELECT Id, Name, Position, Salary FROM Employees ORDER BY Id")?;
    let rows = stmt.query_map([], employee_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
