use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

const DEVICE_TABLE: &str = "device";
const READINGS_TABLE: &str = "energy_readings";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum EmsDbError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("could not create database directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EmsDbError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Device {
    pub device_id: i64,
    pub gateway_name: String,
    pub device_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnergyReading {
    pub device_id: i64,
    pub local_timestamp: String,
    pub active_energy_delivered: String,
    pub error: String,
}

/// A reading as handed to the sink; absent values are stored as empty text.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewReading<'a> {
    pub local_timestamp: Option<&'a str>,
    pub active_energy_delivered: Option<&'a str>,
    pub error: Option<&'a str>,
}

pub struct AccessRO;
pub struct AccessRW;

/// Scoped connection to the EMS store. The connection is closed when dropped.
pub struct Db<AccessTag>(Connection, AccessTag);

pub type DbRW = Db<AccessRW>;
pub type DbRO = Db<AccessRO>;

// Methods common to read-only and read-write connections
impl<AccessTag> Db<AccessTag> {
    pub fn device_id(&self, gateway: &str, device: &str) -> Result<Option<i64>> {
        self.0
            .query_row(
                &format!(
                    "SELECT device_id FROM '{DEVICE_TABLE}'
                    WHERE gateway_name = ?1 AND device_name = ?2"
                ),
                params![gateway, device],
                |r| r.get::<_, i64>(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn devices(&self) -> Result<Vec<Device>> {
        let mut stmt = self.0.prepare(&format!(
            "SELECT device_id, gateway_name, device_name FROM '{DEVICE_TABLE}' ORDER BY device_id"
        ))?;
        let rows = stmt.query_map([], |r| {
            Ok(Device {
                device_id: r.get(0)?,
                gateway_name: r.get(1)?,
                device_name: r.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    /// Readings for one device, in insertion order.
    pub fn readings_for_device(&self, device_id: i64) -> Result<Vec<EnergyReading>> {
        let mut stmt = self.0.prepare(&format!(
            "SELECT device_id, local_timestamp, active_energy_delivered, error
            FROM '{READINGS_TABLE}' WHERE device_id = ?1 ORDER BY rowid"
        ))?;
        let rows = stmt.query_map([device_id], |r| {
            Ok(EnergyReading {
                device_id: r.get(0)?,
                local_timestamp: r.get(1)?,
                active_energy_delivered: r.get(2)?,
                error: r.get(3)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(Into::into)
    }

    pub fn count_readings(&self, device_id: i64) -> Result<i64> {
        self.0
            .query_row(
                &format!("SELECT COUNT(*) FROM '{READINGS_TABLE}' WHERE device_id = ?1"),
                [device_id],
                |r| r.get::<_, i64>(0),
            )
            .map_err(Into::into)
    }
}

// Methods specific to read-only connection
impl DbRO {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        log::debug!("Connecting to {:?} in read-only mode", path.as_ref());
        let connection = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Db(connection, AccessRO))
    }
}

// Methods specific to read-write connection
impl DbRW {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        log::debug!("Connecting to {:?} in read-write mode", path.as_ref());
        // Create directory for DB if it doesn't already exist
        std::fs::create_dir_all(path.as_ref().parent().unwrap_or(Path::new("")))?;
        let connection = Connection::open(path)?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        connection.execute_batch(&format!(
            "PRAGMA foreign_keys = ON;
            CREATE TABLE IF NOT EXISTS '{DEVICE_TABLE}' (
                device_id INTEGER PRIMARY KEY AUTOINCREMENT,
                gateway_name TEXT NOT NULL,
                device_name TEXT NOT NULL,
                UNIQUE (gateway_name, device_name)
            );
            CREATE TABLE IF NOT EXISTS '{READINGS_TABLE}' (
                device_id INTEGER NOT NULL REFERENCES '{DEVICE_TABLE}' (device_id),
                local_timestamp TEXT NOT NULL,
                active_energy_delivered TEXT NOT NULL,
                error TEXT NOT NULL
            );"
        ))?;

        Ok(Db(connection, AccessRW))
    }

    /// Return the id of the (gateway, device) pair, inserting it first if unseen.
    ///
    /// The insert and the select run in one IMMEDIATE transaction, which holds
    /// the write lock from the start; two connections resolving the same new
    /// pair cannot both insert it.
    pub fn resolve_or_create_device(&mut self, gateway: &str, device: &str) -> Result<i64> {
        let tx = self
            .0
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
            &format!(
                "INSERT INTO '{DEVICE_TABLE}' (gateway_name, device_name)
                SELECT ?1, ?2
                WHERE NOT EXISTS (
                    SELECT 1 FROM '{DEVICE_TABLE}' WHERE gateway_name = ?1 AND device_name = ?2
                )"
            ),
            params![gateway, device],
        )?;
        let device_id = tx.query_row(
            &format!(
                "SELECT device_id FROM '{DEVICE_TABLE}'
                WHERE gateway_name = ?1 AND device_name = ?2"
            ),
            params![gateway, device],
            |r| r.get::<_, i64>(0),
        )?;
        tx.commit()?;
        if inserted > 0 {
            log::info!("Registered new device {gateway}/{device} with id {device_id}");
        }
        Ok(device_id)
    }

    /// Append one reading. Each call commits on its own.
    pub fn insert_reading(&self, device_id: i64, reading: &NewReading) -> Result<()> {
        let mut stmt = self.0.prepare_cached(&format!(
            "INSERT INTO '{READINGS_TABLE}'
            (device_id, local_timestamp, active_energy_delivered, error)
            VALUES (?1, ?2, ?3, ?4)"
        ))?;
        stmt.execute(params![
            device_id,
            reading.local_timestamp.unwrap_or(""),
            reading.active_energy_delivered.unwrap_or(""),
            reading.error.unwrap_or(""),
        ])?;
        Ok(())
    }
}
