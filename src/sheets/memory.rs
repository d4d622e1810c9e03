use std::sync::Mutex;

use super::*;

/// A sheet held in memory that remembers every write it received.
#[derive(Debug, Default)]
pub struct MemorySheet {
    rows: Mutex<Vec<Row>>,
    pub writes: Mutex<Vec<Vec<Row>>>,
}

impl MemorySheet {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Self::default()
        }
    }

    pub fn rows(&self) -> Vec<Row> {
        self.rows.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }
}

impl Sheet for MemorySheet {
    async fn read_rows(&self) -> Result<Vec<Row>> {
        Ok(self.rows())
    }

    async fn write_rows(&self, rows: &[Row]) -> Result<u64> {
        self.writes.lock().unwrap().push(rows.to_vec());
        *self.rows.lock().unwrap() = rows.to_vec();

        Ok(rows.iter().map(|row| row.len() as u64).sum())
    }
}
