use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

/// A table of single-bit points (coils or discrete inputs), modeled as a
/// sparse set of set bits — membership means `true`; everything else
/// reads `false`. One `RwLock` per table: many concurrent readers, one
/// writer at a time, independent of every other table.
#[derive(Default)]
pub struct BitTable {
    set: RwLock<HashSet<u16>>,
}

impl BitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self, address: u16) -> bool {
        self.set.read().await.contains(&address)
    }

    pub async fn read_range(&self, start: u16, count: u16) -> Vec<bool> {
        let set = self.set.read().await;
        (0..count)
            .map(|offset| set.contains(&start.wrapping_add(offset)))
            .collect()
    }

    pub async fn write(&self, address: u16, value: bool) {
        let mut set = self.set.write().await;
        if value {
            set.insert(address);
        } else {
            set.remove(&address);
        }
    }

    /// Applies a contiguous run of values under a single write lock, so a
    /// multi-coil request is atomic relative to other writers.
    pub async fn write_range(&self, start: u16, values: &[bool]) {
        let mut set = self.set.write().await;
        for (offset, &value) in values.iter().enumerate() {
            let address = start.wrapping_add(offset as u16);
            if value {
                set.insert(address);
            } else {
                set.remove(&address);
            }
        }
    }
}

/// A table of 16-bit registers (holding or input), modeled as a sparse
/// map from address to non-zero value — an absent entry reads 0.
#[derive(Default)]
pub struct RegisterTable {
    map: RwLock<HashMap<u16, u16>>,
}

impl RegisterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self, address: u16) -> u16 {
        *self.map.read().await.get(&address).unwrap_or(&0)
    }

    pub async fn read_range(&self, start: u16, count: u16) -> Vec<u16> {
        let map = self.map.read().await;
        (0..count)
            .map(|offset| *map.get(&start.wrapping_add(offset)).unwrap_or(&0))
            .collect()
    }

    pub async fn write(&self, address: u16, value: u16) {
        let mut map = self.map.write().await;
        set_or_clear(&mut map, address, value);
    }

    pub async fn write_range(&self, start: u16, values: &[u16]) {
        let mut map = self.map.write().await;
        for (offset, &value) in values.iter().enumerate() {
            let address = start.wrapping_add(offset as u16);
            set_or_clear(&mut map, address, value);
        }
    }
}

fn set_or_clear(map: &mut HashMap<u16, u16>, address: u16, value: u16) {
    if value == 0 {
        map.remove(&address);
    } else {
        map.insert(address, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bit_table_absent_reads_false() {
        let table = BitTable::new();
        assert!(!table.read(42).await);
    }

    #[tokio::test]
    async fn bit_table_range_round_trips() {
        let table = BitTable::new();
        let values = vec![true, false, true, true, false];
        table.write_range(20, &values).await;
        assert_eq!(table.read_range(20, 5).await, values);
    }

    #[tokio::test]
    async fn register_table_absent_reads_zero() {
        let table = RegisterTable::new();
        assert_eq!(table.read(10).await, 0);
    }

    #[tokio::test]
    async fn register_table_range_round_trips() {
        let table = RegisterTable::new();
        table.write_range(10, &[3, 7]).await;
        assert_eq!(table.read_range(10, 2).await, vec![3, 7]);
    }

    #[tokio::test]
    async fn writing_zero_clears_the_sparse_entry() {
        let table = RegisterTable::new();
        table.write(5, 99).await;
        table.write(5, 0).await;
        assert_eq!(table.read(5).await, 0);
    }
}
