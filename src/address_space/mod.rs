//! Per-device Modbus data tables: coils, discrete inputs, holding
//! registers, input registers. Reads are concurrent; writes are
//! serialized per table. Absent addresses read as 0 / false, so a device
//! never needs pre-population before it can answer reads.

mod device;
mod events;
mod registry;
mod table;

pub use device::Device;
pub use events::{WriteEvent, WriteKind};
pub use registry::Devices;
pub use table::{BitTable, RegisterTable};
