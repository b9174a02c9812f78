use tokio::sync::mpsc;

use super::events::{WriteEvent, WriteKind};
use super::table::{BitTable, RegisterTable};

/// One addressable unit on the bus: four independent tables plus an
/// optional write-event sink. The event relationship is a plain channel
/// supplied at construction rather than a back-reference from address
/// space to whatever consumes its events.
pub struct Device {
    unit_id: u8,
    coils: BitTable,
    discrete_inputs: BitTable,
    holding_registers: RegisterTable,
    input_registers: RegisterTable,
    write_events: Option<mpsc::UnboundedSender<WriteEvent>>,
}

impl Device {
    pub fn new(unit_id: u8) -> Self {
        Self {
            unit_id,
            coils: BitTable::new(),
            discrete_inputs: BitTable::new(),
            holding_registers: RegisterTable::new(),
            input_registers: RegisterTable::new(),
            write_events: None,
        }
    }

    pub fn with_write_events(mut self, sink: mpsc::UnboundedSender<WriteEvent>) -> Self {
        self.write_events = Some(sink);
        self
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn coils(&self) -> &BitTable {
        &self.coils
    }

    pub fn discrete_inputs(&self) -> &BitTable {
        &self.discrete_inputs
    }

    pub fn holding_registers(&self) -> &RegisterTable {
        &self.holding_registers
    }

    pub fn input_registers(&self) -> &RegisterTable {
        &self.input_registers
    }

    fn emit(&self, start: u16, kind: WriteKind) {
        if let Some(sink) = &self.write_events {
            let _ = sink.send(WriteEvent {
                unit_id: self.unit_id,
                start,
                kind,
            });
        }
    }

    pub async fn write_single_coil(&self, address: u16, value: bool) {
        self.coils.write(address, value).await;
        self.emit(address, WriteKind::Coils(vec![value]));
    }

    pub async fn write_single_register(&self, address: u16, value: u16) {
        self.holding_registers.write(address, value).await;
        self.emit(address, WriteKind::Registers(vec![value]));
    }

    pub async fn write_multiple_coils(&self, start: u16, values: Vec<bool>) {
        self.coils.write_range(start, &values).await;
        self.emit(start, WriteKind::Coils(values));
    }

    pub async fn write_multiple_registers(&self, start: u16, values: Vec<u16>) {
        self.holding_registers.write_range(start, &values).await;
        self.emit(start, WriteKind::Registers(values));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_before_any_write_are_zero_or_false() {
        let device = Device::new(1);
        assert!(!device.coils().read(0).await);
        assert_eq!(device.holding_registers().read(0).await, 0);
    }

    #[tokio::test]
    async fn write_emits_event_with_unit_id() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let device = Device::new(9).with_write_events(tx);
        device.write_single_register(10, 42).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.unit_id, 9);
        assert_eq!(event.start, 10);
        assert_eq!(event.kind, WriteKind::Registers(vec![42]));
    }

    #[tokio::test]
    async fn tables_are_independent() {
        let device = Device::new(1);
        device.write_single_coil(5, true).await;
        assert!(!device.discrete_inputs().read(5).await);
        assert_eq!(device.holding_registers().read(5).await, 0);
    }

    #[tokio::test]
    async fn s4_scenario_device_state() {
        let device = Device::new(0x0A);
        device.write_multiple_registers(2, vec![10, 258]).await;
        assert_eq!(device.holding_registers().read(2).await, 10);
        assert_eq!(device.holding_registers().read(3).await, 258);
    }
}
