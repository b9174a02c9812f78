/// Emitted after every successful write, naming the device, table, and
/// values touched. This is just the event shape a caller's channel or
/// callback set would carry — consuming it is up to that caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteEvent {
    pub unit_id: u8,
    pub start: u16,
    pub kind: WriteKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteKind {
    Coils(Vec<bool>),
    Registers(Vec<u16>),
}
