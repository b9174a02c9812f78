use crate::errors::SessionError;

const MAX_COIL_READ: u16 = 2000;
const MAX_REGISTER_READ: u16 = 125;
const MAX_COIL_WRITE: u16 = 1968;
const MAX_REGISTER_WRITE: u16 = 123;

fn validate_range(start: u16, count: u16, max: u16, what: &str) -> Result<(), SessionError> {
    if count == 0 || count > max {
        return Err(SessionError::invalid_argument(format!(
            "{what} count {count} out of range [1, {max}]"
        )));
    }
    if (start as u32) + (count as u32) > 65536 {
        return Err(SessionError::invalid_argument(format!(
            "{what} start {start} + count {count} exceeds the address space"
        )));
    }
    Ok(())
}

pub fn read_coils(start: u16, count: u16) -> Result<(), SessionError> {
    validate_range(start, count, MAX_COIL_READ, "coil read")
}

pub fn read_discrete_inputs(start: u16, count: u16) -> Result<(), SessionError> {
    validate_range(start, count, MAX_COIL_READ, "discrete input read")
}

pub fn read_holding_registers(start: u16, count: u16) -> Result<(), SessionError> {
    validate_range(start, count, MAX_REGISTER_READ, "holding register read")
}

pub fn read_input_registers(start: u16, count: u16) -> Result<(), SessionError> {
    validate_range(start, count, MAX_REGISTER_READ, "input register read")
}

pub fn write_multiple_coils(start: u16, count: usize) -> Result<(), SessionError> {
    validate_range(start, count as u16, MAX_COIL_WRITE, "multiple coil write")
}

pub fn write_multiple_registers(start: u16, count: usize) -> Result<(), SessionError> {
    validate_range(start, count as u16, MAX_REGISTER_WRITE, "multiple register write")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_count_is_invalid() {
        assert!(read_coils(0, 0).is_err());
    }

    #[test]
    fn count_over_max_is_invalid() {
        assert!(read_holding_registers(0, 126).is_err());
    }

    #[test]
    fn range_overflowing_address_space_is_invalid() {
        assert!(read_coils(65535, 10).is_err());
    }

    #[test]
    fn in_range_is_valid() {
        assert!(read_coils(20, 10).is_ok());
        assert!(write_multiple_registers(0, 123).is_ok());
    }
}
