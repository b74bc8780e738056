//! MCP23S17 16-bit SPI GPIO expander.
//!
//! Registers are addressed with IOCON.BANK = 0 (port A and B interleaved).
//! Every transaction is three bytes: opcode, register, data. The opcode
//! carries the A2..A0 hardware address, which only takes effect once
//! IOCON.HAEN is set.
//!
//! Pin numbering: 0..=7 are GPA0..GPA7, 8..=15 are GPB0..GPB7.

use rppal::spi::Spi;

use crate::platform::{Direction, Level, LineAddress, PlatformError, Pull, EXPANDER_BASE};

mod reg {
    pub const IODIRA: u8 = 0x00;
    pub const IOCON: u8 = 0x0A;
    pub const IOCONB: u8 = 0x0B;
    pub const GPPUA: u8 = 0x0C;
    pub const GPIOA: u8 = 0x12;
    pub const OLATA: u8 = 0x14;
}

const IOCON_HAEN: u8 = 0x08;
/// Set to disable the address pointer auto-increment.
const IOCON_SEQOP: u8 = 0x20;

const OPCODE_WRITE: u8 = 0x40;
const OPCODE_READ: u8 = 0x41;

/// Full-duplex byte exchange on the bus the expander is attached to.
pub trait SpiTransport {
    fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), PlatformError>;
}

impl SpiTransport for Spi {
    fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), PlatformError> {
        Spi::transfer(self, read, write)
            .map(|_| ())
            .map_err(|e| PlatformError::Bus(e.to_string()))
    }
}

pub struct Mcp23s17<T> {
    spi: T,
    address: u8,
    /// Output latches for port A and B, so writes need no read-back.
    latch: [u8; 2],
}

impl<T: SpiTransport> Mcp23s17<T> {
    /// Enables hardware addressing and disables sequential addressing
    /// (SEQOP set), then loads the current output latches.
    pub fn new(spi: T, address: u8) -> Result<Self, PlatformError> {
        if address > 7 {
            return Err(PlatformError::Bus(format!(
                "expander hardware address {address} out of range 0..=7"
            )));
        }
        let mut chip = Self {
            spi,
            address,
            latch: [0; 2],
        };
        // IOCON is mirrored at both addresses; write both in case the chip
        // powered up with BANK set.
        chip.write_register(reg::IOCON, IOCON_SEQOP | IOCON_HAEN)?;
        chip.write_register(reg::IOCONB, IOCON_SEQOP | IOCON_HAEN)?;
        chip.latch = [
            chip.read_register(reg::OLATA)?,
            chip.read_register(reg::OLATA + 1)?,
        ];
        log::info!("expander: MCP23S17 at address {address} initialised");
        Ok(chip)
    }

    pub fn set_direction(&mut self, pin: u8, direction: Direction) -> Result<(), PlatformError> {
        // IODIR bit set means input.
        self.update_bit(reg::IODIRA, pin, direction == Direction::Input)
    }

    pub fn set_pull(&mut self, pin: u8, pull: Pull) -> Result<(), PlatformError> {
        self.update_bit(reg::GPPUA, pin, pull == Pull::Up)
    }

    pub fn read_pin(&mut self, pin: u8) -> Result<Level, PlatformError> {
        let (port, mask) = locate(pin)?;
        let value = self.read_register(reg::GPIOA + port)?;
        Ok(Level::from_bool(value & mask != 0))
    }

    pub fn write_pin(&mut self, pin: u8, level: Level) -> Result<(), PlatformError> {
        let (port, mask) = locate(pin)?;
        let latch = &mut self.latch[usize::from(port)];
        match level {
            Level::High => *latch |= mask,
            Level::Low => *latch &= !mask,
        }
        let value = *latch;
        self.write_register(reg::OLATA + port, value)
    }

    fn update_bit(&mut self, base: u8, pin: u8, set: bool) -> Result<(), PlatformError> {
        let (port, mask) = locate(pin)?;
        let register = base + port;
        let old = self.read_register(register)?;
        let new = if set { old | mask } else { old & !mask };
        if new != old {
            self.write_register(register, new)?;
        }
        Ok(())
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), PlatformError> {
        let tx = [OPCODE_WRITE | (self.address << 1), register, value];
        let mut rx = [0u8; 3];
        self.spi.exchange(&tx, &mut rx)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, PlatformError> {
        let tx = [OPCODE_READ | (self.address << 1), register, 0];
        let mut rx = [0u8; 3];
        self.spi.exchange(&tx, &mut rx)?;
        Ok(rx[2])
    }
}

/// Port offset (0 = A, 1 = B) and bit mask for `pin`.
fn locate(pin: u8) -> Result<(u8, u8), PlatformError> {
    match pin {
        0..=7 => Ok((0, 1 << pin)),
        8..=15 => Ok((1, 1 << (pin - 8))),
        _ => Err(PlatformError::UnknownLine(LineAddress(
            EXPANDER_BASE + u16::from(pin),
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Register file of one MCP23S17 behind a fake bus.
    #[derive(Default)]
    struct FakeChip {
        registers: [u8; 0x16],
        transactions: Vec<[u8; 3]>,
        fail: bool,
    }

    impl SpiTransport for &mut FakeChip {
        fn exchange(&mut self, write: &[u8], read: &mut [u8]) -> Result<(), PlatformError> {
            if self.fail {
                return Err(PlatformError::Bus("no ack".into()));
            }
            let frame: [u8; 3] = write.try_into().unwrap();
            self.transactions.push(frame);
            let register = usize::from(frame[1]);
            if frame[0] & 0x01 == 0x01 {
                read[2] = self.registers[register];
            } else {
                self.registers[register] = frame[2];
                // GPIO writes land in the output latch.
                if register == 0x12 || register == 0x13 {
                    self.registers[register + 2] = frame[2];
                }
            }
            Ok(())
        }
    }

    fn fresh_chip() -> FakeChip {
        let mut chip = FakeChip::default();
        // Power-on reset: every pin is an input.
        chip.registers[0x00] = 0xFF;
        chip.registers[0x01] = 0xFF;
        chip
    }

    #[test]
    fn init_sets_haen_and_seqop_on_both_iocon() {
        let mut chip = fresh_chip();
        Mcp23s17::new(&mut chip, 0).unwrap();
        assert_eq!(chip.registers[0x0A], 0x28);
        assert_eq!(chip.registers[0x0B], 0x28);
    }

    #[test]
    fn opcode_carries_hardware_address() {
        let mut chip = fresh_chip();
        Mcp23s17::new(&mut chip, 3).unwrap();
        assert_eq!(chip.transactions[0][0], 0x40 | (3 << 1));
        assert!(chip.transactions.iter().skip(2).all(|t| t[0] == 0x47));
    }

    #[test]
    fn address_out_of_range_is_rejected() {
        let mut chip = fresh_chip();
        assert!(Mcp23s17::new(&mut chip, 8).is_err());
        assert!(chip.transactions.is_empty());
    }

    #[test]
    fn port_b_pin_configured_as_pulled_up_input() {
        let mut chip = fresh_chip();
        {
            let mut mcp = Mcp23s17::new(&mut chip, 0).unwrap();
            mcp.set_direction(9, Direction::Input).unwrap();
            mcp.set_pull(9, Pull::Up).unwrap();
        }
        assert_eq!(chip.registers[0x01] & 0b10, 0b10);
        assert_eq!(chip.registers[0x0D], 0b10);
        assert_eq!(chip.registers[0x0C], 0);
    }

    #[test]
    fn output_direction_clears_iodir_bit() {
        let mut chip = fresh_chip();
        {
            let mut mcp = Mcp23s17::new(&mut chip, 0).unwrap();
            mcp.set_direction(2, Direction::Output).unwrap();
        }
        assert_eq!(chip.registers[0x00], 0xFF & !0b100);
        assert_eq!(chip.registers[0x01], 0xFF);
    }

    #[test]
    fn read_pin_masks_gpio_register() {
        let mut chip = fresh_chip();
        chip.registers[0x12] = 0b0000_0100;
        chip.registers[0x13] = 0b1000_0000;
        let mut mcp = Mcp23s17::new(&mut chip, 0).unwrap();
        assert_eq!(mcp.read_pin(2).unwrap(), Level::High);
        assert_eq!(mcp.read_pin(3).unwrap(), Level::Low);
        assert_eq!(mcp.read_pin(15).unwrap(), Level::High);
        assert_eq!(mcp.read_pin(8).unwrap(), Level::Low);
    }

    #[test]
    fn write_pin_updates_latch_without_touching_other_bits() {
        let mut chip = fresh_chip();
        chip.registers[0x14] = 0b0000_0001;
        {
            let mut mcp = Mcp23s17::new(&mut chip, 0).unwrap();
            mcp.write_pin(2, Level::High).unwrap();
            mcp.write_pin(0, Level::Low).unwrap();
            mcp.write_pin(8, Level::High).unwrap();
        }
        assert_eq!(chip.registers[0x14], 0b0000_0100);
        assert_eq!(chip.registers[0x15], 0b0000_0001);
    }

    #[test]
    fn pin_beyond_port_b_is_unknown_line() {
        let mut chip = fresh_chip();
        let mut mcp = Mcp23s17::new(&mut chip, 0).unwrap();
        assert!(matches!(
            mcp.read_pin(16),
            Err(PlatformError::UnknownLine(LineAddress(116)))
        ));
    }

    #[test]
    fn bus_failure_propagates() {
        let mut chip = fresh_chip();
        chip.fail = true;
        assert!(matches!(
            Mcp23s17::new(&mut chip, 0),
            Err(PlatformError::Bus(_))
        ));
    }
}
