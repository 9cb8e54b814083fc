use std::fmt;
use std::io;
use std::time::Duration;

use super::hardware::Registers;
use super::low_level::BitTransfer;
use super::signal::{
	BusState,
	ControlLayout,
	SignalDriver,
};

pub const I2C_W: u8 = 0;
pub const I2C_R: u8 = 1;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Phase {
	/// slave address with write bit
	Address,
	/// register address byte
	Register,
	/// slave address with read bit after the repeated start
	ReadAddress,
	/// payload byte `n` of a write
	Data(usize),
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Phase::Address => write!(f, "address"),
			Phase::Register => write!(f, "register address"),
			Phase::ReadAddress => write!(f, "read address"),
			Phase::Data(n) => write!(f, "data byte {}", n),
		}
	}
}

/// Acknowledge bits of all bytes sent during one transaction.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct AckLog {
	acks: Vec<(Phase, bool)>,
}

impl AckLog {
	pub fn new() -> Self {
		AckLog::default()
	}

	pub fn push(&mut self, phase: Phase, ack: bool) {
		debug!("{}: {}", phase, if ack { "ACK" } else { "NACK" });
		self.acks.push((phase, ack));
	}

	pub fn acks(&self) -> &[(Phase, bool)] {
		&self.acks
	}

	/// all bytes were acknowledged
	pub fn success(&self) -> bool {
		self.acks.iter().all(|&(_, ack)| ack)
	}

	pub fn first_nack(&self) -> Option<Phase> {
		self.acks.iter().find(|&&(_, ack)| !ack).map(|&(phase, _)| phase)
	}
}

#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct Readout {
	pub data: Vec<u8>,
	/// acks of the address/register phase; data bytes are ACKed by us
	pub acks: AckLog,
}

impl Readout {
	pub fn success(&self) -> bool {
		self.acks.success()
	}
}

/// Register level transactions against 7-bit addressed slaves.
///
/// A NACK never aborts a transaction: every byte is still sent and the bus
/// is always brought back to idle with a stop condition. Callers check the
/// returned flags and repeat the whole transaction if needed.
///
/// Slaves like the Si570 drop a transaction that doesn't finish within ~10ms;
/// this can't be detected here.
pub struct I2cBus<R: Registers> {
	driver: SignalDriver<R>,
}

fn address_byte(slave_address: u8, direction: u8) -> u8 {
	assert!(slave_address < 0x80, "slave address 0x{:02x} exceeds 7 bits", slave_address);
	slave_address << 1 | direction
}

impl<R: Registers> I2cBus<R> {
	pub fn new(registers: R, layout: ControlLayout, settle: Duration) -> Self {
		I2cBus {
			driver: SignalDriver::new(registers, layout, settle),
		}
	}

	pub fn state(&self) -> BusState {
		self.driver.state()
	}

	/// SDA falling while SCL is high; also used as repeated start
	pub fn start(&mut self) {
		debug!("START");
		self.driver.clock_high();
		self.driver.drive_data_low();
		self.driver.clock_low();
	}

	/// SDA rising while SCL is high; leaves the bus idle
	pub fn stop(&mut self) {
		debug!("STOP");
		self.driver.drive_data_low();
		self.driver.clock_high();
		self.driver.release_data();
	}

	pub fn write_registers_acked(&mut self, slave_address: u8, register_address: u8, data: &[u8]) -> AckLog {
		let mut acks = AckLog::new();
		self.start();
		acks.push(Phase::Address, self.driver.transmit_byte(address_byte(slave_address, I2C_W)));
		acks.push(Phase::Register, self.driver.transmit_byte(register_address));
		for (n, &byte) in data.iter().enumerate() {
			acks.push(Phase::Data(n), self.driver.transmit_byte(byte));
		}
		self.stop();

		if let Some(phase) = acks.first_nack() {
			warn!("write 0x{:02x} @ {}: NACK on {}", slave_address, register_address, phase);
		}
		acks
	}

	/// Write `data` to consecutive registers starting at `register_address`.
	///
	/// Returns true if every byte (including address and register address)
	/// was acknowledged.
	pub fn write_registers(&mut self, slave_address: u8, register_address: u8, data: &[u8]) -> bool {
		self.write_registers_acked(slave_address, register_address, data).success()
	}

	pub fn write_register(&mut self, slave_address: u8, register_address: u8, value: u8) -> bool {
		self.write_registers(slave_address, register_address, &[value])
	}

	// start, address + register, repeated start, read address; bus is left
	// ready to receive data
	fn begin_read(&mut self, slave_address: u8, register_address: u8) -> AckLog {
		let mut acks = AckLog::new();
		self.start();
		acks.push(Phase::Address, self.driver.transmit_byte(address_byte(slave_address, I2C_W)));
		acks.push(Phase::Register, self.driver.transmit_byte(register_address));
		self.start();
		acks.push(Phase::ReadAddress, self.driver.transmit_byte(address_byte(slave_address, I2C_R)));
		acks
	}

	/// Read `count` registers starting at `register_address`.
	///
	/// Every byte but the last gets an ACK, the last a NACK.
	pub fn read_registers_acked(&mut self, slave_address: u8, register_address: u8, count: usize) -> Readout {
		let acks = self.begin_read(slave_address, register_address);
		let mut data = Vec::with_capacity(count);
		for i in 0..count {
			data.push(self.driver.receive_byte(i + 1 < count));
		}
		self.stop();

		if let Some(phase) = acks.first_nack() {
			warn!("read 0x{:02x} @ {}: NACK on {}", slave_address, register_address, phase);
		}
		Readout { data, acks }
	}

	pub fn read_registers(&mut self, slave_address: u8, register_address: u8, count: usize) -> (Vec<u8>, bool) {
		let readout = self.read_registers_acked(slave_address, register_address, count);
		let success = readout.success();
		(readout.data, success)
	}

	/// Probe all 7-bit addresses (0 to 127) with an empty write.
	pub fn scan(&mut self) -> Vec<u8> {
		let mut found = Vec::new();
		for address in 0..0x80u8 {
			self.start();
			let ack = self.driver.transmit_byte(address_byte(address, I2C_W));
			self.stop();
			if ack {
				info!("I2C scan: found 0x{:02x}", address);
				found.push(address);
			}
		}
		found
	}

	/// Read `count` registers and print them as hex while receiving.
	///
	/// For more than 16 bytes each line of 16 is prefixed with the register
	/// offset. Prints "I2C Error" and reads nothing if the slave doesn't
	/// respond.
	pub fn dump<W: io::Write>(&mut self, out: &mut W, slave_address: u8, register_address: u8, count: usize) -> crate::AResult<bool> {
		let acks = self.begin_read(slave_address, register_address);
		if !acks.success() {
			self.stop();
			writeln!(out, "I2C Error")?;
			return Ok(false);
		}

		let result = (|| -> crate::AResult<()> {
			for i in 0..count {
				if count > 16 && 0 == i % 16 {
					write!(out, "\n    {:04x}: ", i + register_address as usize)?;
				}
				write!(out, "{:02x} ", self.driver.receive_byte(i + 1 < count))?;
			}
			Ok(())
		})();
		self.stop();
		result?;
		out.flush()?;

		Ok(true)
	}

	/// Read `count` registers and write them unmodified as they arrive.
	pub fn read_ascii<W: io::Write>(&mut self, out: &mut W, slave_address: u8, register_address: u8, count: usize) -> crate::AResult<bool> {
		let acks = self.begin_read(slave_address, register_address);
		if let Some(phase) = acks.first_nack() {
			warn!("read 0x{:02x} @ {}: NACK on {}", slave_address, register_address, phase);
		}

		let result = (|| -> crate::AResult<()> {
			for i in 0..count {
				out.write_all(&[self.driver.receive_byte(i + 1 < count)])?;
			}
			Ok(())
		})();
		self.stop();
		result?;
		out.flush()?;

		Ok(acks.success())
	}
}
