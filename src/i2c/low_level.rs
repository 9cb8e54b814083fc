use super::hardware::Registers;
use super::signal::SignalDriver;

/// Byte level transfers on top of the line primitives.
///
/// Data only changes while the clock is low; the receiver samples while it is
/// high. Clock stretching by the slave is not supported.
pub trait BitTransfer {
	/// send 8 bits (MSB first) and return whether the slave ACKed on the 9th
	/// clock
	fn transmit_byte(&mut self, value: u8) -> bool;

	/// read 8 bits (MSB first), then ACK (`send_ack`) or NACK on the 9th clock
	fn receive_byte(&mut self, send_ack: bool) -> u8;
}

impl<R: Registers> SignalDriver<R> {
	fn set_data(&mut self, high: bool) {
		if high {
			self.release_data();
		} else {
			self.drive_data_low();
		}
	}

	fn pulse_clock(&mut self) {
		self.clock_high();
		self.clock_low();
	}
}

impl<R: Registers> BitTransfer for SignalDriver<R> {
	fn transmit_byte(&mut self, value: u8) -> bool {
		debug_assert!(!self.state().clock_high, "transmit must start with SCL low");
		let mut dat = value;
		for _ in 0..8 {
			self.set_data(0 != dat & 0x80);
			self.pulse_clock();
			dat <<= 1;
		}

		// slave pulls SDA low for ACK
		self.release_data();
		self.clock_high();
		let ack = !self.sample_data();
		self.clock_low();

		trace!("tx 0x{:02x} {}", value, if ack { "ACK" } else { "NACK" });
		ack
	}

	fn receive_byte(&mut self, send_ack: bool) -> u8 {
		debug_assert!(!self.state().clock_high, "receive must start with SCL low");
		if self.state().data_driven {
			self.release_data();
		}

		let mut dat = 0u8;
		for _ in 0..8 {
			dat <<= 1;
			self.clock_high();
			if self.sample_data() {
				dat |= 1;
			}
			self.clock_low();
		}

		self.set_data(!send_ack);
		self.pulse_clock();
		self.release_data();

		trace!("rx 0x{:02x} {}", dat, if send_ack { "ACK" } else { "NACK" });
		dat
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use super::BitTransfer;
	use crate::i2c::sim::{
		Event,
		SimBus,
		SimSlave,
	};
	use crate::i2c::{
		ControlLayout,
		SignalDriver,
	};

	fn started(sim: &mut SimBus) -> SignalDriver<&mut SimBus> {
		let mut driver = SignalDriver::new(sim, ControlLayout::default(), Duration::from_secs(0));
		driver.clock_high();
		driver.drive_data_low();
		driver.clock_low();
		driver
	}

	#[test]
	fn transmit_msb_first_with_ack_clock() {
		let mut sim = SimBus::new();
		let ack = {
			let mut driver = started(&mut sim);
			driver.transmit_byte(0xAD)
		};
		assert!(!ack, "nobody is listening");
		assert_eq!(sim.rising_edges(), &[true, false, true, false, true, true, false, true, true]);
		assert_eq!(sim.events(), &[Event::Start, Event::Byte { value: 0xAD, ack: false }]);
	}

	#[test]
	fn transmit_sees_slave_ack() {
		let mut sim = SimBus::new();
		sim.add_slave(SimSlave::new(0x55));
		let ack = {
			let mut driver = started(&mut sim);
			driver.transmit_byte(0x55 << 1)
		};
		assert!(ack);
		assert_eq!(sim.rising_edges().len(), 9);
		assert_eq!(*sim.rising_edges().last().unwrap(), false);
	}

	#[test]
	fn transmit_sees_slave_nack() {
		let mut sim = SimBus::new();
		let mut slave = SimSlave::new(0x55);
		slave.nack_byte(0);
		sim.add_slave(slave);
		let ack = {
			let mut driver = started(&mut sim);
			driver.transmit_byte(0x55 << 1)
		};
		assert!(!ack);
	}

	#[test]
	fn receive_acks_as_requested() {
		let mut sim = SimBus::new();
		let mut slave = SimSlave::new(0x55);
		slave.registers[0] = 0xA5;
		slave.registers[1] = 0x3C;
		sim.add_slave(slave);
		let (first, second, state) = {
			let mut driver = started(&mut sim);
			assert!(driver.transmit_byte(0x55 << 1 | 1));
			let first = driver.receive_byte(true);
			let second = driver.receive_byte(false);
			(first, second, driver.state())
		};
		assert_eq!(first, 0xA5);
		assert_eq!(second, 0x3C);
		assert!(!state.clock_high && !state.data_driven);
		assert_eq!(sim.events()[2..], [
			Event::Byte { value: 0xA5, ack: true },
			Event::Byte { value: 0x3C, ack: false },
		]);
	}
}
