use std::fmt;
use std::time::Duration;

use super::hardware::{
	Registers,
	reliable_sleep,
};

/// Bit positions inside the control word.
///
/// The defaults match the LiteX `I2CMaster` bitbang CSR (`scl`, `oe`, `sda`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ControlLayout {
	pub clock: u8,
	pub output_enable: u8,
	// output value of the data line; kept 0 so enabling the output pulls low
	pub data: u8,
}

impl ControlLayout {
	/// all three bits inside the 32-bit word and pairwise distinct
	pub fn is_valid(&self) -> bool {
		self.clock < 32 && self.output_enable < 32 && self.data < 32
			&& self.clock != self.output_enable
			&& self.clock != self.data
			&& self.output_enable != self.data
	}

	fn clock_mask(&self) -> u32 {
		1u32 << self.clock
	}

	fn output_enable_mask(&self) -> u32 {
		1u32 << self.output_enable
	}

	fn data_mask(&self) -> u32 {
		1u32 << self.data
	}
}

impl Default for ControlLayout {
	fn default() -> Self {
		ControlLayout {
			clock: 0,
			output_enable: 1,
			data: 2,
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BusState {
	pub clock_high: bool,
	// true: actively pulled low; false: released, pull-up makes it high
	pub data_driven: bool,
	pub shadow_word: u32,
}

impl BusState {
	pub fn is_idle(&self) -> bool {
		self.clock_high && !self.data_driven
	}
}

impl fmt::Display for BusState {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f,
			"SCL={} SDA={} (0x{:08x})",
			if self.clock_high { 1 } else { 0 },
			if self.data_driven { "0" } else { "Z" },
			self.shadow_word,
		)
	}
}

/// Owns the shadow copy of the control word.
///
/// Every mutator changes one line, commits the whole word and then waits for
/// the settle delay, so the next transition never overtakes the previous one
/// on the wire.
pub struct SignalDriver<R: Registers> {
	registers: R,
	layout: ControlLayout,
	settle: Duration,
	state: BusState,
}

impl<R: Registers> SignalDriver<R> {
	/// Take over the lines and put the bus into idle state (clock high, data
	/// released).
	pub fn new(registers: R, layout: ControlLayout, settle: Duration) -> Self {
		assert!(layout.is_valid(), "invalid control word layout {:?}", layout);

		let mut driver = SignalDriver {
			registers,
			layout,
			settle,
			state: BusState {
				clock_high: true,
				data_driven: false,
				shadow_word: layout.clock_mask(),
			},
		};
		driver.commit();
		driver
	}

	pub fn state(&self) -> BusState {
		self.state
	}

	fn commit(&mut self) {
		let word = self.state.shadow_word & !self.layout.data_mask();
		trace!("commit {}", self.state);
		self.registers.write_control_word(word);
		reliable_sleep(self.settle);
	}

	fn update(&mut self, mask: u32, set: bool) {
		if set {
			self.state.shadow_word |= mask;
		} else {
			self.state.shadow_word &= !mask;
		}
		self.state.clock_high = 0 != self.state.shadow_word & self.layout.clock_mask();
		self.state.data_driven = 0 != self.state.shadow_word & self.layout.output_enable_mask();
		self.commit();
	}

	/// let the data line float high
	pub fn release_data(&mut self) {
		let mask = self.layout.output_enable_mask();
		self.update(mask, false);
	}

	/// actively pull the data line low
	pub fn drive_data_low(&mut self) {
		let mask = self.layout.output_enable_mask();
		self.update(mask, true);
	}

	pub fn clock_high(&mut self) {
		let mask = self.layout.clock_mask();
		self.update(mask, true);
	}

	pub fn clock_low(&mut self) {
		let mask = self.layout.clock_mask();
		self.update(mask, false);
	}

	/// level of the data line as seen by the status register; no delay
	pub fn sample_data(&mut self) -> bool {
		let status = self.registers.read_status_word();
		trace!("sample 0x{:08x}", status);
		0 != status & 0x1
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use super::{
		ControlLayout,
		SignalDriver,
	};
	use crate::i2c::sim::SimBus;

	#[test]
	fn init_is_idle() {
		let mut sim = SimBus::new();
		let driver = SignalDriver::new(&mut sim, ControlLayout::default(), Duration::from_secs(0));
		assert!(driver.state().is_idle());
		assert_eq!(driver.state().shadow_word, 0b001);
		drop(driver);
		assert_eq!(sim.control_words(), &[0b001]);
		assert!(sim.scl() && sim.sda());
	}

	#[test]
	fn every_mutator_commits_whole_word() {
		let mut sim = SimBus::new();
		{
			let mut driver = SignalDriver::new(&mut sim, ControlLayout::default(), Duration::from_secs(0));
			driver.clock_low();
			driver.drive_data_low();
			assert!(!driver.sample_data());
			driver.clock_high();
			driver.release_data();
			assert!(driver.sample_data());
			assert!(driver.state().is_idle());
		}
		assert_eq!(sim.control_words(), &[0b001, 0b000, 0b010, 0b011, 0b001]);
	}

	#[test]
	fn custom_layout_keeps_data_bit_clear() {
		let layout = ControlLayout {
			clock: 4,
			output_enable: 7,
			data: 0,
		};
		let mut sim = SimBus::with_layout(layout);
		{
			let mut driver = SignalDriver::new(&mut sim, layout, Duration::from_secs(0));
			driver.drive_data_low();
			assert_eq!(driver.state().shadow_word, 0x90);
		}
		assert_eq!(sim.control_words(), &[0x10, 0x90]);
	}

	#[test]
	fn layout_bits_must_be_distinct() {
		assert!(ControlLayout::default().is_valid());
		assert!(ControlLayout { clock: 31, output_enable: 7, data: 0 }.is_valid());

		assert!(!ControlLayout { clock: 0, output_enable: 0, data: 2 }.is_valid());
		assert!(!ControlLayout { clock: 0, output_enable: 1, data: 0 }.is_valid());
		assert!(!ControlLayout { clock: 0, output_enable: 1, data: 1 }.is_valid());
		assert!(!ControlLayout { clock: 32, output_enable: 1, data: 2 }.is_valid());
	}

	#[test]
	#[should_panic]
	fn data_bit_sharing_clock_bit_is_rejected() {
		let layout = ControlLayout {
			clock: 0,
			output_enable: 1,
			data: 0,
		};
		let mut sim = SimBus::new();
		SignalDriver::new(&mut sim, layout, Duration::from_secs(0));
	}
}
