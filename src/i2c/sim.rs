//! Simulated open-drain bus for tests.
//!
//! The bus decodes every committed control word into SCL/SDA edges; slaves
//! react to the edges like a real register device would, and a sniffer
//! records what went over the wire.

use super::hardware::Registers;
use super::signal::ControlLayout;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
	Start,
	Stop,
	/// 8 data bits plus the level of the 9th clock (low: ack)
	Byte { value: u8, ack: bool },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum SlaveState {
	Idle,
	// not addressed; wait for next start
	Ignore,
	Receive { value: u8, bits: u8 },
	// 9th clock of a byte we received
	Ack { read: bool },
	Transmit { value: u8, sent: u8 },
	// 9th clock of a byte we sent
	MasterAck { ack: bool },
}

/// Register device with an auto-incrementing register pointer.
pub struct SimSlave {
	pub address: u8,
	pub registers: [u8; 256],
	pointer: u8,
	nack: Vec<usize>,
	state: SlaveState,
	byte_index: usize,
	drive_low: bool,
}

impl SimSlave {
	pub fn new(address: u8) -> Self {
		SimSlave {
			address,
			registers: [0u8; 256],
			pointer: 0,
			nack: Vec::new(),
			state: SlaveState::Idle,
			byte_index: 0,
			drive_low: false,
		}
	}

	/// NACK (but still process) byte `index` after each start; the address
	/// byte is index 0
	pub fn nack_byte(&mut self, index: usize) {
		self.nack.push(index);
	}

	fn on_start(&mut self) {
		self.state = SlaveState::Receive { value: 0, bits: 0 };
		self.byte_index = 0;
		self.drive_low = false;
	}

	fn on_stop(&mut self) {
		self.state = SlaveState::Idle;
		self.drive_low = false;
	}

	fn on_rise(&mut self, sda: bool) {
		match self.state {
			SlaveState::Receive { value, bits } if bits < 8 => {
				self.state = SlaveState::Receive {
					value: value << 1 | if sda { 1 } else { 0 },
					bits: bits + 1,
				};
			},
			SlaveState::MasterAck { .. } => {
				self.state = SlaveState::MasterAck { ack: !sda };
			},
			_ => (),
		}
	}

	fn load_next(&mut self) {
		let value = self.registers[self.pointer as usize];
		self.pointer = self.pointer.wrapping_add(1);
		self.state = SlaveState::Transmit { value, sent: 0 };
		self.drive_low = 0 == value & 0x80;
	}

	fn on_fall(&mut self) {
		match self.state {
			SlaveState::Receive { value, bits: 8 } => {
				let index = self.byte_index;
				self.byte_index += 1;
				let read = if index == 0 {
					if value >> 1 != self.address {
						self.state = SlaveState::Ignore;
						self.drive_low = false;
						return;
					}
					0 != value & 1
				} else if index == 1 {
					self.pointer = value;
					false
				} else {
					self.registers[self.pointer as usize] = value;
					self.pointer = self.pointer.wrapping_add(1);
					false
				};
				self.state = SlaveState::Ack { read };
				self.drive_low = !self.nack.contains(&index);
			},
			SlaveState::Ack { read: true } => {
				self.load_next();
			},
			SlaveState::Ack { read: false } => {
				self.state = SlaveState::Receive { value: 0, bits: 0 };
				self.drive_low = false;
			},
			SlaveState::Transmit { value, sent } => {
				let sent = sent + 1;
				if sent == 8 {
					self.state = SlaveState::MasterAck { ack: false };
					self.drive_low = false;
				} else {
					self.state = SlaveState::Transmit { value, sent };
					self.drive_low = 0 == value & (0x80 >> sent);
				}
			},
			SlaveState::MasterAck { ack: true } => {
				self.load_next();
			},
			SlaveState::MasterAck { ack: false } => {
				self.state = SlaveState::Ignore;
				self.drive_low = false;
			},
			_ => (),
		}
	}
}

pub struct SimBus {
	layout: ControlLayout,
	scl: bool,
	master_low: bool,
	slaves: Vec<SimSlave>,
	control_words: Vec<u32>,
	rising_edges: Vec<bool>,
	events: Vec<Event>,
	sniffed: Vec<bool>,
}

impl SimBus {
	pub fn new() -> Self {
		SimBus::with_layout(ControlLayout::default())
	}

	pub fn with_layout(layout: ControlLayout) -> Self {
		SimBus {
			layout,
			scl: true,
			master_low: false,
			slaves: Vec::new(),
			control_words: Vec::new(),
			rising_edges: Vec::new(),
			events: Vec::new(),
			sniffed: Vec::new(),
		}
	}

	pub fn add_slave(&mut self, slave: SimSlave) {
		self.slaves.push(slave);
	}

	pub fn slave(&self, index: usize) -> &SimSlave {
		&self.slaves[index]
	}

	pub fn scl(&self) -> bool {
		self.scl
	}

	/// wired-AND of everybody on the line
	pub fn sda(&self) -> bool {
		!self.master_low && !self.slaves.iter().any(|s| s.drive_low)
	}

	pub fn control_words(&self) -> &[u32] {
		&self.control_words
	}

	/// SDA level at every rising SCL edge
	pub fn rising_edges(&self) -> &[bool] {
		&self.rising_edges
	}

	pub fn events(&self) -> &[Event] {
		&self.events
	}

	fn framing(&mut self, event: Event) {
		self.sniffed.clear();
		self.events.push(event);
		for slave in &mut self.slaves {
			match event {
				Event::Start => slave.on_start(),
				_ => slave.on_stop(),
			}
		}
	}

	fn rise(&mut self) {
		let sda = self.sda();
		self.rising_edges.push(sda);
		self.sniffed.push(sda);
		if self.sniffed.len() == 9 {
			let value = self.sniffed[..8].iter().fold(0u8, |v, &b| v << 1 | if b { 1 } else { 0 });
			let ack = !self.sniffed[8];
			self.sniffed.clear();
			self.events.push(Event::Byte { value, ack });
		}
		for slave in &mut self.slaves {
			slave.on_rise(sda);
		}
	}
}

impl Registers for SimBus {
	fn write_control_word(&mut self, value: u32) {
		self.control_words.push(value);
		assert_eq!(value & (1 << self.layout.data), 0, "data output must stay low");

		let scl = 0 != value & (1 << self.layout.clock);
		let master_low = 0 != value & (1 << self.layout.output_enable);
		let prev_scl = self.scl;
		let prev_sda = self.sda();

		self.master_low = master_low;
		self.scl = scl;

		match (prev_scl, scl) {
			(true, true) => {
				let sda = self.sda();
				if prev_sda && !sda {
					self.framing(Event::Start);
				} else if !prev_sda && sda {
					self.framing(Event::Stop);
				}
			},
			(false, true) => self.rise(),
			(true, false) => {
				for slave in &mut self.slaves {
					slave.on_fall();
				}
			},
			(false, false) => (),
		}
	}

	fn read_status_word(&mut self) -> u32 {
		if self.sda() { 1 } else { 0 }
	}
}
