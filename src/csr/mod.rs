//! LiteX CSR window mapped from `/dev/mem`
//!
//! The CSR bus of the gateware is bridged to AXI at a fixed physical address
//! (`MEM_OFFSET`); each CSR occupies one 32-bit little endian word.

use std::io;
use std::time::Duration;

use crate::i2c::{
	Registers,
	SETTLE_DELAY,
};

mod mapped;

pub use self::mapped::Mapped;

/// must match `base_address` of the AXI to wishbone bridge
pub const MEM_OFFSET: u64 = 0x4000_0000;
pub const DEFAULT_WINDOW: usize = 0x1_0000;
pub const DEFAULT_DEVMEM: &str = "/dev/mem";

#[derive(Debug, Fail)]
pub enum MapError {
	#[fail(display = "couldn't open {}: {}", path, error)]
	Open {
		path: String,
		#[fail(cause)] error: io::Error,
	},
	#[fail(display = "couldn't map 0x{:x} bytes at 0x{:08x} from {}: {}", len, base, path, error)]
	Map {
		path: String,
		base: u64,
		len: usize,
		#[fail(cause)] error: io::Error,
	},
	#[fail(display = "CSR offset 0x{:x} outside of mapped window (0x{:x} bytes)", offset, len)]
	OutOfRange {
		offset: usize,
		len: usize,
	},
}

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CsrConfig {
	pub devmem: String,
	pub base: u64,
	pub size: usize,
	/// byte offset of the I2C write CSR (SCL, OE, SDA) in the window
	pub control: usize,
	/// byte offset of the I2C read CSR (SDA in bit 0)
	pub status: usize,
	pub settle: Duration,
}

impl CsrConfig {
	pub fn new(control: usize, status: usize) -> Self {
		CsrConfig {
			devmem: DEFAULT_DEVMEM.into(),
			base: MEM_OFFSET,
			size: DEFAULT_WINDOW,
			control,
			status,
			settle: SETTLE_DELAY,
		}
	}

	fn check_offset(&self, offset: usize) -> Result<(), MapError> {
		if offset & 3 != 0 || offset.checked_add(4).map_or(true, |end| end > self.size) {
			return Err(MapError::OutOfRange { offset, len: self.size });
		}
		Ok(())
	}
}

/// The I2C write/read CSR pair inside a mapped window.
pub struct CsrRegisters {
	window: Mapped,
	control: usize,
	status: usize,
}

impl Registers for CsrRegisters {
	fn write_control_word(&mut self, value: u32) {
		self.window.write_word(self.control, value);
	}

	fn read_status_word(&mut self) -> u32 {
		self.window.read_word(self.status)
	}
}

pub fn open_window(config: &CsrConfig) -> Result<Mapped, MapError> {
	let file = mapped::open_device(&config.devmem).map_err(|error| MapError::Open {
		path: config.devmem.clone(),
		error,
	})?;
	mapped::map(file, config.base, config.size).map_err(|error| MapError::Map {
		path: config.devmem.clone(),
		base: config.base,
		len: config.size,
		error,
	})
}

pub fn open_registers(config: &CsrConfig) -> Result<CsrRegisters, MapError> {
	config.check_offset(config.control)?;
	config.check_offset(config.status)?;
	let window = open_window(config)?;
	debug!("mapped 0x{:x} bytes at 0x{:08x} from {}", window.len(), window.base(), config.devmem);
	Ok(CsrRegisters {
		window,
		control: config.control,
		status: config.status,
	})
}
