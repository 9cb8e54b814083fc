//! Bit-banged I²C master on top of a LiteX `I2CMaster` style CSR pair
//!
//! The write CSR carries the clock line (SCL) and the output enable of the
//! data line (OE); the data output value itself stays 0, so enabling the
//! output pulls SDA low and disabling it lets the pull-up take over
//! (open-drain). Bit 0 of the read CSR is the sampled SDA level.
//!
//! Layers:
//! - `SignalDriver`: shadow copy of the write CSR, one line change per
//!   commit, followed by a settle delay
//! - `BitTransfer`: bytes MSB first with the ACK/NACK on the 9th clock
//! - `I2cBus`: start/stop framing and register transactions
//!
//! SDA only changes while SCL is low, except for START (SDA falling with
//! SCL high) and STOP (SDA rising with SCL high).

mod hardware;
mod low_level;
mod operations;
mod signal;

#[cfg(test)]
pub(crate) mod sim;

pub use self::hardware::{
	Registers,
	SETTLE_DELAY,
	reliable_sleep,
};

pub use self::low_level::BitTransfer;

pub use self::operations::{
	AckLog,
	I2C_R,
	I2C_W,
	I2cBus,
	Phase,
	Readout,
};

pub use self::signal::{
	BusState,
	ControlLayout,
	SignalDriver,
};
