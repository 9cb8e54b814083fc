//! Helpers for the Si570 programmable XO
//!
//! Frequency is set by 6 registers starting at 7 (or 13 on the 7ppm
//! variants): HS_DIV (3 bits), N1 (7 bits), RFFREQ (38 bits, 28 of them
//! fractional). The chip reverts a frozen DCO to the previous settings if the
//! update doesn't complete within 10ms, so each step below is one short I²C
//! transaction.

use std::fmt;
use std::str;

use crate::i2c::{
	I2cBus,
	Registers,
};

pub const SLAVE_ADDRESS: u8 = 0x55;
pub const FREQUENCY_REGISTER: u8 = 0x0D;
pub const CTRL_REG: u8 = 135;
pub const FREEZE_DCO_REG: u8 = 137;
pub const SI570_FREEZE_DCO: u8 = 1 << 4;
pub const SI570_NEW_FREQ: u8 = 1 << 6;

/// setup byte sequences used for bring-up
pub const SETUP_DEFAULT: [u8; 6] = [0xad, 0x42, 0xa8, 0xb2, 0x60, 0x6c];
pub const SETUP_ALTERNATE: [u8; 6] = [0xa0, 0xc2, 0xf4, 0x54, 0x6b, 0x22];

const HS_DIVS_LOOKUP: [Option<u32>; 8] = [Some(4), Some(5), Some(6), Some(7), None, Some(9), None, Some(11)];
const FDCO_MIN: f64 = 4.85e9;
const FDCO_MAX: f64 = 5.67e9;
const RFFREQ_SCALE: f64 = (1u64 << 28) as f64;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Si570Registers(pub [u8; 6]);

impl Si570Registers {
	/// DCO high speed divider; None for the reserved codes
	pub fn hs_div(&self) -> Option<u32> {
		HS_DIVS_LOOKUP[(self.0[0] >> 5) as usize]
	}

	pub fn set_hs_div(&mut self, value: u32) -> crate::AResult<()> {
		let index = match HS_DIVS_LOOKUP.iter().position(|&d| d == Some(value)) {
			Some(i) => i as u8,
			None => bail!("invalid HS_DIV: {}", value),
		};
		self.0[0] = (self.0[0] & 0x1f) | (index << 5);
		Ok(())
	}

	/// CLKOUT output divider
	pub fn n1(&self) -> u32 {
		let mut n1 = ((self.0[0] & 0x1f) as u32) << 2 | (self.0[1] >> 6) as u32;
		n1 += 1;
		// illegal odd dividers are rounded up by the chip
		if n1 > 1 && n1 & 1 != 0 {
			warn!("Illegal N1: {}, rounding up to {}", n1, n1 + 1);
			n1 += 1;
		}
		n1
	}

	pub fn set_n1(&mut self, value: u32) -> crate::AResult<()> {
		ensure!(value >= 1 && value <= 128, "invalid N1: {}", value);
		let v = (value - 1) as u8;
		self.0[0] = (self.0[0] & 0xe0) | ((v >> 2) & 0x1f);
		self.0[1] = (self.0[1] & 0x3f) | ((v << 6) & 0xc0);
		Ok(())
	}

	pub fn rffreq_raw(&self) -> u64 {
		((self.0[1] & 0x3f) as u64) << 32
			| (self.0[2] as u64) << 24
			| (self.0[3] as u64) << 16
			| (self.0[4] as u64) << 8
			| self.0[5] as u64
	}

	/// reference frequency multiplier of the DCO
	pub fn rffreq(&self) -> f64 {
		self.rffreq_raw() as f64 / RFFREQ_SCALE
	}

	pub fn set_rffreq(&mut self, value: f64) -> crate::AResult<()> {
		ensure!(value >= 0.0 && value < 1024.0, "RFFREQ out of range: {}", value);
		let raw = (value * RFFREQ_SCALE) as u64;
		self.0[1] = (self.0[1] & 0xc0) | ((raw >> 32) as u8 & 0x3f);
		self.0[2] = (raw >> 24) as u8;
		self.0[3] = (raw >> 16) as u8;
		self.0[4] = (raw >> 8) as u8;
		self.0[5] = raw as u8;
		Ok(())
	}

	/// internal crystal frequency, given the output frequency `f0` the
	/// registers currently produce
	pub fn fxtal(&self, f0: f64) -> crate::AResult<f64> {
		let hs_div = self.hs_div().ok_or_else(|| format_err!("reserved HS_DIV code in {:?}", self))?;
		let rffreq = self.rffreq();
		ensure!(rffreq > 0.0, "RFFREQ is zero in {:?}", self);
		Ok(f0 * hs_div as f64 * self.n1() as f64 / rffreq)
	}
}

impl fmt::Display for Si570Registers {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.hs_div() {
			Some(hs_div) => write!(f, "HS_DIV:{:2}, N1:{:2}, RFFREQ:{:13.9}", hs_div, self.n1(), self.rffreq()),
			None => write!(f, "HS_DIV: ?, N1:{:2}, RFFREQ:{:13.9}", self.n1(), self.rffreq()),
		}
	}
}

impl fmt::Debug for Si570Registers {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "w")?;
		for b in self.0.iter() {
			write!(f, " {:02X}", b)?;
		}
		Ok(())
	}
}

/// Parses lines like `r 01 C2 BC 81 83 02`; the first token is ignored.
impl str::FromStr for Si570Registers {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut regs = [0u8; 6];
		let mut tokens = s.split_whitespace().skip(1);
		for r in regs.iter_mut() {
			let token = tokens.next().ok_or_else(|| format_err!("expected 6 register values: {:?}", s))?;
			*r = with_context!(("invalid register value {:?}", token),
				u8::from_str_radix(token, 16).map_err(|e| e.into())
			)?;
		}
		ensure!(tokens.next().is_none(), "expected 6 register values: {:?}", s);
		Ok(Si570Registers(regs))
	}
}

/// First (HS_DIV, N1, f_DCO) with the DCO in range for output frequency `f1`;
/// prefers the biggest HS_DIV.
pub fn dividers(f1: f64) -> crate::AResult<(u32, u32, f64)> {
	const HS_DIVS: [u32; 6] = [11, 9, 7, 6, 5, 4];
	let ns = ::std::iter::once(1).chain((2..130).step_by(2));

	for &h in HS_DIVS.iter() {
		for n in ns.clone() {
			let fdco = f1 * h as f64 * n as f64;
			if fdco > FDCO_MAX {
				break;
			}
			if fdco >= FDCO_MIN {
				return Ok((h, n, fdco));
			}
		}
	}
	bail!("Could not find a good combination of clock dividers for {} Hz", f1);
}

/// Registers producing `f1`, given registers `current` producing `f0`.
pub fn calc_frequency(current: &Si570Registers, f0: f64, f1: f64) -> crate::AResult<Si570Registers> {
	let fxtal = current.fxtal(f0)?;
	debug!("{:?} --> {} f_xtal: {:.6} MHz", current, current, fxtal / 1.0e6);

	let (hs_div, n1, fdco) = dividers(f1)?;
	let mut regs = Si570Registers::default();
	regs.set_hs_div(hs_div)?;
	regs.set_n1(n1)?;
	regs.set_rffreq(fdco / fxtal)?;
	Ok(regs)
}

pub fn read_frequency<R: Registers>(bus: &mut I2cBus<R>) -> (Si570Registers, bool) {
	let (data, success) = bus.read_registers(SLAVE_ADDRESS, FREQUENCY_REGISTER, 6);
	let mut regs = [0u8; 6];
	regs.copy_from_slice(&data);
	(Si570Registers(regs), success)
}

/// Freeze the DCO, write the frequency registers, unfreeze and apply.
///
/// All four steps are always issued; returns whether every byte was ACKed.
pub fn write_frequency<R: Registers>(bus: &mut I2cBus<R>, regs: &Si570Registers) -> bool {
	info!("Si570: programming {:?} ({})", regs, regs);
	let mut ret = true;
	ret &= bus.write_register(SLAVE_ADDRESS, FREEZE_DCO_REG, SI570_FREEZE_DCO);
	ret &= bus.write_registers(SLAVE_ADDRESS, FREQUENCY_REGISTER, &regs.0);
	ret &= bus.write_register(SLAVE_ADDRESS, FREEZE_DCO_REG, 0);
	ret &= bus.write_register(SLAVE_ADDRESS, CTRL_REG, SI570_NEW_FREQ);
	if !ret {
		warn!("Si570: not all bytes were acknowledged");
	}
	ret
}
