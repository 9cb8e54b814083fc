use std::fmt;
use std::str;

/// Unsigned parameter, decimal or hex with `0x` prefix.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Number(pub u64);

impl Number {
	pub fn to_u8(self) -> crate::AResult<u8> {
		ensure!(self.0 <= 0xff, "{} doesn't fit into a byte", self);
		Ok(self.0 as u8)
	}

	/// 7-bit I²C slave address
	pub fn to_slave_address(self) -> crate::AResult<u8> {
		ensure!(self.0 < 0x80, "{} is not a 7-bit slave address", self);
		Ok(self.0 as u8)
	}

	pub fn to_usize(self) -> crate::AResult<usize> {
		ensure!(self.0 <= !0usize as u64, "{} is too big", self);
		Ok(self.0 as usize)
	}
}

impl fmt::Display for Number {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:x}", self.0)
	}
}

impl str::FromStr for Number {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let s = s.trim();
		let (digits, radix) = if s.starts_with("0x") || s.starts_with("0X") {
			(&s[2..], 16)
		} else {
			(s, 10)
		};
		ensure!(!digits.is_empty(), "empty number: {:?}", s);
		ensure!(!digits.starts_with('+') && !digits.starts_with('-'), "signed number: {:?}", s);
		let n = with_context!(("invalid number: {:?}", s),
			u64::from_str_radix(digits, radix).map_err(|e| e.into())
		)?;
		Ok(Number(n))
	}
}
