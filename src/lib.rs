#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

macro_rules! with_context {
	(( $fmt:tt $($t:tt)* ), $e:expr) => {{
		use failure::Error;

		match (|| { $e })() {
			Ok(v) => Ok(v),
			Err(e) => {
				let e: Error = e;
				let msg = format!(concat!($fmt, ": {}") $($t)*, e);
				Err(Error::from(e.context(msg)))
			}
		}
	}};

	($msg:expr, $e:expr) => {
		with_context!(("{}", $msg), $e)
	};
}

pub type AResult<T> = Result<T, failure::Error>;

pub mod csr;
pub mod i2c;
pub mod number;
pub mod si570;

/// Map the CSR window and run `f` on a fresh bus session.
///
/// The bus is put into idle state before `f` runs; the mapping is released
/// when `f` returns.
pub fn with_bus<F, R>(config: &csr::CsrConfig, layout: i2c::ControlLayout, f: F) -> AResult<R>
where
	F: FnOnce(&mut i2c::I2cBus<csr::CsrRegisters>) -> AResult<R>,
{
	let registers = csr::open_registers(config)?;
	let mut bus = i2c::I2cBus::new(registers, layout, config.settle);
	f(&mut bus)
}
