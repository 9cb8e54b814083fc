#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate csr_i2c_bitbang;
use csr_i2c_bitbang::*;

use std::io::{
	self,
	Write,
};
use std::process::exit;
use std::time::Duration;

use csr_i2c_bitbang::number::Number;
use csr_i2c_bitbang::si570::Si570Registers;

type Bus = i2c::I2cBus<csr::CsrRegisters>;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_param_or<T>(matches: &clap::ArgMatches, name: &str, default: T) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	if matches.is_present(name) {
		get_param(matches, name)
	} else {
		Ok(default)
	}
}

fn get_bit(matches: &clap::ArgMatches, name: &str, default: u8) -> AResult<u8> {
	let bit = get_param_or(matches, name, Number(default as u64))?;
	ensure!(bit.0 < 32, "invalid parameter {}: bit {} outside of 32-bit word", name, bit.0);
	Ok(bit.0 as u8)
}

fn config_from(matches: &clap::ArgMatches) -> AResult<(csr::CsrConfig, i2c::ControlLayout)> {
	let control = get_param::<Number>(matches, "control")?.to_usize()?;
	let status = get_param::<Number>(matches, "status")?.to_usize()?;

	let mut config = csr::CsrConfig::new(control, status);
	if let Some(devmem) = matches.value_of("devmem") {
		config.devmem = devmem.into();
	}
	config.base = get_param_or(matches, "base", Number(config.base))?.0;
	config.size = get_param_or(matches, "size", Number(config.size as u64))?.to_usize()?;
	let settle_us = get_param_or(matches, "settle_us", Number(1))?.0;
	config.settle = Duration::from_micros(settle_us);

	let defaults = i2c::ControlLayout::default();
	let layout = i2c::ControlLayout {
		clock: get_bit(matches, "scl_bit", defaults.clock)?,
		output_enable: get_bit(matches, "oe_bit", defaults.output_enable)?,
		data: get_bit(matches, "sda_bit", defaults.data)?,
	};
	ensure!(layout.is_valid(), "SCL, OE and SDA must use different bits (got {}, {}, {})",
		layout.clock, layout.output_enable, layout.data);

	Ok((config, layout))
}

fn scan(bus: &mut Bus) -> AResult<bool> {
	let found = bus.scan();
	let mut line = String::from("I2C scan: [");
	for address in found {
		line += &format!("{:02x} ", address);
	}
	line += "]";
	println!("{}", line);
	Ok(true)
}

fn dump(bus: &mut Bus, sub_m: &clap::ArgMatches) -> AResult<bool> {
	let address = get_param::<Number>(sub_m, "ADDR")?.to_slave_address()?;
	let register = get_param::<Number>(sub_m, "REG")?.to_u8()?;
	let count = get_param::<Number>(sub_m, "COUNT")?.to_usize()?;

	let stdout = io::stdout();
	let mut out = stdout.lock();
	let ok = bus.dump(&mut out, address, register, count)?;
	writeln!(out)?;
	Ok(ok)
}

fn ascii(bus: &mut Bus, sub_m: &clap::ArgMatches) -> AResult<bool> {
	let address = get_param::<Number>(sub_m, "ADDR")?.to_slave_address()?;
	let register = get_param::<Number>(sub_m, "REG")?.to_u8()?;
	let count = get_param::<Number>(sub_m, "COUNT")?.to_usize()?;

	let stdout = io::stdout();
	let mut out = stdout.lock();
	let ok = bus.read_ascii(&mut out, address, register, count)?;
	Ok(ok)
}

fn read(bus: &mut Bus, sub_m: &clap::ArgMatches) -> AResult<bool> {
	let address = get_param::<Number>(sub_m, "ADDR")?.to_slave_address()?;
	let register = get_param::<Number>(sub_m, "REG")?.to_u8()?;
	let count = get_param::<Number>(sub_m, "COUNT")?.to_usize()?;

	let readout = bus.read_registers_acked(address, register, count);
	let hex: Vec<String> = readout.data.iter().map(|b| format!("{:02x}", b)).collect();
	println!("{}", hex.join(" "));
	if let Some(phase) = readout.acks.first_nack() {
		error!("Device 0x{:02x} didn't acknowledge {}", address, phase);
		return Ok(false);
	}
	Ok(true)
}

fn write(bus: &mut Bus, sub_m: &clap::ArgMatches) -> AResult<bool> {
	let address = get_param::<Number>(sub_m, "ADDR")?.to_slave_address()?;
	let register = get_param::<Number>(sub_m, "REG")?.to_u8()?;
	let mut data = Vec::new();
	for value in sub_m.values_of("BYTES").into_iter().flatten() {
		let byte = value.parse::<Number>()
			.and_then(Number::to_u8)
			.map_err(|e| format_err!("invalid byte {:?}: {}", value, e))?;
		data.push(byte);
	}

	let acks = bus.write_registers_acked(address, register, &data);
	if let Some(phase) = acks.first_nack() {
		error!("Device 0x{:02x} didn't acknowledge {}", address, phase);
		return Ok(false);
	}
	Ok(true)
}

fn si570_setup(bus: &mut Bus, sub_m: &clap::ArgMatches) -> AResult<bool> {
	let regs = if sub_m.is_present("alternate") {
		Si570Registers(si570::SETUP_ALTERNATE)
	} else {
		Si570Registers(si570::SETUP_DEFAULT)
	};

	println!("\nSi570 setup ...");
	if !si570::write_frequency(bus, &regs) {
		bail!("Si570 setup failed: device didn't acknowledge");
	}
	println!("Done!");
	Ok(true)
}

fn si570_info(bus: &mut Bus) -> AResult<bool> {
	let (regs, ok) = si570::read_frequency(bus);
	ensure!(ok, "Si570 didn't acknowledge");
	println!("{:?}  {}", regs, regs);
	Ok(true)
}

fn si570_freq(bus: &mut Bus, sub_m: &clap::ArgMatches) -> AResult<bool> {
	let f1: f64 = get_param(sub_m, "F1")?;
	let f0: f64 = get_param_or(sub_m, "f0", 156.25e6)?;

	let (current, ok) = si570::read_frequency(bus);
	ensure!(ok, "Si570 didn't acknowledge");
	let fxtal = current.fxtal(f0)?;
	println!("{:>24} --> {:<40} f_xtal: {:.6} MHz", format!("{:?}", current), current.to_string(), fxtal / 1.0e6);

	let regs = si570::calc_frequency(&current, f0, f1)?;
	println!("{:>24} --> {}", format!("{:?}", regs), regs);
	if !si570::write_frequency(bus, &regs) {
		bail!("Si570 programming failed: device didn't acknowledge");
	}
	Ok(true)
}

/// `Ok(false)`: the command ran but a device didn't acknowledge
fn main_app() -> AResult<bool> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg devmem: --devmem +takes_value +global "physical memory device (default /dev/mem)")
		(@arg base: --base +takes_value +global "physical base address of the CSR window (default 0x40000000)")
		(@arg size: --size +takes_value +global "length of the CSR window in bytes (default 0x10000)")
		(@arg control: --control +takes_value +global "offset of the I2C write CSR (SCL, OE, SDA)")
		(@arg status: --status +takes_value +global "offset of the I2C read CSR (SDA in bit 0)")
		(@arg scl_bit: --("scl-bit") +takes_value +global "SCL bit in the write CSR (default 0)")
		(@arg oe_bit: --("oe-bit") +takes_value +global "SDA output enable bit in the write CSR (default 1)")
		(@arg sda_bit: --("sda-bit") +takes_value +global "SDA output value bit in the write CSR (default 2)")
		(@arg settle_us: --("settle-us") +takes_value +global "settle delay after each line change in µs (default 1)")
		(@subcommand scan =>
			(about: "list addresses of responding I2C devices")
		)
		(@subcommand dump =>
			(about: "hex dump of device registers")
			(@arg ADDR: +required "7-bit device address")
			(@arg REG: +required "first register")
			(@arg COUNT: +required "number of registers")
		)
		(@subcommand ascii =>
			(about: "print device registers as characters")
			(@arg ADDR: +required "7-bit device address")
			(@arg REG: +required "first register")
			(@arg COUNT: +required "number of registers")
		)
		(@subcommand read =>
			(about: "read device registers")
			(@arg ADDR: +required "7-bit device address")
			(@arg REG: +required "first register")
			(@arg COUNT: +required "number of registers")
		)
		(@subcommand write =>
			(about: "write device registers")
			(@arg ADDR: +required "7-bit device address")
			(@arg REG: +required "first register")
			(@arg BYTES: +required +multiple "values to write")
		)
		(@subcommand si570 =>
			(about: "Si570 XO commands")
			(@setting SubcommandRequiredElseHelp)
			(@subcommand setup =>
				(about: "write hard-coded frequency setup")
				(@arg alternate: -a --alternate "use the alternate setup")
			)
			(@subcommand info =>
				(about: "show current frequency registers")
			)
			(@subcommand freq =>
				(about: "program new output frequency")
				(@arg F1: +required "new output frequency in Hz")
				(@arg f0: --f0 +takes_value "output frequency of the current settings in Hz (default 156.25e6)")
			)
		)
	).get_matches();

	let (config, layout) = config_from(&matches)?;

	with_bus(&config, layout, |bus| {
		match matches.subcommand() {
			("scan", _) => {
				scan(bus)
			}
			("dump", Some(sub_m)) => {
				dump(bus, sub_m)
			}
			("ascii", Some(sub_m)) => {
				ascii(bus, sub_m)
			}
			("read", Some(sub_m)) => {
				read(bus, sub_m)
			}
			("write", Some(sub_m)) => {
				write(bus, sub_m)
			}
			("si570", Some(sub_m)) => match sub_m.subcommand() {
				("setup", Some(sub_sub_m)) => {
					si570_setup(bus, sub_sub_m)
				},
				("info", _) => {
					si570_info(bus)
				},
				("freq", Some(sub_sub_m)) => {
					si570_freq(bus, sub_sub_m)
				},
				("", _) => bail!("no subcommand"),
				(cmd, _) => bail!("not implemented subcommand for 'si570' {:?}", cmd),
			},
			("", _) => bail!("no subcommand"),
			(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
		}
	})
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	match main_app() {
		Ok(true) => (),
		Ok(false) => exit(1),
		Err(e) => {
			error!("Error: {}", e);
			exit(1);
		},
	}
}
