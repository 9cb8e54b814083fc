use std::thread;
use std::time::{
	Duration,
	Instant,
};

/// Settle time after each committed control word.
pub const SETTLE_DELAY: Duration = Duration::from_micros(1);

pub fn reliable_sleep(mut duration: Duration) {
	if duration == Duration::from_secs(0) {
		return;
	}
	loop {
		let now = Instant::now();
		thread::sleep(duration);
		let elapsed = now.elapsed();
		if elapsed >= duration {
			return;
		}
		duration -= elapsed;
	}
}

/// Access to the two words the bus lives in.
///
/// Both calls are single-word accesses; a failing access is not
/// recoverable and isn't reported here.
pub trait Registers {
	/// write the output word (clock level, data output enable)
	fn write_control_word(&mut self, value: u32);

	/// read the input word; bit 0 is the sampled data line
	fn read_status_word(&mut self) -> u32;
}

impl<'a, R: ?Sized + Registers> Registers for &'a mut R {
	fn write_control_word(&mut self, value: u32) {
		R::write_control_word(*self, value)
	}

	fn read_status_word(&mut self) -> u32 {
		R::read_status_word(*self)
	}
}
