use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::io::{
	FromRawFd,
	AsRawFd,
};
use std::ptr;

use libc::{
	MAP_FAILED,
	MAP_SHARED,
	O_CLOEXEC,
	O_RDWR,
	O_SYNC,
	PROT_READ,
	PROT_WRITE,
	c_void,
	mmap,
	munmap,
	off_t,
	open,
};

/// Shared mapping of a physical address window (`/dev/mem`).
#[derive(Debug)]
pub struct Mapped {
	ptr: ptr::NonNull<u8>, // u8 instead of void for easier offset operations
	len: usize,
	base: u64,
	// mapping stays valid after close, but keep it open for the session
	_file: fs::File,
}

impl Drop for Mapped {
	fn drop(&mut self) {
		unsafe {
			let res = munmap(
				self.ptr.as_ptr() as *mut c_void,
				self.len,
			);
			if 0 != res {
				error!("munmap failed: {}", io::Error::last_os_error());
			}
		}
	}
}

impl Mapped {
	pub fn base(&self) -> u64 {
		self.base
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn read_word(&self, offset: usize) -> u32 {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		u32::from_le(unsafe { ptr::read_volatile(self.ptr.as_ptr().add(offset) as *const u32) })
	}

	pub fn write_word(&mut self, offset: usize, data: u32) {
		assert!(offset & 3 == 0);
		assert!(offset + 3 < self.len);
		unsafe { ptr::write_volatile(self.ptr.as_ptr().add(offset) as *mut u32, data.to_le()) }
	}
}

pub fn open_device(path: &str) -> io::Result<fs::File> {
	let path = CString::new(path)?;

	let fd = unsafe { open(path.as_ptr(), O_RDWR | O_SYNC | O_CLOEXEC) };
	if -1 == fd {
		return Err(io::Error::last_os_error());
	}
	// now get fd managed to prevent resource leak
	Ok(unsafe { fs::File::from_raw_fd(fd) })
}

pub fn map(file: fs::File, base: u64, len: usize) -> io::Result<Mapped> {
	if base > off_t::max_value() as u64 {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, "base address too big"));
	}
	if len == 0 {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty window"));
	}

	let area = unsafe {
		mmap(
			ptr::null_mut(),
			len,
			PROT_READ | PROT_WRITE,
			MAP_SHARED,
			file.as_raw_fd(),
			base as off_t,
		)
	};

	if area == MAP_FAILED {
		return Err(io::Error::last_os_error());
	}
	match ptr::NonNull::new(area as *mut u8) {
		None => Err(io::Error::new(io::ErrorKind::Other, "mmap returned NULL")),
		Some(area) => Ok(Mapped{
			ptr: area,
			len,
			base,
			_file: file,
		}),
	}
}
