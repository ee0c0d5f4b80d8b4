/// Block type of a PCAPNG section header, as it appears on disk.
pub const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

pub const PCAP_READER_BUFFER_SIZE: usize = 64 * 1024;

pub const SECONDS_PER_MICRO: f64 = 1e-6;
pub const SECONDS_PER_NANO: f64 = 1e-9;

/// Units per second when an interface carries no `if_tsresol` option.
pub const PCAPNG_DEFAULT_TS_RESOLUTION: u64 = 1_000_000;
