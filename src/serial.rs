use std::time::Duration;

use serialport::SerialPort;

pub const DEFAULT_BAUD_RATE: u32 = 115200;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens `device` at `baud_rate` with a read timeout.
///
/// The timeout doubles as the end-of-stream signal: a read that times out
/// means the device went quiet and the monitor loop stops.
pub fn open(
    device: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, serialport::Error> {
    serialport::new(device, baud_rate).timeout(timeout).open()
}
