/// Generic container metadata command.
pub mod calvin;
/// Probe layout dump command.
pub mod cdf;
/// Intensity file dump command.
pub mod cel;
/// Pixel-image header command.
pub mod dat;
/// Format sniffing command.
pub mod info;

mod util;
