//! Ready-made status value for console and log sinks.

/// Human-readable download status, built by the engines' status factory
/// from `(bytes_done, total_bytes)`. `total_bytes == 0` means unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadStatus {
    pub bytes_done: u64,
    pub total_bytes: u64,
    pub description: String,
}

impl DownloadStatus {
    pub fn new(bytes_done: u64, total_bytes: u64) -> Self {
        let description = if total_bytes == 0 {
            format!("Download Progress: {:>10}", format_size(bytes_done))
        } else if bytes_done != total_bytes {
            let pct = bytes_done as f64 / total_bytes as f64 * 100.0;
            format!(
                "Download Progress: {:>10}/{:>10} | {:>8.3}%",
                format_size(bytes_done),
                format_size(total_bytes),
                pct
            )
        } else {
            "Download Completed".to_string()
        };
        Self {
            bytes_done,
            total_bytes,
            description,
        }
    }

    /// Fraction complete in [0.0, 1.0]; 0.0 while the total is unknown.
    pub fn fraction(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.bytes_done as f64 / self.total_bytes as f64).min(1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.total_bytes != 0 && self.bytes_done == self.total_bytes
    }
}

/// Binary-prefixed size: `512 bytes`, `1.5 KB`, `4.0 MB`, ...
pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 6] = ["KB", "MB", "GB", "TB", "PB", "EB"];
    if size < 1024 {
        return format!("{} bytes", size);
    }
    let mut unit = 0;
    let mut value = size as f64 / 1024.0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}
