//! Shared libcurl handle setup for ranged and sequential GETs.

use std::collections::HashMap;
use std::time::Duration;

/// Transport settings applied to every GET of one transfer.
#[derive(Debug, Clone, Copy)]
pub(super) struct RequestSettings {
    pub connect_timeout: Duration,
    pub buffer_size: usize,
}

pub(super) fn configure(
    easy: &mut curl::easy::Easy,
    url: &str,
    custom_headers: &HashMap<String, String>,
    settings: RequestSettings,
) -> Result<(), curl::Error> {
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    // Non-2xx responses must not reach the write callback (their bodies would
    // land in the destination file).
    easy.fail_on_error(true)?;
    easy.connect_timeout(settings.connect_timeout)?;
    // Abort if throughput drops below 1 KiB/s for 60s rather than using a hard
    // wall-clock timeout that would kill large shards on slow links.
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.buffer_size(settings.buffer_size)?;
    // Enables the progress callback, which is where cancellation is observed
    // while no body bytes are arriving.
    easy.progress(true)?;

    if !custom_headers.is_empty() {
        let mut list = curl::easy::List::new();
        for (k, v) in custom_headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        easy.http_headers(list)?;
    }
    Ok(())
}
