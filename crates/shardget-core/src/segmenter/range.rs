//! Shard type and fixed-size range planning.

/// Nominal shard size: 4 MiB.
pub const DEFAULT_SHARD_SIZE: u64 = 4 * 1024 * 1024;

/// A single shard: byte range [start, end] (inclusive on both ends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shard {
    pub start: u64,
    pub end: u64,
}

impl Shard {
    /// Length of this shard in bytes (never 0 for a planned shard).
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// HTTP Range header value: `bytes=start-end`.
    pub fn range_header_value(&self) -> String {
        format!("bytes={}", self.curl_range())
    }

    /// Range in the form libcurl's `CURLOPT_RANGE` expects: `start-end`.
    pub fn curl_range(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Splits `[0, content_length)` into shards of `shard_size` bytes; the last
/// shard holds the remainder. Returns an empty vec if either argument is 0.
pub fn plan_shards(content_length: u64, shard_size: u64) -> Vec<Shard> {
    if content_length == 0 || shard_size == 0 {
        return Vec::new();
    }

    let count = content_length.div_ceil(shard_size);
    let mut out = Vec::with_capacity(count as usize);
    let mut offset = 0u64;

    while offset < content_length {
        let end = offset.saturating_add(shard_size).min(content_length) - 1;
        out.push(Shard { start: offset, end });
        offset = end + 1;
    }

    out
}
