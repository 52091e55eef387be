//! `shardget probe` – print what a HEAD request reports.

use anyhow::Result;
use shardget_core::config::ShardgetConfig;
use shardget_core::fetch_head;
use shardget_core::CancelToken;
use shardget_core::progress::format_size;
use std::collections::HashMap;
use std::time::Duration;

pub async fn run_probe(cfg: &ShardgetConfig, url: &str) -> Result<()> {
    let target = url.to_string();
    let timeout = Duration::from_secs(cfg.connect_timeout_secs);
    let head = tokio::task::spawn_blocking(move || {
        fetch_head::probe(&target, &HashMap::new(), timeout, &CancelToken::new())
    })
    .await??;

    let length = match head.content_length {
        Some(n) if n >= 0 => format!("{} ({})", n, format_size(n as u64)),
        Some(n) => format!("{} (invalid)", n),
        None => "unknown".to_string(),
    };
    println!("URL:            {}", url);
    println!("Length:         {}", length);
    println!("Accept-Ranges:  {}", if head.accept_ranges { "bytes" } else { "no" });
    println!("ETag:           {}", head.etag.as_deref().unwrap_or("-"));
    println!("Last-Modified:  {}", head.last_modified.as_deref().unwrap_or("-"));
    if let Some(disposition) = head.content_disposition.as_deref() {
        println!("Disposition:    {}", disposition);
    }
    Ok(())
}
