//! Persistent on-disk cache for traded-volume averages.
//!
//! Volume history is the slow fetch (one request per type), so the
//! computed averages are reused across runs until the caller asks for a
//! regeneration or changes the lookback window.

use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::OnceLock,
};

use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{debug, info, warn};

use crate::domain::TypeId;

const CACHE_FILENAME: &str = "cached_volumes.json";
const APP_DIR: &str = "industry-profit-scanner";

/// Cached daily-volume averages, tagged with the window they were
/// computed over so a reconfigured run never reuses mismatched data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeCache {
    /// Lookback window the averages cover, in days.
    pub window_days: u32,
    /// RFC 3339 timestamp of generation.
    pub generated_at: String,
    pub volumes: HashMap<TypeId, f64>,
}

impl VolumeCache {
    pub fn new(window_days: u32, volumes: HashMap<TypeId, f64>) -> Self {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            window_days,
            generated_at,
            volumes,
        }
    }

    /// Human-readable age since generation.
    pub fn age_string(&self) -> String {
        let Ok(generated) = OffsetDateTime::parse(&self.generated_at, &Rfc3339) else {
            return "unknown age".to_string();
        };
        let secs = (OffsetDateTime::now_utc() - generated).whole_seconds().max(0);
        if secs < 60 {
            format!("{secs}s")
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else if secs < 86400 {
            format!("{}h", secs / 3600)
        } else {
            format!("{}d", secs / 86400)
        }
    }
}

/// Cache file path in the platform-local data directory.
fn cache_path() -> PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let base = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR);
        let _ = fs::create_dir_all(&base);
        base.join(CACHE_FILENAME)
    })
    .clone()
}

/// Load the cached volumes, if present and generated for the same window.
pub fn load_volume_cache(window_days: u32) -> Option<VolumeCache> {
    let path = cache_path();

    if !path.exists() {
        debug!("no volume cache at {}", path.display());
        return None;
    }

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(error) => {
            warn!("failed to read volume cache: {error}");
            return None;
        }
    };

    match serde_json::from_str::<VolumeCache>(&content) {
        Ok(cache) if cache.window_days == window_days => {
            info!(
                "loaded volume cache from {} ({} types, age {})",
                path.display(),
                cache.volumes.len(),
                cache.age_string()
            );
            Some(cache)
        }
        Ok(cache) => {
            info!(
                "volume cache covers a {}-day window, {window_days} requested; regenerating",
                cache.window_days
            );
            None
        }
        Err(error) => {
            warn!("failed to parse volume cache: {error}");
            None
        }
    }
}

/// Save the volumes for the next run.
pub fn save_volume_cache(cache: &VolumeCache) -> Result<(), std::io::Error> {
    let path = cache_path();
    let content = serde_json::to_string_pretty(cache)?;
    fs::write(&path, content)?;
    info!(
        "saved volume cache ({} types, {}-day window) to {}",
        cache.volumes.len(),
        cache.window_days,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_keys_survive_the_json_round_trip() {
        let cache = VolumeCache::new(30, HashMap::from([(34, 1250.5), (35, 0.0)]));

        let encoded = serde_json::to_string(&cache).unwrap();
        let decoded: VolumeCache = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.window_days, 30);
        assert_eq!(decoded.volumes.get(&34), Some(&1250.5));
        assert_eq!(decoded.volumes.get(&35), Some(&0.0));
    }

    #[test]
    fn fresh_cache_reports_an_age_in_seconds() {
        let cache = VolumeCache::new(30, HashMap::new());
        assert!(cache.age_string().ends_with('s'));
    }

    #[test]
    fn unparseable_timestamps_do_not_panic() {
        let cache = VolumeCache {
            window_days: 30,
            generated_at: "not-a-timestamp".to_string(),
            volumes: HashMap::new(),
        };
        assert_eq!(cache.age_string(), "unknown age");
    }
}
