//! Build a source from configuration

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use contracts::{DataSource, SourceConfig, SourceError, SourceType};
use tracing::{info, instrument};

use crate::{LineSource, MockSource};

/// Default item count for `mock` sources
pub const DEFAULT_MOCK_COUNT: u64 = 100;

/// Create a source from its configuration
///
/// `enabled = false` still builds the source; the dispatcher checks
/// `is_enabled()` and goes straight to shutdown.
#[instrument(name = "build_source", skip(config), fields(source_type = ?config.source_type))]
pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn DataSource<String>>, SourceError> {
    let source: Arc<dyn DataSource<String>> = match config.source_type {
        SourceType::Lines => {
            let path = config
                .params
                .get("path")
                .ok_or_else(|| SourceError::transport("lines", "missing param 'path'"))?;
            let mut source = LineSource::open(Path::new(path))?;
            if let Some(max) = parse_u64(config, "max_items")? {
                source = source.with_max_items(max);
            }
            if config.enabled {
                Arc::new(source)
            } else {
                Arc::new(Disabled(source))
            }
        }
        SourceType::Mock => {
            let count = parse_u64(config, "count")?.unwrap_or(DEFAULT_MOCK_COUNT);
            let mut source = MockSource::numbered(count);
            if let Some(ms) = parse_u64(config, "delay_ms")? {
                source = source.with_delay(Duration::from_millis(ms));
            }
            if !config.enabled {
                source = source.disabled();
            }
            Arc::new(source)
        }
    };

    info!(
        source = source.name(),
        enabled = source.is_enabled(),
        "source created"
    );
    Ok(source)
}

fn parse_u64(config: &SourceConfig, key: &str) -> Result<Option<u64>, SourceError> {
    config
        .params
        .get(key)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|e| {
                SourceError::transport("config", format!("invalid '{key}' ({raw}): {e}"))
            })
        })
        .transpose()
}

/// Wrapper reporting an otherwise usable source as disabled
struct Disabled<S>(S);

impl<S: DataSource<String>> DataSource<String> for Disabled<S> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn next(&self) -> Result<Option<String>, SourceError> {
        self.0.next()
    }

    fn close(&self) -> Result<(), SourceError> {
        self.0.close()
    }
}
