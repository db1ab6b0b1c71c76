//! Drops short feature tracks.

use std::time::Duration;

use tracing::debug;

use crate::scene::TrackSet;
use crate::tools::tool::{OutputKinds, Tool, ToolContext, ToolData, ToolInputs};

#[derive(Debug, Clone)]
pub struct TrackFilterConfig {
    /// Tracks observed in fewer frames than this are removed.
    pub min_length: usize,
    /// Tracks examined between partial updates.
    pub chunk_size: usize,
    /// Pause after each chunk. Zero outside of demos.
    pub chunk_pause: Duration,
}

impl Default for TrackFilterConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            chunk_size: 256,
            chunk_pause: Duration::ZERO,
        }
    }
}

/// Removes tracks shorter than [`TrackFilterConfig::min_length`], streaming
/// the filtered set after every chunk.
///
/// Each partial result is a complete track set: tracks examined so far are
/// filtered, the rest are passed through untouched. A cancelled run thus
/// never loses a track it did not examine.
#[derive(Debug, Clone, Default)]
pub struct TrackFilterTool {
    config: TrackFilterConfig,
}

impl TrackFilterTool {
    pub const NAME: &'static str = "filter-tracks";

    pub fn new(config: TrackFilterConfig) -> Self {
        Self { config }
    }
}

impl Tool for TrackFilterTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn outputs(&self) -> OutputKinds {
        OutputKinds::TRACKS
    }

    fn is_cancelable(&self) -> bool {
        true
    }

    fn accepts(&self, inputs: &ToolInputs) -> bool {
        inputs.has_tracks()
    }

    fn run(&mut self, inputs: ToolInputs, ctx: &ToolContext) -> anyhow::Result<()> {
        let Some(tracks) = inputs.tracks else {
            return Ok(());
        };
        let chunk_size = self.config.chunk_size.max(1);
        let all = tracks.tracks();
        let mut kept = Vec::new();
        let mut processed = 0;

        for chunk in all.chunks(chunk_size) {
            if ctx.is_cancelled() {
                debug!("Track filter cancelled after {} kept tracks", kept.len());
                return Ok(());
            }
            kept.extend(
                chunk
                    .iter()
                    .filter(|t| t.len() >= self.config.min_length)
                    .cloned(),
            );
            processed += chunk.len();
            let partial: TrackSet = kept.iter().chain(&all[processed..]).cloned().collect();
            ctx.update(ToolData::default().with_tracks(partial));
            if !self.config.chunk_pause.is_zero() {
                std::thread::sleep(self.config.chunk_pause);
            }
        }

        debug!("Track filter kept {} of {} tracks", kept.len(), tracks.len());
        ctx.set_data(ToolData::default().with_tracks(TrackSet::new(kept)));
        Ok(())
    }
}
