//! Stub collaborators for unit tests.

use crate::acquire::{Acquirer, AudioTrack};
use crate::media::MediaToolkit;
use crate::notify::Notifier;
use crate::orchestrator::MetadataProvider;
use crate::upload::Uploader;
use anyhow::Result;
use async_trait::async_trait;
use shared::{SeriesInfo, TaskRegistry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Acquirer that deposits pre-planned files into the working directory.
pub struct StubAcquirer {
    dir: PathBuf,
    plan: HashMap<(u32, AudioTrack), String>,
    /// Cancel the registry entry when this episode's primary fetch runs.
    pub cancel_on_fetch: Option<(TaskRegistry, i64, u32)>,
}

impl StubAcquirer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            plan: HashMap::new(),
            cancel_on_fetch: None,
        }
    }

    pub fn deposit(mut self, episode: u32, track: AudioTrack, file_name: &str) -> Self {
        self.plan.insert((episode, track), file_name.to_string());
        self
    }
}

#[async_trait]
impl Acquirer for StubAcquirer {
    async fn fetch(
        &self,
        _series: &str,
        episode: u32,
        _resolution: &str,
        track: AudioTrack,
    ) -> Result<()> {
        if let Some((registry, requester, at)) = &self.cancel_on_fetch {
            if *at == episode && track == AudioTrack::Primary {
                registry.cancel(*requester);
            }
        }

        if let Some(name) = self.plan.get(&(episode, track)) {
            std::fs::create_dir_all(&self.dir)?;
            std::fs::write(self.dir.join(name), b"video")?;
        }
        Ok(())
    }
}

/// Media toolkit with canned durations (keyed by file name) and a fixed
/// mux outcome.
pub struct StubMedia {
    durations: HashMap<String, f64>,
    mux_ok: bool,
}

impl StubMedia {
    pub fn new(mux_ok: bool) -> Self {
        Self {
            durations: HashMap::new(),
            mux_ok,
        }
    }

    pub fn duration_of(mut self, file_name: &str, seconds: f64) -> Self {
        self.durations.insert(file_name.to_string(), seconds);
        self
    }
}

#[async_trait]
impl MediaToolkit for StubMedia {
    async fn duration(&self, path: &Path) -> f64 {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| self.durations.get(n))
            .copied()
            .unwrap_or(0.0)
    }

    async fn mux_dual_audio(&self, _sub: &Path, _dub: &Path, out: &Path) -> bool {
        if self.mux_ok {
            std::fs::write(out, b"muxed").unwrap();
        }
        self.mux_ok
    }
}

/// Uploader handing out sequential reference ids and recording captions.
pub struct StubUploader {
    next_id: AtomicI64,
    pub fail: bool,
    pub captions: Mutex<Vec<String>>,
}

impl StubUploader {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            fail: false,
            captions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl Uploader for StubUploader {
    async fn upload(&self, _path: &Path, caption: &str) -> Result<i64> {
        if self.fail {
            anyhow::bail!("channel unavailable");
        }
        self.captions.lock().unwrap().push(caption.to_string());
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

/// Notifier that records every notice.
#[derive(Default)]
pub struct RecordingNotifier {
    pub notes: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_contains(&self, needle: &str) -> bool {
        self.notes.lock().unwrap().iter().any(|n| n.contains(needle))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) {
        self.notes.lock().unwrap().push(text.to_string());
    }
}

/// Metadata provider that always degrades to fallback info.
pub struct NullMetadata;

#[async_trait]
impl MetadataProvider for NullMetadata {
    async fn lookup(&self, query: &str) -> SeriesInfo {
        SeriesInfo::fallback(query)
    }
}
