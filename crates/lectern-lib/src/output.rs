//! Audio output — one exclusively owned sink playing one clip at a time.
//!
//! The rodio `OutputStream` is `!Send`, so the real implementation lives on
//! a dedicated OS thread driven by a command channel. Completion is
//! reported back through a oneshot: it resolves when the clip drains
//! naturally and is simply dropped when playback is torn down, which lets
//! the session loop distinguish "finished" from "cancelled" without a
//! second channel.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use tokio::sync::oneshot;
use tracing::{debug, error};

use crate::pcm::{AudioBuffer, PCM_CHANNELS};

/// Poll interval for sink-drained detection while a clip is playing.
const DRAIN_POLL: Duration = Duration::from_millis(10);

/// The playback primitive the narration engine drives.
///
/// Implementations own at most one active clip; starting a new one
/// releases the previous.
pub trait AudioOutput: Send + Sync + 'static {
    /// Start playing a clip at the given rate and volume. The returned
    /// receiver resolves on natural completion and closes on cancellation.
    fn play(&self, clip: Arc<AudioBuffer>, rate: f32, volume: f32) -> oneshot::Receiver<()>;

    /// Suspend the audio clock without discarding buffered audio.
    fn pause(&self);

    /// Resume from exactly where playback was suspended.
    fn resume(&self);

    /// Halt and discard any active clip. Never fails when nothing plays.
    fn stop(&self);

    /// Apply a playback-rate change to the in-flight clip.
    fn set_rate(&self, rate: f32);

    /// Apply a volume change to the in-flight clip.
    fn set_volume(&self, volume: f32);
}

enum OutCmd {
    Play {
        clip: Arc<AudioBuffer>,
        rate: f32,
        volume: f32,
        done: oneshot::Sender<()>,
    },
    Pause,
    Resume,
    Stop,
    SetRate(f32),
    SetVolume(f32),
}

/// Rodio-backed output on its own playback thread.
pub struct RodioOutput {
    cmd_tx: Sender<OutCmd>,
}

impl RodioOutput {
    /// Spawn the playback thread and return a handle to it.
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = channel::<OutCmd>();
        std::thread::Builder::new()
            .name("lectern-playback".into())
            .spawn(move || playback_thread(cmd_rx))
            .expect("failed to spawn playback thread");
        Self { cmd_tx }
    }
}

impl AudioOutput for RodioOutput {
    fn play(&self, clip: Arc<AudioBuffer>, rate: f32, volume: f32) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(OutCmd::Play {
            clip,
            rate,
            volume,
            done,
        });
        rx
    }

    fn pause(&self) {
        let _ = self.cmd_tx.send(OutCmd::Pause);
    }

    fn resume(&self) {
        let _ = self.cmd_tx.send(OutCmd::Resume);
    }

    fn stop(&self) {
        let _ = self.cmd_tx.send(OutCmd::Stop);
    }

    fn set_rate(&self, rate: f32) {
        let _ = self.cmd_tx.send(OutCmd::SetRate(rate));
    }

    fn set_volume(&self, volume: f32) {
        let _ = self.cmd_tx.send(OutCmd::SetVolume(volume));
    }
}

fn playback_thread(cmd_rx: Receiver<OutCmd>) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(e) => {
            error!("playback: failed to open audio output: {e}");
            return;
        }
    };

    let mut sink = match Sink::try_new(&stream_handle) {
        Ok(s) => s,
        Err(e) => {
            error!("playback: failed to create sink: {e}");
            return;
        }
    };
    let mut current: Option<oneshot::Sender<()>> = None;
    let mut paused = false;

    loop {
        // While a clip is in flight, poll so the drained sink is noticed
        // promptly; otherwise block until the next command.
        let cmd = if current.is_some() {
            match cmd_rx.recv_timeout(DRAIN_POLL) {
                Ok(cmd) => Some(cmd),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match cmd_rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break,
            }
        };

        if let Some(cmd) = cmd {
            match cmd {
                OutCmd::Play {
                    clip,
                    rate,
                    volume,
                    done,
                } => {
                    if current.take().is_some() {
                        // Superseded mid-clip: release the old node first.
                        // Dropping its sender closes the completion channel.
                        sink.stop();
                        sink = match Sink::try_new(&stream_handle) {
                            Ok(s) => s,
                            Err(e) => {
                                error!("playback: failed to recreate sink: {e}");
                                break;
                            }
                        };
                    }
                    debug!("playback: clip of {} samples", clip.samples.len());
                    sink.set_speed(rate);
                    sink.set_volume(volume);
                    sink.append(SamplesBuffer::new(
                        PCM_CHANNELS,
                        clip.sample_rate,
                        clip.samples.clone(),
                    ));
                    sink.play();
                    paused = false;
                    current = Some(done);
                }
                OutCmd::Pause => {
                    sink.pause();
                    paused = true;
                }
                OutCmd::Resume => {
                    sink.play();
                    paused = false;
                }
                OutCmd::Stop => {
                    sink.stop();
                    sink = match Sink::try_new(&stream_handle) {
                        Ok(s) => s,
                        Err(e) => {
                            error!("playback: failed to recreate sink: {e}");
                            break;
                        }
                    };
                    current = None;
                    paused = false;
                }
                OutCmd::SetRate(rate) => sink.set_speed(rate),
                OutCmd::SetVolume(volume) => sink.set_volume(volume),
            }
        }

        if !paused && sink.empty() {
            if let Some(done) = current.take() {
                let _ = done.send(());
            }
        }
    }

    sink.stop();
}
