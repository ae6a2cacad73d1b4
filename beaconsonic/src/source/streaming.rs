use crate::error::Result;
use crate::pcm::{AudioConfig, fill_silence};
use crate::source::{PcmStatus, SourceGeometry};
use ringbuf::{HeapCons, HeapProd, HeapRb, traits::*};
use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Flags shared by both halves of a speech stream.
#[derive(Debug, Default)]
struct StreamState {
    /// Set once the writer has delivered its last byte.
    closed: AtomicBool,
    /// Set when the reader side has gone away.
    abandoned: AtomicBool,
}

/// Creates a single-producer single-consumer byte stream of `capacity` bytes.
///
/// The writer lives on an I/O thread and may block while the ring is full; the
/// reader is handed to a [`StreamingSource`] and never blocks.
pub fn speech_stream(capacity: usize) -> (SpeechStreamWriter, SpeechStreamReader) {
    let (producer, consumer) = HeapRb::<u8>::new(capacity.max(1)).split();
    let state = Arc::new(StreamState::default());
    (
        SpeechStreamWriter {
            producer,
            state: state.clone(),
        },
        SpeechStreamReader { consumer, state },
    )
}

/// Producer half of a speech stream.
///
/// Dropping the writer closes the stream, the same as [`finish`](Self::finish).
pub struct SpeechStreamWriter {
    producer: HeapProd<u8>,
    state: Arc<StreamState>,
}

impl SpeechStreamWriter {
    const PUMP_CHUNK: usize = 4096;
    const FULL_BACKOFF: Duration = Duration::from_millis(2);

    /// Pushes as many bytes as currently fit and returns how many were taken.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        self.producer.push_slice(bytes)
    }

    /// Free space in bytes.
    pub fn vacant(&self) -> usize {
        self.producer.vacant_len()
    }

    /// Whether the consuming source has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.state.abandoned.load(Ordering::Acquire)
    }

    /// Copies everything from `input` into the stream, waiting for space as needed.
    ///
    /// Returns the number of bytes delivered. Stops early without error if the
    /// reader is dropped. The stream is not closed; call [`finish`](Self::finish).
    pub fn pump_from<R: Read>(&mut self, mut input: R) -> Result<u64> {
        let mut chunk = [0u8; Self::PUMP_CHUNK];
        let mut total = 0u64;

        loop {
            let read = match input.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            let mut offset = 0;
            while offset < read {
                if self.is_abandoned() {
                    log::debug!("Speech stream reader dropped after {} bytes", total);
                    return Ok(total);
                }
                let pushed = self.producer.push_slice(&chunk[offset..read]);
                if pushed == 0 {
                    std::thread::sleep(Self::FULL_BACKOFF);
                }
                offset += pushed;
                total += pushed as u64;
            }
        }

        Ok(total)
    }

    /// Marks the end of the utterance.
    pub fn finish(self) {
        // Drop does the work
    }
}

impl Drop for SpeechStreamWriter {
    fn drop(&mut self) {
        self.state.closed.store(true, Ordering::Release);
    }
}

/// Consumer half of a speech stream.
pub struct SpeechStreamReader {
    consumer: HeapCons<u8>,
    state: Arc<StreamState>,
}

impl SpeechStreamReader {
    /// Bytes waiting to be read.
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Whether the writer has finished. Bytes may still be buffered.
    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    pub fn read(&mut self, dest: &mut [u8]) -> usize {
        self.consumer.pop_slice(dest)
    }
}

impl Drop for SpeechStreamReader {
    fn drop(&mut self) {
        self.state.abandoned.store(true, Ordering::Release);
    }
}

/// Relays live PCM, typically synthesized speech, to the renderer.
///
/// Empty pulls are counted. Once more than `starvation_threshold` consecutive pulls
/// found nothing, the source reports end of stream so the beacon can be torn down.
pub struct StreamingSource {
    reader: SpeechStreamReader,
    config: AudioConfig,
    geometry: Arc<SourceGeometry>,
    starvation_threshold: u32,
    empty_reads: u32,
}

impl StreamingSource {
    pub fn new(
        reader: SpeechStreamReader,
        config: AudioConfig,
        geometry: Arc<SourceGeometry>,
        starvation_threshold: u32,
    ) -> Self {
        Self {
            reader,
            config,
            geometry,
            starvation_threshold,
            empty_reads: 0,
        }
    }

    pub fn geometry(&self) -> &Arc<SourceGeometry> {
        &self.geometry
    }

    pub fn config(&self) -> AudioConfig {
        self.config
    }

    /// Replaces the byte format; only meaningful before the sound is created.
    pub fn set_config(&mut self, config: AudioConfig) {
        self.config = config;
    }

    /// True once the first bytes have arrived or the stream has ended.
    pub fn is_ready(&self) -> bool {
        self.reader.available() > 0 || self.reader.is_closed()
    }

    pub fn empty_reads(&self) -> u32 {
        self.empty_reads
    }

    /// Render-thread read. Only whole frames are taken from the ring.
    pub fn read_pcm(&mut self, data: &mut [u8]) -> PcmStatus {
        // Checked before draining so a close racing with this read is seen next time
        let closed = self.reader.is_closed();
        let wanted = self
            .config
            .align_to_frame(self.reader.available().min(data.len()));
        let read = self.reader.read(&mut data[..wanted]);
        fill_silence(&mut data[read..], self.config.format);

        if read > 0 {
            self.empty_reads = 0;
            return PcmStatus::Ok;
        }
        if closed {
            return PcmStatus::EndOfStream;
        }

        self.empty_reads = self.empty_reads.saturating_add(1);
        if self.empty_reads > self.starvation_threshold {
            PcmStatus::EndOfStream
        } else {
            PcmStatus::Ok
        }
    }
}
