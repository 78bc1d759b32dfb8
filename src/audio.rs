//! PCM audio decoder (§4.4).

#[cfg(feature = "cli")]
use symphonia::core::{
    audio::SampleBuffer,
    codecs::DecoderOptions,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

/// decoded audio payload: interleaved PCM16 samples, frame-major.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    /// little-endian `int16` samples, frame-major, channel-interleaved.
    pub bytes: Vec<u8>,
    /// samples per second.
    pub sample_rate: u32,
    /// number of interleaved channels.
    pub channel_count: u32,
    /// number of frames (one frame = one sample per channel).
    pub frame_count: u32,
}

/// decode failure: unrecognized container/codec, or a decode that produced zero frames.
#[derive(Debug, Clone)]
pub struct AudioDecodeError(pub String);

impl std::fmt::Display for AudioDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for AudioDecodeError {}

#[cfg(feature = "cli")]
/// decodes compressed or lossless audio bytes into interleaved PCM16.
pub fn decode(bytes: &[u8], extension_hint: &str) -> Result<AudioPayload, AudioDecodeError> {
    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if !extension_hint.is_empty() {
        hint.with_extension(extension_hint);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioDecodeError(format!("unrecognized audio container: {e}")))?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioDecodeError("no default audio track".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioDecodeError(format!("unsupported codec: {e}")))?;

    let mut samples: Vec<i16> = Vec::new();
    let mut sample_rate = 0u32;
    let mut channel_count = 0u32;
    let mut sample_buf: Option<SampleBuffer<i16>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(AudioDecodeError(format!("demux error: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(AudioDecodeError(format!("decode error: {e}"))),
        };

        let spec = *decoded.spec();
        if sample_buf.is_none() {
            sample_rate = spec.rate;
            channel_count = spec.channels.count() as u32;
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = &mut sample_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if samples.is_empty() || channel_count == 0 {
        return Err(AudioDecodeError("decode produced no frames".to_string()));
    }

    let frame_count = (samples.len() as u32) / channel_count;
    let mut bytes_out = Vec::with_capacity(samples.len() * 2);
    for s in &samples {
        bytes_out.extend_from_slice(&s.to_le_bytes());
    }

    Ok(AudioPayload {
        bytes: bytes_out,
        sample_rate,
        channel_count,
        frame_count,
    })
}
