use anyhow::{bail, Context};
use aoacore::ChannelPair;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Loads the first two channels of a WAV file as left/right.
///
/// Integer samples are scaled into `[-1, 1)`; float samples are used as is.
pub fn read_stereo_wav<P: AsRef<Path>>(path: P) -> anyhow::Result<ChannelPair> {
    let path = path.as_ref();
    let reader =
        WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels < 2 {
        bail!(
            "{} has {} channel(s), a stereo recording is required",
            path.display(),
            channels
        );
    }

    let interleaved: Vec<f64> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()
            .with_context(|| format!("decoding {}", path.display()))?,
        SampleFormat::Int => {
            let max_val = (1u64 << (spec.bits_per_sample - 1)) as f64;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| f64::from(v) / max_val))
                .collect::<Result<_, _>>()
                .with_context(|| format!("decoding {}", path.display()))?
        }
    };

    let frames = interleaved.len() / channels;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for frame in interleaved.chunks_exact(channels) {
        left.push(frame[0]);
        right.push(frame[1]);
    }

    ChannelPair::new(left, right, spec.sample_rate)
        .with_context(|| format!("loading {}", path.display()))
}

/// Writes a pair as a 32-bit float stereo WAV file.
pub fn write_stereo_wav<P: AsRef<Path>>(path: P, pair: &ChannelPair) -> anyhow::Result<()> {
    let path = path.as_ref();
    let spec = WavSpec {
        channels: 2,
        sample_rate: pair.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer =
        WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    for (&l, &r) in pair.left.iter().zip(pair.right.iter()) {
        writer.write_sample(l as f32)?;
        writer.write_sample(r as f32)?;
    }
    writer
        .finalize()
        .with_context(|| format!("finalizing {}", path.display()))?;
    Ok(())
}
