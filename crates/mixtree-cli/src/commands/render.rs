//! Offline rendering of WAV inputs through the mixer.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use mixtree_config::{PipelineParser, StageRegistry, build_layout};
use mixtree_core::{Mixer, PcmInput, linear_to_db};

use crate::wav::{WavSink, read_wav};

#[derive(Args)]
pub struct RenderArgs {
    /// Pipeline config (JSON); defaults to the system config path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input stream as device=file.wav (repeatable)
    #[arg(short, long = "input", value_parser = parse_input, required = true)]
    inputs: Vec<(String, PathBuf)>,

    /// Output WAV file
    #[arg(short, long)]
    output: PathBuf,

    /// Frames per mixer callback
    #[arg(long, default_value = "256")]
    block_size: usize,

    /// Stream volume as device=volume in [0, 1] (repeatable)
    #[arg(long = "volume", value_parser = parse_volume)]
    volumes: Vec<(String, f32)>,

    /// Output channel count
    #[arg(long, default_value = "2")]
    channels: usize,

    /// Output sample rate; defaults to the rate of the inputs
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = s.splitn(2, '=').collect();
    if parts.len() != 2 || parts[0].is_empty() {
        return Err(format!("Invalid format: '{}' (expected device=value)", s));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

fn parse_input(s: &str) -> Result<(String, PathBuf), String> {
    let (device, path) = parse_key_val(s)?;
    Ok((device, PathBuf::from(path)))
}

fn parse_volume(s: &str) -> Result<(String, f32), String> {
    let (device, volume) = parse_key_val(s)?;
    let volume: f32 = volume
        .parse()
        .map_err(|_| format!("Invalid volume '{}' for {}", volume, device))?;
    if !(0.0..=1.0).contains(&volume) {
        return Err(format!("Volume for {} must be in [0, 1], got {}", device, volume));
    }
    Ok((device, volume))
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    if args.block_size == 0 {
        anyhow::bail!("--block-size must be at least 1");
    }
    if args.channels == 0 {
        anyhow::bail!("--channels must be at least 1");
    }
    if !matches!(args.bit_depth, 16 | 24 | 32) {
        anyhow::bail!("Unsupported bit depth {} (use 16, 24, or 32)", args.bit_depth);
    }

    let mut sources = Vec::with_capacity(args.inputs.len());
    for (device, path) in &args.inputs {
        println!("Reading {} ({})...", path.display(), device);
        let data = read_wav(path)?;
        println!(
            "  {} frames, {} ch, {} Hz",
            data.frames(),
            data.channels,
            data.sample_rate
        );
        sources.push((device.clone(), data));
    }

    let sample_rate = args
        .sample_rate
        .unwrap_or_else(|| sources.first().map_or(48000, |(_, d)| d.sample_rate));
    if let Some((device, data)) = sources.iter().find(|(_, d)| d.sample_rate != sample_rate) {
        anyhow::bail!(
            "Input {} is {} Hz but the output is {} Hz; inputs are not resampled",
            device,
            data.sample_rate,
            sample_rate
        );
    }

    let parser = PipelineParser::load(args.config.as_deref())?;
    let layout = build_layout(&parser, &StageRegistry::new(), args.channels)?;
    let mut mixer = Mixer::new(layout, args.channels, sample_rate)?;

    let volumes: HashMap<String, f32> = args.volumes.into_iter().collect();
    let mut ids = Vec::with_capacity(sources.len());
    let mut longest = 0;

    println!("\nRouting:");
    for (device, data) in &sources {
        let volume = volumes.get(device).copied().unwrap_or(1.0);
        let input = PcmInput::from_interleaved(device.as_str(), &data.samples, data.channels)
            .with_volume(volume);
        let id = mixer.add_input(Box::new(input));
        mixer.set_input_active(id, true)?;

        let group = mixer.route(id).map_or("?", |g| mixer.tree()[g].name());
        println!("  {:12} -> {:16} volume {:.2}", device, group, volume);

        ids.push(id);
        longest = longest.max(data.frames());
    }

    let mut sink = WavSink::create(&args.output, args.channels, sample_rate, args.bit_depth)?;

    println!("\nRendering in blocks of {}...", args.block_size);
    let pb = ProgressBar::new(longest as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let mut max_volume = 0.0f32;
    let mut max_delay_us = 0;
    let mut total = longest;
    let mut position = 0;
    while position < total {
        let frames = args.block_size.min(total - position);
        max_volume = max_volume.max(mixer.render_to(&mut sink, frames)?);

        if position == 0 {
            // Stages report their delay from the first pass; render the
            // deepest delay line out past the longest input.
            max_delay_us = ids
                .iter()
                .filter_map(|&id| mixer.output_delay_us(id, &sink))
                .max()
                .unwrap_or(0);
            let tail = (max_delay_us * u64::from(sample_rate)).div_ceil(1_000_000) as usize;
            total = longest + tail;
            pb.set_length(total as u64);
        }

        position += frames;
        pb.set_position(position as u64);
    }
    pb.finish_with_message("done");

    let written = sink.frames();
    let peak = sink.peak();
    sink.finalize()?;

    println!("\nWrote {} frames to {}", written, args.output.display());
    println!("  Max mix volume: {:.2}", max_volume);
    println!("  Peak level: {:.1} dBFS", linear_to_db(peak));
    println!("  Rendering delay: {:.2} ms", max_delay_us as f64 / 1000.0);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_pairs() {
        assert_eq!(
            parse_input("tts=speech.wav").unwrap(),
            ("tts".to_string(), PathBuf::from("speech.wav"))
        );
        assert_eq!(parse_volume("tts=0.5").unwrap(), ("tts".to_string(), 0.5));
        assert!(parse_input("speech.wav").is_err());
        assert!(parse_input("=speech.wav").is_err());
        assert!(parse_volume("tts=loud").is_err());
        assert!(parse_volume("tts=1.5").is_err());
    }
}
