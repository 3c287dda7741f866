//! Config validation and tree printing command.

use std::path::PathBuf;

use clap::Args;
use mixtree_config::{PipelineParser, StageRegistry, build_layout};
use mixtree_core::{GroupId, Mixer, MixingTree};

#[derive(Args)]
pub struct CheckArgs {
    /// Pipeline config (JSON); defaults to the system config path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output channel count to build the stages for
    #[arg(long, default_value = "2")]
    channels: usize,

    /// Sample rate the stages are initialized at
    #[arg(long, default_value = "48000")]
    sample_rate: u32,
}

pub fn run(args: CheckArgs) -> anyhow::Result<()> {
    if args.channels == 0 || args.sample_rate == 0 {
        anyhow::bail!("--channels and --sample-rate must be non-zero");
    }

    let parser = PipelineParser::load(args.config.as_deref())?;
    let layout = build_layout(&parser, &StageRegistry::new(), args.channels)?;
    let mixer = Mixer::new(layout, args.channels, args.sample_rate)?;

    println!("Config: {}", parser.file_path().display());
    println!(
        "{} groups, {} ch @ {} Hz",
        mixer.tree().len(),
        mixer.num_channels(),
        mixer.sample_rate()
    );
    println!();
    print_group(mixer.tree(), mixer.root(), 0);
    println!();
    println!(
        "Unrouted device ids go to '{}'",
        mixer.tree()[mixer.default_group()].name()
    );

    Ok(())
}

fn print_group(tree: &MixingTree, id: GroupId, depth: usize) {
    let group = &tree[id];
    let indent = "  ".repeat(depth);

    let stages = group.pipeline().stage_names();
    let chain = if stages.is_empty() {
        "(pass-through)".to_string()
    } else {
        stages.join(" -> ")
    };
    println!("{}{} [{}]", indent, group.name(), chain);

    if !group.device_ids().is_empty() {
        let mut devices: Vec<&str> = group.device_ids().iter().map(String::as_str).collect();
        devices.sort_unstable();
        println!("{}  streams: {}", indent, devices.join(", "));
    }

    for &child in group.children() {
        print_group(tree, child, depth + 1);
    }
}
