use anyhow::Context;
use clap::Parser;
use image_adjuster::cli::CliOptions;

fn main() -> anyhow::Result<()> {
    let options = CliOptions::parse();
    let output_url = image_adjuster::run(&options).context("composition failed")?;
    println!("{output_url}");
    Ok(())
}
