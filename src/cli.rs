//! Command-line arguments for the headless driver.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::geometry::{Point, Rect, Size};

#[derive(Debug, Clone, PartialEq, Parser)]
#[command(
    name = "image-adjuster",
    about = "Place a subject cut from one image onto another via a compositing service",
    version
)]
pub struct CliOptions {
    /// Image the subject is cut from
    #[arg(long)]
    pub source: PathBuf,

    /// Image the subject is placed onto
    #[arg(long)]
    pub target: PathBuf,

    /// Placement point on the target image, as x,y
    #[arg(long, value_name = "X,Y", value_parser = parse_point, allow_hyphen_values = true)]
    pub place: Point,

    /// Subject box on the source image, as x,y,w,h (default 50,50,100,100)
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_rect, allow_hyphen_values = true)]
    pub subject: Option<Rect>,

    /// Drag the placement to this point after placing it
    #[arg(long, value_name = "X,Y", value_parser = parse_point, allow_hyphen_values = true)]
    pub drag_to: Option<Point>,

    /// Geometry is given on a display canvas of this size
    #[arg(long, value_name = "W,H", value_parser = parse_size)]
    pub canvas: Option<Size>,

    /// Compositing service base url
    #[arg(long = "server", value_name = "URL")]
    pub server_url: Option<String>,

    /// Read settings from this config.json
    #[arg(long = "config", value_name = "FILE")]
    pub config_path: Option<PathBuf>,

    /// Seconds to wait for uploads and compositing
    #[arg(long = "wait", value_name = "SECONDS", default_value = "60")]
    pub wait_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliOptions {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }
}

fn parse_point(value: &str) -> Result<Point, String> {
    match parse_numbers(value)?.as_slice() {
        [x, y] => Ok(Point::new(*x, *y)),
        _ => Err(format!("expected x,y but got {value:?}")),
    }
}

fn parse_rect(value: &str) -> Result<Rect, String> {
    match parse_numbers(value)?.as_slice() {
        [x, y, width, height] if *width > 0.0 && *height > 0.0 => {
            Ok(Rect::new(*x, *y, *width, *height))
        }
        [_, _, _, _] => Err(format!("width and height must be positive in {value:?}")),
        _ => Err(format!("expected x,y,w,h but got {value:?}")),
    }
}

fn parse_size(value: &str) -> Result<Size, String> {
    match parse_numbers(value)?.as_slice() {
        [width, height] if *width > 0.0 && *height > 0.0 => Ok(Size::new(*width, *height)),
        _ => Err(format!("expected positive w,h but got {value:?}")),
    }
}

fn parse_numbers(value: &str) -> Result<Vec<f64>, String> {
    value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .ok()
                .filter(|number| number.is_finite())
                .ok_or_else(|| format!("{:?} is not a finite number", part.trim()))
        })
        .collect()
}
