use anstyle::{AnsiColor, Color, Style};
use clap::{builder::Styles, Parser};
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Styles for CLI
fn get_styles() -> Styles {
  Styles::styled()
    .header(
      Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .literal(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::BrightCyan))))
    .usage(
      Style::new()
        .bold()
        .fg_color(Some(Color::Ansi(AnsiColor::Green))),
    )
    .placeholder(
      Style::new()
        .bold()
        .underline()
        .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
    )
}

/// Provision the S3 buckets, IAM role, Lambda function and CloudFront distribution for a
/// Lambda@Edge deployment
///
/// Resource names are fixed; `source.zip` is read from the current directory.
#[derive(Debug, Parser)]
#[command(author, about, version)]
#[command(styles=get_styles())]
pub struct Cli {
  #[clap(flatten)]
  pub verbose: Verbosity<InfoLevel>,

  /// Disable colored log output
  #[arg(long)]
  pub no_color: bool,
}
