use anyhow::{Context, Result};
use ethers::{types::U256, utils::format_units};
use fern::colors::{Color, ColoredLevelConfig};
use log::{Level, LevelFilter};

/// Colored, timestamped logging. Errors go to stderr, everything else to stdout.
pub fn setup_logger(level: LevelFilter) -> Result<()> {
    let colors = ColoredLevelConfig {
        trace: Color::Cyan,
        debug: Color::Magenta,
        info: Color::Green,
        warn: Color::Yellow,
        error: Color::BrightRed,
    };

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{}[{}] {}",
                chrono::Local::now().format("[%H:%M:%S]"),
                colors.color(record.level()),
                message
            ))
        })
        .level(LevelFilter::Warn)
        .level_for(env!("CARGO_CRATE_NAME"), level)
        .chain(
            fern::Dispatch::new()
                .filter(|metadata| metadata.level() > Level::Error)
                .chain(std::io::stdout()),
        )
        .chain(
            fern::Dispatch::new()
                .level(LevelFilter::Error)
                .chain(std::io::stderr()),
        )
        .apply()?;

    Ok(())
}

/// Base units (wei) to ether. Goes through the decimal string so that
/// `1400000000000000000` becomes exactly `1.4`.
pub fn wei_to_ether(amount: U256) -> Result<f64> {
    let ether = format_units(amount, "ether")
        .with_context(|| format!("Failed to format {} as ether", amount))?;
    ether
        .parse::<f64>()
        .with_context(|| format!("Failed to parse ether amount {}", ether))
}

pub fn parse_wei(raw: &str) -> Result<U256> {
    U256::from_dec_str(raw.trim()).with_context(|| format!("Invalid base unit amount {:?}", raw))
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}
