//! Encode command implementation.

use anyhow::Result;
use console::style;

use luxbin_codec::{ALPHABET, Channel, EncodingAngles, MessageProfile};

/// Execute the encode command.
pub fn execute(message: &str) -> Result<()> {
    if message.is_empty() {
        anyhow::bail!("Nothing to encode: message is empty");
    }

    println!(
        "{} Encoding '{}'",
        style("→").cyan().bold(),
        style(message).bold()
    );
    println!();
    println!(
        "  {:<4} {:>8} {:<8} {:>8} {:<7} {:>9} {:<10} {:>6} {:>6} {:>6}",
        "Char", "Light", "Color", "Sound", "Note", "MW", "Band", "RY", "RZ", "RX"
    );
    println!("  {}", "-".repeat(86));

    for c in message.chars() {
        let known = ALPHABET.contains(&c.to_ascii_uppercase());
        let [light, sound, mw] = Channel::ALL.map(|ch| ch.value_of(c));
        let angles = EncodingAngles::for_char(c);
        let shown = if c == ' ' { "' '".to_string() } else { c.to_string() };
        let row = format!(
            "  {:<4} {:>8} {:<8} {:>8} {:<7} {:>9} {:<10} {:>6.3} {:>6.3} {:>6.3}",
            shown,
            Channel::Light.format(light),
            Channel::Light.label(light),
            Channel::Sound.format(sound),
            Channel::Sound.label(sound),
            Channel::Microwave.format(mw),
            Channel::Microwave.label(mw),
            angles.ry,
            angles.rz,
            angles.rx
        );
        if known {
            println!("{row}");
        } else {
            println!("{} {}", style(row).dim(), style("(default)").yellow());
        }
    }

    if let Some(profile) = MessageProfile::of(message) {
        println!();
        println!(
            "  Average of first {}: {}  {}  {}",
            profile.chars,
            style(Channel::Light.format(profile.average.light)).cyan(),
            style(Channel::Sound.format(profile.average.sound)).cyan(),
            style(Channel::Microwave.format(profile.average.microwave)).cyan()
        );
    }

    Ok(())
}
