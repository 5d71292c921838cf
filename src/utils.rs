use solana_program::native_token::LAMPORTS_PER_SOL;

/// `abcdef...uvwxyz` form for addresses and signatures.
pub fn shorten(value: &str) -> String {
    if value.len() <= 12 {
        return value.to_string();
    }
    format!("{}...{}", &value[..6], &value[value.len() - 6..])
}

pub fn format_sol(lamports: u64) -> String {
    format!("{} SOL", lamports as f64 / LAMPORTS_PER_SOL as f64)
}

/// Splits a countdown into days, hours, minutes and seconds.
pub fn countdown_parts(seconds: i64) -> (i64, i64, i64, i64) {
    let seconds = seconds.max(0);
    (
        seconds / 86_400,
        seconds % 86_400 / 3_600,
        seconds % 3_600 / 60,
        seconds % 60,
    )
}

/// Current unix time in seconds, read from the browser clock.
pub fn now_unix() -> i64 {
    (js_sys::Date::now() / 1000.0) as i64
}
