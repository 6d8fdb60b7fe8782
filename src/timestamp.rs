/// Formats a duration in microseconds as `HH:MM:SS.mmm`.
pub fn time_str(us: i64) -> String {
    let sign = if us < 0 { "-" } else { "" };
    let ms = us.unsigned_abs() / 1000;

    let hours = ms / 3_600_000;
    let minutes = ms % 3_600_000 / 60_000;
    let seconds = ms % 60_000 / 1000;
    let milliseconds = ms % 1000;

    format!(
        "{sign}{hours:0width$}:{minutes:02}:{seconds:02}.{milliseconds:03}",
        width = if hours >= 100 { 0 } else { 2 }
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_hours_minutes_seconds() {
        assert_eq!(time_str(0), "00:00:00.000");
        assert_eq!(time_str(1_152_000), "00:00:01.152");
        assert_eq!(time_str(3_723_004_999), "01:02:03.004");
        assert_eq!(time_str(-32_000), "-00:00:00.032");
        assert_eq!(time_str(360_000_000_000), "100:00:00.000");
    }
}
