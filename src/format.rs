use serde::Serialize;

/// Format a time like `1h 2m 3.456s`. Hours and minutes are left out when zero.
pub fn format_time(ms: u64) -> String {
    let millis = ms % 1000;
    let total_secs = ms / 1000;
    let h = total_secs / 3600;
    let m = (total_secs % 3600) / 60;
    let s = total_secs % 60;

    let mut str = String::new();
    if h > 0 {
        str.push_str(&format!("{}h ", h));
    }
    if h > 0 || m > 0 {
        str.push_str(&format!("{}m ", m));
    }
    str.push_str(&format!("{}.{:03}s", s, millis));
    str
}

/// Format a time difference with an explicit sign, like `+1.234s`.
pub fn format_gap(ms: i64) -> String {
    let sign = if ms < 0 { '-' } else { '+' };
    format!("{}{}", sign, format_time(ms.unsigned_abs()))
}

pub fn format_percent(p: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, p)
}

/// A car's colors, as `#rrggbb` strings.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct CarColors(pub Vec<String>);

impl CarColors {
    /// Parse concatenated hex colors. Incomplete colors are padded with zeros.
    pub fn parse(s: &str) -> Self {
        let chars: Vec<char> = s.trim().chars().collect();
        let colors = chars
            .chunks(6)
            .map(|chunk| {
                let hex: String = chunk.iter().collect();
                format!("#{:0<6}", hex.to_lowercase())
            })
            .collect();
        CarColors(colors)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
