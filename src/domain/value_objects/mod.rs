//! Value objects shared across the domain.

/// Integer FCFA amount. The currency has no minor unit, so amounts are plain
/// signed integers and the only display guarantee is space-separated
/// thousands ("1 500 000").
pub fn format_fcfa(amount: i64) -> String {
    let negative = amount < 0;
    let digits = amount.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    let offset = digits.len() % 3;
    for (i, c) in digits.chars().enumerate() {
        if i != 0 && (i + 3 - offset) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    if negative {
        format!("-{out}")
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_fcfa() {
        assert_eq!(format_fcfa(0), "0");
        assert_eq!(format_fcfa(999), "999");
        assert_eq!(format_fcfa(15000), "15 000");
        assert_eq!(format_fcfa(1500000), "1 500 000");
        assert_eq!(format_fcfa(-2500), "-2 500");
    }
}
