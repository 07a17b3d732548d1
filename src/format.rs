//! Number formatting shared by the table, chart and header.

/// Rounds to an integer and groups thousands with commas.
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{}", rounded.abs() as u64);

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if negative {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn currency(value: f64) -> String {
    format!("₹{}", group_thousands(value))
}

pub fn one_decimal(value: f64) -> String {
    format!("{:.1}", value)
}
