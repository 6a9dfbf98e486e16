/// Parse a `CATEGORY=VALUE` probability assignment from the command line.
///
/// The value may be a fraction (`0.45`) or a percentage (`45%`).
pub fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (category, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=VALUE, got {s:?}"))?;
    let category = category.trim();
    if category.is_empty() {
        return Err(format!("missing category in {s:?}"));
    }
    let value = value.trim();
    let parsed = match value.strip_suffix('%') {
        Some(percent) => percent.trim().parse::<f64>().map(|p| p / 100.0),
        None => value.parse::<f64>(),
    }
    .map_err(|err| format!("invalid probability {value:?}: {err}"))?;
    Ok((category.to_string(), parsed))
}
