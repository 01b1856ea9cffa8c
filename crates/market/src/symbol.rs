//! Currency-pair symbol normalization.

/// Resolve the API symbol for a request.
///
/// An explicit symbol wins and is upper-cased. Otherwise a `from`/`to` pair
/// is concatenated in order (`eur` + `usd` = `EURUSD`). Returns `None` when
/// neither form is complete; callers report that as a missing parameter.
/// Blank strings count as absent.
pub fn resolve_symbol(
    symbol: Option<&str>,
    from: Option<&str>,
    to: Option<&str>,
) -> Option<String> {
    fn present(s: Option<&str>) -> Option<&str> {
        s.map(str::trim).filter(|s| !s.is_empty())
    }

    if let Some(symbol) = present(symbol) {
        return Some(symbol.to_uppercase());
    }

    match (present(from), present(to)) {
        (Some(from), Some(to)) => Some(format!("{}{}", from.to_uppercase(), to.to_uppercase())),
        _ => None,
    }
}
