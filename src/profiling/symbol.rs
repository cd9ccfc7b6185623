//! Program counter to symbol lookup, as used by `pprof` when symbolizing
//! a remote profile.

use std::ffi::c_void;

use axum::{
    extract::RawQuery,
    http::{header, Method},
    response::IntoResponse,
};

/// Parse one address word. Accepts `0x`, `0o` and `0b` prefixes, a leading
/// `0` for octal, and plain decimal. Returns `None` for zero or garbage.
pub fn parse_address(word: &str) -> Option<u64> {
    let word = word.trim();
    let lower = word.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        (oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        (bin, 2)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (&lower[1..], 8)
    } else {
        (lower.as_str(), 10)
    };

    let digits = digits.replace('_', "");
    u64::from_str_radix(&digits, radix)
        .ok()
        .filter(|pc| *pc != 0)
}

/// Split a `+`-separated address list.
pub fn parse_addresses(input: &str) -> Vec<u64> {
    input.split('+').filter_map(parse_address).collect()
}

/// Name of the function containing `pc`, if the binary's debug info knows it.
pub fn resolve(pc: u64) -> Option<String> {
    let mut name = None;
    backtrace::resolve(pc as usize as *mut c_void, |symbol| {
        if name.is_none() {
            name = symbol.name().map(|n| n.to_string());
        }
    });
    name
}

/// Build the response body: a header line, then one line per resolved address.
pub fn render<F>(addresses: &[u64], mut lookup: F) -> String
where
    F: FnMut(u64) -> Option<String>,
{
    let mut body = String::from("num_symbols: 1\n");
    for &pc in addresses {
        if let Some(name) = lookup(pc) {
            body.push_str(&format!("{:#x} {}\n", pc, name));
        }
    }
    body
}

/// `/debug/pprof/symbol`: addresses come from the body on POST and from the
/// raw query string otherwise.
pub async fn symbol(method: Method, RawQuery(query): RawQuery, body: String) -> impl IntoResponse {
    let input = if method == Method::POST {
        body
    } else {
        query.unwrap_or_default()
    };

    let addresses = parse_addresses(&input);
    tracing::debug!(count = addresses.len(), "Resolving symbols");

    (
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        ],
        render(&addresses, resolve),
    )
}
