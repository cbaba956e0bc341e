pub mod account;
pub mod market;
pub mod orders;
pub mod ws;

/// `BASE` and `QUOTE` path segments joined into a symbol.
pub(crate) fn symbol(base: &str, quote: &str) -> String {
    format!("{}/{}", base.to_uppercase(), quote.to_uppercase())
}
