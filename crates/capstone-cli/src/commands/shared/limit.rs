/// Compute effective limit with precedence: explicit arg -> fallback.
#[must_use]
pub fn effective_limit(local: Option<u32>, fallback: u32) -> u32 {
    local.unwrap_or(fallback)
}
