#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A pressed control carried an identifier that does not follow the
    /// `kind:user:job:index` token scheme.
    #[error("Malformed control identifier: {0}")]
    MalformedControlId(String),

    /// A rating control carried a glyph outside the configured vocabulary.
    #[error("Unknown rating glyph: {0}")]
    UnknownRatingGlyph(String),
}
