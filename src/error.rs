/// Errors raised while configuring an inline parser
///
/// Parsing itself never fails: any construct that does not match degrades to
/// literal text. Only an inconsistent processor set is rejected.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("delimiter processor registered more than once for character {0:?}")]
    DuplicateDelimiter(char),

    #[error("character {0:?} starts a built-in inline construct and cannot be a delimiter")]
    ReservedCharacter(char),

    #[error("failed to build literal-run pattern: {0}")]
    Pattern(#[from] regex::Error),
}
